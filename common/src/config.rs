use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Longest evasive rotation accepted from a config file.
pub const MAX_EVADE_SECS: f64 = 3600.0;
/// Fastest camera frame rate accepted from a config file.
pub const MAX_FPS: f64 = 1000.0;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub url: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_quality")]
    pub quality: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

/// Inclusive HSV bounds on the OpenCV 8-bit scale (hue 0..180, s/v 0..=255).
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_hue_min")]
    pub hue_min: u8,
    #[serde(default = "default_hue_max")]
    pub hue_max: u8,
    #[serde(default = "default_floor")]
    pub sat_min: u8,
    #[serde(default = "default_ceiling")]
    pub sat_max: u8,
    #[serde(default = "default_floor")]
    pub val_min: u8,
    #[serde(default = "default_ceiling")]
    pub val_max: u8,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            hue_min: default_hue_min(),
            hue_max: default_hue_max(),
            sat_min: default_floor(),
            sat_max: default_ceiling(),
            val_min: default_floor(),
            val_max: default_ceiling(),
        }
    }
}

/// Motion policy calibration. The magnitude threshold and steering gain are
/// lens/sensor specific and carry no physical unit.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_spin")]
    pub search_angular: f64,
    #[serde(default = "default_spin")]
    pub evade_angular: f64,
    #[serde(default = "default_forward_linear")]
    pub forward_linear: f64,
    #[serde(default = "default_steering_gain")]
    pub steering_gain: f64,
    /// Blob area (mask pixels) above which the target counts as close.
    #[serde(default = "default_close_magnitude")]
    pub close_magnitude: u64,
    #[serde(default = "default_evade_secs")]
    pub evade_secs: f64,
    #[serde(default = "default_dead_band_px")]
    pub dead_band_px: i32,
    #[serde(default)]
    pub enforce_dead_band: bool,
    #[serde(default)]
    pub stop_after_evasions: Option<u32>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            search_angular: default_spin(),
            evade_angular: default_spin(),
            forward_linear: default_forward_linear(),
            steering_gain: default_steering_gain(),
            close_magnitude: default_close_magnitude(),
            evade_secs: default_evade_secs(),
            dead_band_px: default_dead_band_px(),
            enforce_dead_band: false,
            stop_after_evasions: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    #[serde(default = "default_sink_mode")]
    pub mode: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_sink_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            mode: default_sink_mode(),
            url: None,
            timeout_ms: default_sink_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_debug_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_every_n_frames")]
    pub every_n_frames: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: default_debug_dir(),
            every_n_frames: default_every_n_frames(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detector;
        if d.hue_min > d.hue_max || d.sat_min > d.sat_max || d.val_min > d.val_max {
            return Err(ConfigError::Invalid(
                "detector range has a lower bound above its upper bound".into(),
            ));
        }
        if d.hue_max >= 180 {
            return Err(ConfigError::Invalid(format!(
                "detector.hue_max {} is outside the 0..180 hue scale",
                d.hue_max
            )));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid("camera frame size must be non-zero".into()));
        }
        let evade_secs = self.policy.evade_secs;
        if !evade_secs.is_finite() || evade_secs <= 0.0 || evade_secs > MAX_EVADE_SECS {
            return Err(ConfigError::Invalid(format!(
                "policy.evade_secs must be in (0, {MAX_EVADE_SECS}], got {evade_secs}"
            )));
        }
        let fps = self.camera.fps;
        if !fps.is_finite() || fps <= 0.0 || fps > MAX_FPS {
            return Err(ConfigError::Invalid(format!(
                "camera.fps must be in (0, {MAX_FPS}], got {fps}"
            )));
        }
        if self.policy.dead_band_px < 0 {
            return Err(ConfigError::Invalid("policy.dead_band_px must not be negative".into()));
        }
        if !matches!(self.camera.mode.as_str(), "mjpeg" | "polling") {
            return Err(ConfigError::Invalid(format!(
                "unknown camera.mode {:?}, expected \"mjpeg\" or \"polling\"",
                self.camera.mode
            )));
        }
        if !matches!(self.sink.mode.as_str(), "log" | "http") {
            return Err(ConfigError::Invalid(format!(
                "unknown sink.mode {:?}, expected \"log\" or \"http\"",
                self.sink.mode
            )));
        }
        if self.sink.mode == "http" && self.sink.url.is_none() {
            return Err(ConfigError::Invalid("sink.mode = \"http\" requires sink.url".into()));
        }
        if self.debug.enabled && self.debug.every_n_frames == 0 {
            return Err(ConfigError::Invalid("debug.every_n_frames must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_mode() -> String {
    "mjpeg".into()
}
fn default_fps() -> f64 {
    10.0
}
fn default_quality() -> u32 {
    80
}
fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_hue_min() -> u8 {
    0
}
fn default_hue_max() -> u8 {
    10
}
fn default_floor() -> u8 {
    10
}
fn default_ceiling() -> u8 {
    255
}
fn default_spin() -> f64 {
    -0.5
}
fn default_forward_linear() -> f64 {
    0.3
}
fn default_steering_gain() -> f64 {
    0.002
}
// 21_000_000 in 8-bit mask moment units (255 per matching pixel).
fn default_close_magnitude() -> u64 {
    82_353
}
fn default_evade_secs() -> f64 {
    3.0
}
fn default_dead_band_px() -> i32 {
    10
}
fn default_sink_mode() -> String {
    "log".into()
}
fn default_sink_timeout_ms() -> u64 {
    200
}
fn default_debug_dir() -> PathBuf {
    PathBuf::from("debug")
}
fn default_every_n_frames() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}
