use blob_servo_common::config::{ConfigError, PolicyConfig};
use std::time::Duration;

/// Calibration constants for the motion policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyParams {
    pub search_angular: f64,
    pub evade_angular: f64,
    pub forward_linear: f64,
    pub steering_gain: f64,
    /// Strictly greater magnitudes trigger evasion.
    pub close_magnitude: u64,
    pub evade_duration: Duration,
    /// `Some(px)` zeroes steering for `|dx| <= px`; `None` always steers.
    pub dead_band_px: Option<i32>,
    pub stop_after_evasions: Option<u32>,
}

impl PolicyParams {
    /// Fails if `evade_secs` cannot be represented as a `Duration`.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        let evade_duration = Duration::try_from_secs_f64(config.evade_secs).map_err(|e| {
            ConfigError::Invalid(format!(
                "policy.evade_secs {} is not a valid duration: {e}",
                config.evade_secs
            ))
        })?;
        Ok(Self::with_evade_duration(config, evade_duration))
    }

    fn with_evade_duration(config: &PolicyConfig, evade_duration: Duration) -> Self {
        Self {
            search_angular: config.search_angular,
            evade_angular: config.evade_angular,
            forward_linear: config.forward_linear,
            steering_gain: config.steering_gain,
            close_magnitude: config.close_magnitude,
            evade_duration,
            dead_band_px: config.enforce_dead_band.then_some(config.dead_band_px),
            stop_after_evasions: config.stop_after_evasions,
        }
    }
}

impl Default for PolicyParams {
    fn default() -> Self {
        Self::with_evade_duration(&PolicyConfig::default(), Duration::from_secs(3))
    }
}
