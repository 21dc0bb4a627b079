//! Camera frame source.
//!
//! Reads JPEG frames from the robot's HTTP camera endpoint, decodes them and
//! keeps only the most recent one in a `watch` slot. The controller always
//! acts on the latest frame; older frames are overwritten, never queued.

pub mod mjpeg;

use blob_servo_common::config::CameraConfig;
use blob_servo_common::frame::{Frame, FrameError};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Latest-frame slot shared between the source and the controller.
pub type FrameSender = watch::Sender<Option<Arc<Frame>>>;
pub type FrameReceiver = watch::Receiver<Option<Arc<Frame>>>;

static SEQ_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP connection failed: {0}")]
    HttpConnect(reqwest::Error),
    #[error("HTTP stream error: {0}")]
    HttpStream(reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("unknown camera mode {0:?}, expected \"mjpeg\" or \"polling\"")]
    UnknownMode(String),
}

/// Create an empty latest-frame slot.
pub fn frame_slot() -> (FrameSender, FrameReceiver) {
    watch::channel(None)
}

/// Run the configured camera source until every receiver is dropped.
pub async fn run_source(config: &CameraConfig, tx: FrameSender) -> Result<(), SourceError> {
    info!(url = config.url, mode = config.mode, fps = config.fps, "starting camera source");
    match config.mode.as_str() {
        "mjpeg" => {
            let url = format!(
                "{}?quality={}&fps={}",
                config.url, config.quality, config.fps
            );
            mjpeg::run_mjpeg_source(&url, &tx).await
        }
        "polling" => {
            let url = format!(
                "{}?quality={}",
                config.url.replace("/stream", "/frame"),
                config.quality
            );
            let interval = Duration::from_secs_f64(1.0 / config.fps.max(0.1));
            mjpeg::run_polling_source(&url, &tx, interval).await
        }
        other => {
            error!(mode = other, "unknown camera mode");
            Err(SourceError::UnknownMode(other.to_string()))
        }
    }
}

/// Decode one JPEG and overwrite the slot with it.
///
/// Returns `false` once nobody is listening any more.
pub fn publish_jpeg(tx: &FrameSender, jpeg_data: &[u8]) -> bool {
    if tx.is_closed() {
        return false;
    }

    let seq = SEQ_COUNTER.fetch_add(1, Ordering::Relaxed);
    let now_ms = Utc::now().timestamp_millis();
    match Frame::from_jpeg(jpeg_data, seq, now_ms) {
        Ok(frame) => {
            debug!(seq, bytes = jpeg_data.len(), "frame decoded");
            tx.send_replace(Some(Arc::new(frame)));
        }
        Err(FrameError::Decode(e)) => {
            warn!(error = %e, seq, "failed to decode camera frame, skipping");
        }
        Err(e) => {
            warn!(error = %e, seq, "unusable camera frame, skipping");
        }
    }
    true
}
