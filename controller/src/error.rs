use blob_servo_camera::SourceError;
use blob_servo_common::config::ConfigError;
use blob_servo_common::frame::FrameError;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("frame rejected: {0}")]
    Frame(#[from] FrameError),
    #[error("frame source closed")]
    SourceClosed,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("camera source failed: {0}")]
    Source(#[from] SourceError),
}
