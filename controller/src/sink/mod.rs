//! Command sinks: where each tick's velocity command goes.

pub mod http;
pub mod log;
pub mod traits;

pub use http::HttpSink;
pub use log::LogSink;
pub use traits::CommandSink;

use blob_servo_common::config::SinkConfig;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Build the configured sink. The join handle, if any, belongs to a
/// background publisher that drains once the sink is dropped.
///
/// Must be called inside a tokio runtime.
pub fn build(config: &SinkConfig) -> (Box<dyn CommandSink>, Option<JoinHandle<()>>) {
    match (config.mode.as_str(), config.url.as_deref()) {
        ("http", Some(url)) => {
            let (sink, handle) =
                HttpSink::spawn(url.to_string(), Duration::from_millis(config.timeout_ms));
            (Box::new(sink), Some(handle))
        }
        _ => (Box::new(LogSink::default()), None),
    }
}
