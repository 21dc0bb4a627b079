use blob_servo_common::command::VelocityCommand;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::traits::CommandSink;

/// Posts commands as twist JSON to the robot base.
///
/// Only the newest command is kept: if the base is slower than the control
/// loop, intermediate commands are overwritten rather than queued.
pub struct HttpSink {
    tx: watch::Sender<VelocityCommand>,
}

impl HttpSink {
    /// Start the background publisher. It exits after posting the final
    /// command once the sink is dropped.
    pub fn spawn(url: String, timeout: Duration) -> (Self, JoinHandle<()>) {
        let (tx, rx) = watch::channel(VelocityCommand::zero());
        let handle = tokio::spawn(run_publisher(url, timeout, rx));
        (Self { tx }, handle)
    }
}

impl CommandSink for HttpSink {
    fn publish(&mut self, command: VelocityCommand) {
        self.tx.send_replace(command);
    }

    fn name(&self) -> &str {
        "http"
    }
}

async fn run_publisher(url: String, timeout: Duration, mut rx: watch::Receiver<VelocityCommand>) {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "failed to build HTTP client, commands will not be sent");
            return;
        }
    };

    info!(url, "command publisher started");
    let mut sent: u64 = 0;
    let mut failed: u64 = 0;

    while rx.changed().await.is_ok() {
        let command = *rx.borrow_and_update();
        match client.post(&url).json(&command.to_twist()).send().await {
            Ok(resp) if resp.status().is_success() => {
                sent += 1;
                debug!(
                    linear = command.linear,
                    angular = command.angular,
                    "command posted"
                );
            }
            Ok(resp) => {
                failed += 1;
                warn!(status = %resp.status(), "base rejected command");
            }
            Err(e) => {
                failed += 1;
                warn!(error = %e, "failed to post command");
            }
        }
    }

    info!(sent, failed, "command publisher stopped");
}
