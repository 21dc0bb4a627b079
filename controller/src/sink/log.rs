use blob_servo_common::command::VelocityCommand;
use tracing::info;

use super::traits::CommandSink;

/// Logs every command instead of driving hardware. Useful for dry runs.
#[derive(Debug, Default)]
pub struct LogSink {
    published: u64,
    last: Option<VelocityCommand>,
}

impl LogSink {
    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn last(&self) -> Option<VelocityCommand> {
        self.last
    }
}

impl CommandSink for LogSink {
    fn publish(&mut self, command: VelocityCommand) {
        self.published += 1;
        self.last = Some(command);
        info!(
            seq = self.published,
            linear = command.linear,
            angular = command.angular,
            "cmd_vel"
        );
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_last_command() {
        let mut sink = LogSink::default();
        sink.publish(VelocityCommand::spin(-0.5));
        sink.publish(VelocityCommand::new(0.3, 0.1));
        assert_eq!(sink.published(), 2);
        assert_eq!(sink.last(), Some(VelocityCommand::new(0.3, 0.1)));
        assert_eq!(sink.name(), "log");
    }

    #[test]
    fn boxed_sink_forwards() {
        let mut sink: Box<dyn CommandSink> = Box::new(LogSink::default());
        sink.publish(VelocityCommand::zero());
        assert_eq!(sink.name(), "log");
    }
}
