use blob_servo_common::command::VelocityCommand;

/// Fire-and-forget destination for velocity commands.
///
/// `publish` is called once per control tick and must not block the tick;
/// delivery failures are the sink's business, never the controller's.
pub trait CommandSink: Send {
    fn publish(&mut self, command: VelocityCommand);

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

impl<S: CommandSink + ?Sized> CommandSink for Box<S> {
    fn publish(&mut self, command: VelocityCommand) {
        (**self).publish(command)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
