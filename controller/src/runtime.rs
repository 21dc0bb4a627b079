use blob_servo_camera::{FrameReceiver, SourceError};
use blob_servo_common::command::VelocityCommand;
use blob_servo_common::frame::Frame;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::debug::{DebugArtifact, DebugSink};
use crate::detect::{BlobLocator, TargetEstimate};
use crate::error::ControllerError;
use crate::policy::MotionPolicy;
use crate::sink::CommandSink;

/// One locator, one policy, one sink: the whole control loop for a robot.
pub struct Controller<C: Clock, S: CommandSink> {
    locator: BlobLocator,
    policy: MotionPolicy,
    clock: C,
    sink: S,
    debug: Option<DebugSink>,
    ticks: u64,
}

impl<C: Clock, S: CommandSink> Controller<C, S> {
    pub fn new(locator: BlobLocator, policy: MotionPolicy, clock: C, sink: S) -> Self {
        Self {
            locator,
            policy,
            clock,
            sink,
            debug: None,
            ticks: 0,
        }
    }

    pub fn with_debug(mut self, debug: DebugSink) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn policy(&self) -> &MotionPolicy {
        &self.policy
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Process one frame to completion: locate, step, publish.
    ///
    /// A frame the locator cannot handle publishes a zero command before the
    /// error is returned, so the robot never keeps moving on a stale command.
    pub fn tick(&mut self, frame: &Arc<Frame>) -> Result<VelocityCommand, ControllerError> {
        let tick = self.ticks;
        self.ticks += 1;

        let estimate = match self.locator.locate(frame) {
            Ok(estimate) => estimate,
            Err(e) => {
                error!(error = %e, seq = frame.seq, "frame rejected, halting motion");
                self.sink.publish(VelocityCommand::zero());
                return Err(e.into());
            }
        };

        let command = self.policy.step(&estimate, self.clock.now());
        self.sink.publish(command);

        self.emit_debug(tick, frame, &estimate);
        Ok(command)
    }

    /// Force the policy into `Stop` and publish the resulting zero command.
    pub fn stop(&mut self) -> VelocityCommand {
        self.policy.request_stop();
        let command = self.policy.step(&TargetEstimate::Absent, self.clock.now());
        self.sink.publish(command);
        command
    }

    fn emit_debug(&mut self, tick: u64, frame: &Arc<Frame>, estimate: &TargetEstimate) {
        let Some(debug) = self.debug.as_mut() else {
            return;
        };
        if !debug.wants(tick) {
            return;
        }

        let mask = match self.locator.mask(frame) {
            Ok(mask) => mask,
            Err(e) => {
                warn!(error = %e, "could not build debug mask");
                return;
            }
        };
        let (cx, cy) = self.locator.center();
        let centroid = estimate.offset().map(|offset| {
            (
                (cx as i64 + offset.dx as i64) as u32,
                (cy as i64 + offset.dy as i64) as u32,
            )
        });
        debug.submit(DebugArtifact {
            frame: Arc::clone(frame),
            mask,
            centroid,
        });
    }
}

/// Drive the controller from the latest-frame slot until the policy stops,
/// the process is interrupted, or the source goes away.
///
/// Only the newest frame is ever processed; frames that arrive while a tick
/// is running overwrite each other in the slot.
pub async fn run<C: Clock, S: CommandSink>(
    controller: &mut Controller<C, S>,
    mut frames: FrameReceiver,
) -> Result<(), ControllerError> {
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    info!(sink = controller.sink.name(), "control loop started");

    loop {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    warn!(ticks = controller.ticks, "frame source closed, stopping");
                    controller.stop();
                    return Err(ControllerError::SourceClosed);
                }

                let latest = frames.borrow_and_update().clone();
                let Some(frame) = latest else {
                    debug!("frame slot empty");
                    continue;
                };

                controller.tick(&frame)?;
                if controller.policy.shutdown_requested() {
                    info!(
                        ticks = controller.ticks,
                        evasions = controller.policy.evasions_completed(),
                        "policy stopped, leaving control loop"
                    );
                    return Ok(());
                }
            }
            _ = &mut interrupt => {
                info!(ticks = controller.ticks, "interrupt received, stopping");
                controller.stop();
                return Ok(());
            }
        }
    }
}

/// How long to wait for a finished source to report why it stopped.
const SOURCE_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Replace a bare `SourceClosed` with the error the camera task returned,
/// if it returned one. The source task is aborted in every other case.
pub async fn with_source_error(
    result: Result<(), ControllerError>,
    source: JoinHandle<Result<(), SourceError>>,
) -> Result<(), ControllerError> {
    match result {
        Err(ControllerError::SourceClosed) => {
            match tokio::time::timeout(SOURCE_JOIN_TIMEOUT, source).await {
                Ok(Ok(Err(e))) => Err(ControllerError::Source(e)),
                Ok(Err(e)) => {
                    error!(error = %e, "camera task panicked");
                    Err(ControllerError::SourceClosed)
                }
                _ => Err(ControllerError::SourceClosed),
            }
        }
        other => {
            source.abort();
            other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::detect::HsvRange;
    use crate::policy::{ControlState, PolicyParams};
    use blob_servo_camera::frame_slot;
    use blob_servo_common::config::DebugConfig;
    use blob_servo_common::frame::FrameError;
    use blob_servo_common::config::CameraConfig;
    use image::{Rgb, RgbImage};

    const W: u32 = 16;
    const H: u32 = 12;
    const RED: Rgb<u8> = Rgb([220, 20, 20]);
    const GREY: Rgb<u8> = Rgb([90, 90, 90]);

    #[derive(Debug, Default)]
    struct RecordingSink {
        commands: Vec<VelocityCommand>,
    }

    impl CommandSink for RecordingSink {
        fn publish(&mut self, command: VelocityCommand) {
            self.commands.push(command);
        }
    }

    fn params() -> PolicyParams {
        PolicyParams {
            close_magnitude: 50,
            ..PolicyParams::default()
        }
    }

    fn controller(params: PolicyParams) -> Controller<ManualClock, RecordingSink> {
        controller_with_clock(params, ManualClock::default())
    }

    fn controller_with_clock(
        params: PolicyParams,
        clock: ManualClock,
    ) -> Controller<ManualClock, RecordingSink> {
        Controller::new(
            BlobLocator::new(HsvRange::default(), W, H),
            MotionPolicy::new(params),
            clock,
            RecordingSink::default(),
        )
    }

    /// A frame with a red block covering columns `x0..x1`.
    fn frame(x0: u32, x1: u32, seq: u64) -> Arc<Frame> {
        let image = RgbImage::from_fn(W, H, |x, _| if (x0..x1).contains(&x) { RED } else { GREY });
        Arc::new(Frame::from_image(image, seq, 1_739_871_000_000))
    }

    #[test]
    fn tick_publishes_every_command() {
        let mut controller = controller(params());

        let first = controller.tick(&frame(0, 0, 0)).unwrap();
        assert_eq!(first, VelocityCommand::spin(-0.5));
        assert_eq!(controller.policy().state(), ControlState::Searching);

        // Two columns at x = 12, 13: centroid x = 12, dx = +4.
        controller.tick(&frame(12, 14, 1)).unwrap();
        assert_eq!(controller.policy().state(), ControlState::Tracking);
        let steer = controller.tick(&frame(12, 14, 2)).unwrap();
        assert_eq!(steer.linear, 0.3);
        assert!((steer.angular - (-0.008)).abs() < 1e-12);

        assert_eq!(controller.sink().commands.len(), 3);
        assert_eq!(controller.ticks(), 3);
    }

    #[test]
    fn wrong_size_frame_publishes_zero_and_errors() {
        let mut controller = controller(params());
        controller.tick(&frame(12, 14, 0)).unwrap();

        let bad = Arc::new(Frame::from_image(RgbImage::new(8, 8), 1, 0));
        let err = controller.tick(&bad).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Frame(FrameError::InvalidFrame { .. })
        ));
        assert_eq!(controller.sink().commands.last(), Some(&VelocityCommand::zero()));
        // The policy was not stepped.
        assert_eq!(controller.policy().state(), ControlState::Tracking);
    }

    #[test]
    fn evasion_ends_when_the_clock_reaches_the_deadline() {
        let clock = ManualClock::default();
        let mut controller = controller_with_clock(params(), clock.clone());
        let close = frame(0, W, 0);

        controller.tick(&close).unwrap();
        controller.tick(&close).unwrap();
        let deadline = controller.policy().rotation_deadline().unwrap();
        assert_eq!(deadline, clock.now() + Duration::from_secs(3));

        clock.advance(Duration::from_millis(1500));
        assert_eq!(controller.tick(&close).unwrap(), VelocityCommand::spin(-0.5));
        clock.advance(Duration::from_millis(1499));
        assert_eq!(controller.tick(&close).unwrap(), VelocityCommand::spin(-0.5));
        assert_eq!(controller.policy().rotation_deadline(), Some(deadline));

        clock.advance(Duration::from_millis(1));
        assert!(controller.tick(&close).unwrap().is_zero());
        assert_eq!(controller.policy().state(), ControlState::Searching);
        assert_eq!(controller.policy().evasions_completed(), 1);
    }

    #[test]
    fn stop_publishes_zero() {
        let mut controller = controller(params());
        controller.tick(&frame(12, 14, 0)).unwrap();
        assert!(controller.stop().is_zero());
        assert_eq!(controller.policy().state(), ControlState::Stop);
        assert!(controller.tick(&frame(12, 14, 1)).unwrap().is_zero());
    }

    #[tokio::test]
    async fn run_until_policy_stops() {
        let mut controller = controller(PolicyParams {
            evade_duration: Duration::ZERO,
            stop_after_evasions: Some(1),
            ..params()
        });
        let (tx, rx) = frame_slot();

        // Keep the slot fresh until the loop hangs up.
        let feeder = tokio::spawn(async move {
            let mut seq = 0;
            while !tx.is_closed() {
                tx.send_replace(Some(frame(0, W, seq)));
                seq += 1;
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        tokio::time::timeout(Duration::from_secs(5), run(&mut controller, rx))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(controller.policy().state(), ControlState::Stop);
        assert_eq!(controller.policy().evasions_completed(), 1);
        assert_eq!(controller.sink().commands.last(), Some(&VelocityCommand::zero()));
        feeder.await.unwrap();
    }

    #[tokio::test]
    async fn closed_source_stops_the_robot() {
        let mut controller = controller(params());
        let (tx, rx) = frame_slot();
        drop(tx);

        let err = run(&mut controller, rx).await.unwrap_err();
        assert!(matches!(err, ControllerError::SourceClosed));
        assert_eq!(controller.sink().commands, vec![VelocityCommand::zero()]);
    }

    #[tokio::test]
    async fn debug_sink_receives_sampled_ticks() {
        let root = std::env::temp_dir().join(format!("blob-servo-runtime-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let (debug, handle) = DebugSink::spawn(&DebugConfig {
            enabled: true,
            output_dir: root.clone(),
            every_n_frames: 2,
        });

        let mut controller = controller(params()).with_debug(debug);
        controller.tick(&frame(12, 14, 40)).unwrap();
        drop(controller);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        let mask = crate::debug::paths::mask_path(&root, 1_739_871_000_000, 40);
        assert!(mask.exists());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn failed_source_reports_its_error() {
        let mut controller = controller(params());
        let (tx, rx) = frame_slot();
        let config = CameraConfig {
            url: "http://127.0.0.1:1/stream".into(),
            mode: "h264".into(),
            fps: 10.0,
            quality: 80,
            width: W,
            height: H,
        };
        let source = tokio::spawn(async move { blob_servo_camera::run_source(&config, tx).await });

        let result = run(&mut controller, rx).await;
        assert!(matches!(result, Err(ControllerError::SourceClosed)));

        let err = with_source_error(result, source).await.unwrap_err();
        assert!(matches!(err, ControllerError::Source(SourceError::UnknownMode(_))));
    }

    #[tokio::test]
    async fn clean_exit_ignores_the_source() {
        let source = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });
        assert!(with_source_error(Ok(()), source).await.is_ok());
    }
}
