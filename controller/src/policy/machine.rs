use blob_servo_common::command::VelocityCommand;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::params::PolicyParams;
use super::state::ControlState;
use crate::detect::{PixelOffset, TargetEstimate};

/// Converts successive target estimates into velocity commands.
///
/// Starts in `Searching`. Each call to [`step`](Self::step) is one control
/// tick: it reads the estimate and the current time, possibly changes state,
/// and returns the command for that tick.
#[derive(Debug)]
pub struct MotionPolicy {
    state: ControlState,
    params: PolicyParams,
    evasions_completed: u32,
    stop_requested: bool,
}

impl MotionPolicy {
    pub fn new(params: PolicyParams) -> Self {
        Self {
            state: ControlState::Searching,
            params,
            evasions_completed: 0,
            stop_requested: false,
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn rotation_deadline(&self) -> Option<Instant> {
        self.state.rotation_deadline()
    }

    pub fn evasions_completed(&self) -> u32 {
        self.evasions_completed
    }

    /// True once the policy has reached `Stop`.
    pub fn shutdown_requested(&self) -> bool {
        self.state == ControlState::Stop
    }

    /// Ask the policy to halt. Takes effect on the next tick.
    pub fn request_stop(&mut self) {
        if !self.stop_requested {
            info!(state = %self.state, "stop requested");
        }
        self.stop_requested = true;
    }

    /// Run one control tick.
    pub fn step(&mut self, estimate: &TargetEstimate, now: Instant) -> VelocityCommand {
        let (next, command) = self.transition(estimate, now);
        debug!(
            state = %next,
            present = estimate.is_present(),
            magnitude = estimate.magnitude(),
            linear = command.linear,
            angular = command.angular,
            "policy tick"
        );
        self.state = next;
        command
    }

    fn transition(
        &mut self,
        estimate: &TargetEstimate,
        now: Instant,
    ) -> (ControlState, VelocityCommand) {
        if self.stop_requested && self.state != ControlState::Stop {
            info!(from = %self.state, to = "STOP", "halting on request");
            return (ControlState::Stop, VelocityCommand::zero());
        }

        match self.state {
            ControlState::Searching => {
                let command = VelocityCommand::spin(self.params.search_angular);
                if let Some(offset) = estimate.offset() {
                    info!(
                        from = "SEARCHING",
                        to = "TRACKING",
                        %offset,
                        magnitude = estimate.magnitude(),
                        "target acquired"
                    );
                    (ControlState::Tracking, command)
                } else {
                    (ControlState::Searching, command)
                }
            }
            ControlState::Tracking => match *estimate {
                TargetEstimate::Absent => {
                    info!(from = "TRACKING", to = "SEARCHING", "target lost");
                    (
                        ControlState::Searching,
                        VelocityCommand::spin(self.params.search_angular),
                    )
                }
                TargetEstimate::Detected { offset, magnitude } => {
                    let command = self.steer(offset);
                    if magnitude <= self.params.close_magnitude {
                        return (ControlState::Tracking, command);
                    }
                    let Some(deadline) = now.checked_add(self.params.evade_duration) else {
                        warn!(
                            evade_ms = self.params.evade_duration.as_millis() as u64,
                            "evasion deadline out of range, staying in TRACKING"
                        );
                        return (ControlState::Tracking, command);
                    };
                    info!(
                        from = "TRACKING",
                        to = "ROTATING_AWAY",
                        magnitude,
                        threshold = self.params.close_magnitude,
                        evade_ms = self.params.evade_duration.as_millis() as u64,
                        "target close"
                    );
                    (ControlState::RotatingAway { deadline }, command)
                }
            },
            ControlState::RotatingAway { deadline } => {
                if now < deadline {
                    return (
                        self.state,
                        VelocityCommand::spin(self.params.evade_angular),
                    );
                }

                self.evasions_completed += 1;
                match self.params.stop_after_evasions {
                    Some(limit) if self.evasions_completed >= limit => {
                        info!(
                            from = "ROTATING_AWAY",
                            to = "STOP",
                            evasions = self.evasions_completed,
                            "evasion limit reached"
                        );
                        (ControlState::Stop, VelocityCommand::zero())
                    }
                    _ => {
                        info!(
                            from = "ROTATING_AWAY",
                            to = "SEARCHING",
                            evasions = self.evasions_completed,
                            "rotation complete"
                        );
                        (ControlState::Searching, VelocityCommand::zero())
                    }
                }
            }
            ControlState::Stop => (ControlState::Stop, VelocityCommand::zero()),
        }
    }

    /// Forward at constant speed, turning proportionally to the horizontal
    /// offset. Positive `dx` (target right of center) turns right.
    fn steer(&self, offset: PixelOffset) -> VelocityCommand {
        let inside_dead_band = self
            .params
            .dead_band_px
            .is_some_and(|band| offset.dx.abs() <= band);
        let angular = if inside_dead_band {
            0.0
        } else {
            -self.params.steering_gain * offset.dx as f64
        };
        VelocityCommand::new(self.params.forward_linear, angular)
    }
}
