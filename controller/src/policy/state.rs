use std::fmt;
use std::time::Instant;

/// Control state owned by [`MotionPolicy`](super::MotionPolicy).
///
/// The rotation deadline only exists while rotating away, so it cannot be
/// read or left stale in any other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// Spinning in place until the target shows up.
    Searching,
    /// Driving toward the target and steering to keep it centered.
    Tracking,
    /// Turning away from a close target until `deadline`.
    RotatingAway { deadline: Instant },
    /// Halted; the process should shut down.
    Stop,
}

impl ControlState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Searching => "SEARCHING",
            Self::Tracking => "TRACKING",
            Self::RotatingAway { .. } => "ROTATING_AWAY",
            Self::Stop => "STOP",
        }
    }

    pub fn rotation_deadline(&self) -> Option<Instant> {
        match self {
            Self::RotatingAway { deadline } => Some(*deadline),
            _ => None,
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
