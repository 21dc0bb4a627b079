use serde::{Deserialize, Serialize};

/// Differential-drive velocity command for one control tick.
///
/// `linear` is forward speed, `angular` is yaw rate with counter-clockwise
/// (forward-left) positive. Both default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    pub linear: f64,
    pub angular: f64,
}

impl VelocityCommand {
    pub fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Rotate in place at `rate`.
    pub fn spin(rate: f64) -> Self {
        Self {
            linear: 0.0,
            angular: rate,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }

    /// Wire form expected by twist-style base controllers.
    pub fn to_twist(&self) -> Twist {
        Twist {
            linear: Vector3 {
                x: self.linear,
                ..Vector3::default()
            },
            angular: Vector3 {
                z: self.angular,
                ..Vector3::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Linear and angular velocity vectors. Only `linear.x` and `angular.z` are
/// ever non-zero for a differential-drive base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}
