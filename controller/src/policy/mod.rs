//! Motion Policy: the search / track / evade state machine.

pub mod machine;
pub mod params;
pub mod state;

pub use machine::MotionPolicy;
pub use params::PolicyParams;
pub use state::ControlState;
