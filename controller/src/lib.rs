//! Closed-loop visual servoing: find a colored blob in each camera frame,
//! drive towards it, and turn away once it is close.

pub mod clock;
pub mod debug;
pub mod detect;
pub mod error;
pub mod policy;
pub mod runtime;
pub mod sink;

pub use error::ControllerError;
pub use runtime::{run, with_source_error, Controller};
