//! Optional debug output: mask and annotated frame images written to disk
//! off the control path.

pub mod paths;
pub mod writer;

pub use writer::{DebugArtifact, DebugSink};
