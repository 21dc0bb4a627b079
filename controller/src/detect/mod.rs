//! Blob Locator: color frame in, target estimate out. Stateless.

pub mod estimate;
pub mod hsv;
pub mod locator;

pub use estimate::{PixelOffset, TargetEstimate};
pub use hsv::{Hsv, HsvRange};
pub use locator::{BlobLocator, Moments};
