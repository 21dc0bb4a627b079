use blob_servo_common::config::{CameraConfig, DetectorConfig};
use blob_servo_common::frame::{Frame, FrameError};
use image::{GrayImage, Luma};
use tracing::trace;

use super::estimate::{PixelOffset, TargetEstimate};
use super::hsv::HsvRange;

/// Zeroth and first raster moments of a binary mask, in pixel units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Moments {
    pub m00: u64,
    pub m10: u64,
    pub m01: u64,
}

impl Moments {
    /// Centroid truncated to whole pixels, or `None` for an empty mask.
    pub fn centroid(&self) -> Option<(u64, u64)> {
        if self.m00 == 0 {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }
}

/// Finds the target-colored blob in a frame.
///
/// The mask is every pixel whose HSV value falls inside `range`; the estimate
/// is the mask centroid relative to the frame center and the mask area.
#[derive(Debug, Clone)]
pub struct BlobLocator {
    range: HsvRange,
    width: u32,
    height: u32,
}

impl BlobLocator {
    pub fn new(range: HsvRange, width: u32, height: u32) -> Self {
        Self {
            range,
            width,
            height,
        }
    }

    pub fn from_config(detector: &DetectorConfig, camera: &CameraConfig) -> Self {
        Self::new(HsvRange::from_config(detector), camera.width, camera.height)
    }

    /// Frame center used as the offset origin.
    pub fn center(&self) -> (u32, u32) {
        (self.width / 2, self.height / 2)
    }

    pub fn locate(&self, frame: &Frame) -> Result<TargetEstimate, FrameError> {
        let moments = self.moments(frame)?;
        let Some((cx, cy)) = moments.centroid() else {
            trace!(seq = frame.seq, "no target-colored pixels");
            return Ok(TargetEstimate::Absent);
        };

        let (half_w, half_h) = self.center();
        let offset = PixelOffset::new(cx as i32 - half_w as i32, cy as i32 - half_h as i32);
        trace!(seq = frame.seq, cx, cy, area = moments.m00, "target located");
        Ok(TargetEstimate::detected(offset, moments.m00))
    }

    pub fn moments(&self, frame: &Frame) -> Result<Moments, FrameError> {
        frame.ensure_size(self.width, self.height)?;

        let mut moments = Moments::default();
        for (x, y, pixel) in frame.image().enumerate_pixels() {
            let [r, g, b] = pixel.0;
            if self.range.contains_rgb(r, g, b) {
                moments.m00 += 1;
                moments.m10 += x as u64;
                moments.m01 += y as u64;
            }
        }
        Ok(moments)
    }

    /// Binary mask (255 = target color) for debug output.
    pub fn mask(&self, frame: &Frame) -> Result<GrayImage, FrameError> {
        frame.ensure_size(self.width, self.height)?;

        let image = frame.image();
        Ok(GrayImage::from_fn(self.width, self.height, |x, y| {
            let [r, g, b] = image.get_pixel(x, y).0;
            if self.range.contains_rgb(r, g, b) {
                Luma([255])
            } else {
                Luma([0])
            }
        }))
    }
}
