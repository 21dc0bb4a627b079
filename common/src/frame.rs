use image::{ImageReader, RgbImage};
use std::fmt;
use std::io::Cursor;

/// Number of color channels every frame must carry (8-bit RGB).
pub const FRAME_CHANNELS: u8 = 3;

/// Width, height and channel count of a frame, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl FrameShape {
    pub fn rgb(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            channels: FRAME_CHANNELS,
        }
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// One color camera frame with capture metadata.
///
/// The pixel data is always 8-bit RGB. Frames are produced once per sensor
/// tick by the camera source and consumed once by the controller.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    pub seq: u64,
    pub captured_at_ms: i64,
}

impl Frame {
    /// Wrap an already-decoded RGB image (used for synthetic frames).
    pub fn from_image(image: RgbImage, seq: u64, captured_at_ms: i64) -> Self {
        Self {
            image,
            seq,
            captured_at_ms,
        }
    }

    /// Build a frame from a raw interleaved pixel buffer.
    ///
    /// This is the entry point for frame sources that hand over raw pixels;
    /// decoded images go through it too. Only three-channel buffers whose
    /// length matches `width * height * 3` are accepted.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        data: Vec<u8>,
        seq: u64,
        captured_at_ms: i64,
    ) -> Result<Self, FrameError> {
        if channels != FRAME_CHANNELS || width == 0 || height == 0 {
            return Err(FrameError::InvalidFrame {
                expected: FrameShape::rgb(width, height),
                got: FrameShape {
                    width,
                    height,
                    channels,
                },
            });
        }

        let expected = width as usize * height as usize * FRAME_CHANNELS as usize;
        if data.len() != expected {
            return Err(FrameError::BufferLength {
                got: data.len(),
                expected,
            });
        }

        let len = data.len();
        let image = RgbImage::from_raw(width, height, data)
            .ok_or(FrameError::BufferLength { got: len, expected })?;
        Ok(Self::from_image(image, seq, captured_at_ms))
    }

    /// Decode a JPEG (or any format `image` can sniff) into an RGB frame.
    pub fn from_jpeg(data: &[u8], seq: u64, captured_at_ms: i64) -> Result<Self, FrameError> {
        let decoded = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| FrameError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| FrameError::Decode(e.to_string()))?;
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::from_raw(width, height, FRAME_CHANNELS, rgb.into_raw(), seq, captured_at_ms)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn shape(&self) -> FrameShape {
        FrameShape::rgb(self.width(), self.height())
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Fails with [`FrameError::InvalidFrame`] unless the frame is exactly
    /// `width` x `height`.
    pub fn ensure_size(&self, width: u32, height: u32) -> Result<(), FrameError> {
        if self.width() == width && self.height() == height {
            return Ok(());
        }
        Err(FrameError::InvalidFrame {
            expected: FrameShape::rgb(width, height),
            got: self.shape(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame: expected {expected}, got {got}")]
    InvalidFrame { expected: FrameShape, got: FrameShape },
    #[error("frame buffer has {got} bytes, expected {expected}")]
    BufferLength { got: usize, expected: usize },
    #[error("failed to decode frame: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    #[test]
    fn raw_rgb_buffer_accepted() {
        let frame = Frame::from_raw(4, 2, 3, vec![7; 24], 3, 1_708_300_000_000).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.seq, 3);
        assert_eq!(frame.image().get_pixel(3, 1), &Rgb([7, 7, 7]));
    }

    #[test]
    fn four_channel_buffer_rejected() {
        let err = Frame::from_raw(4, 2, 4, vec![0; 32], 0, 0).unwrap_err();
        match err {
            FrameError::InvalidFrame { got, .. } => assert_eq!(got.channels, 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_buffer_rejected() {
        let err = Frame::from_raw(4, 2, 3, vec![0; 10], 0, 0).unwrap_err();
        assert!(matches!(
            err,
            FrameError::BufferLength {
                got: 10,
                expected: 24
            }
        ));
    }

    #[test]
    fn ensure_size_reports_both_shapes() {
        let frame = Frame::from_image(RgbImage::new(320, 240), 0, 0);
        assert!(frame.ensure_size(320, 240).is_ok());
        let err = frame.ensure_size(640, 480).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid frame: expected 640x480x3, got 320x240x3"
        );
    }

    #[test]
    fn png_bytes_decode_to_rgb() {
        let mut img = RgbImage::new(8, 6);
        img.put_pixel(2, 3, Rgb([200, 10, 10]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let frame = Frame::from_jpeg(&bytes, 9, 1000).unwrap();
        assert_eq!(frame.shape(), FrameShape::rgb(8, 6));
        assert_eq!(frame.image().get_pixel(2, 3), &Rgb([200, 10, 10]));
    }

    #[test]
    fn grey_and_alpha_images_decode_to_three_channels() {
        let mut bytes = Vec::new();
        image::RgbaImage::from_pixel(5, 4, image::Rgba([10, 200, 30, 128]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let frame = Frame::from_jpeg(&bytes, 1, 0).unwrap();
        assert_eq!(frame.shape(), FrameShape::rgb(5, 4));
        assert_eq!(frame.image().get_pixel(4, 3), &Rgb([10, 200, 30]));

        let mut bytes = Vec::new();
        image::GrayImage::from_pixel(3, 2, image::Luma([77]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let frame = Frame::from_jpeg(&bytes, 2, 0).unwrap();
        assert_eq!(frame.image().as_raw().len(), 3 * 2 * 3);
        assert_eq!(frame.image().get_pixel(0, 0), &Rgb([77, 77, 77]));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = Frame::from_jpeg(&[0x00, 0x01, 0x02], 0, 0).unwrap_err();
        assert!(matches!(err, FrameError::Decode(_)));
    }
}
