use blob_servo_common::config::DebugConfig;
use blob_servo_common::frame::Frame;
use image::{GrayImage, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::paths::{day_dir, frame_path, mask_path};

const MARKER_RADIUS: i64 = 3;
const MARKER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Everything needed to render one tick for a human.
pub struct DebugArtifact {
    pub frame: Arc<Frame>,
    pub mask: GrayImage,
    /// Absolute centroid in frame pixels, if a target was found.
    pub centroid: Option<(u32, u32)>,
}

/// Hands artifacts to a background writer without ever waiting on it.
///
/// The hand-off queue holds a single artifact; while the writer is busy new
/// artifacts are dropped.
pub struct DebugSink {
    tx: mpsc::Sender<DebugArtifact>,
    every_n_frames: u64,
    dropped: u64,
}

impl DebugSink {
    /// Start the writer task. Must be called inside a tokio runtime.
    pub fn spawn(config: &DebugConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(run_writer(config.output_dir.clone(), rx));
        (
            Self {
                tx,
                every_n_frames: config.every_n_frames.max(1),
                dropped: 0,
            },
            handle,
        )
    }

    /// Whether tick number `tick` should produce an artifact.
    pub fn wants(&self, tick: u64) -> bool {
        tick % self.every_n_frames == 0
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Queue an artifact if the writer is idle. Never blocks.
    pub fn submit(&mut self, artifact: DebugArtifact) -> bool {
        match self.tx.try_send(artifact) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped += 1;
                debug!(dropped = self.dropped, "debug writer busy, dropping artifact");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped += 1;
                warn!("debug writer gone, dropping artifact");
                false
            }
        }
    }
}

async fn run_writer(root: PathBuf, mut rx: mpsc::Receiver<DebugArtifact>) {
    info!(dir = %root.display(), "debug writer started");
    let mut written: u64 = 0;

    while let Some(artifact) = rx.recv().await {
        let root = root.clone();
        let seq = artifact.frame.seq;
        match tokio::task::spawn_blocking(move || write_artifact(&root, &artifact)).await {
            Ok(Ok(())) => {
                written += 1;
                debug!(seq, "debug artifact written");
            }
            Ok(Err(e)) => warn!(error = %e, seq, "failed to write debug artifact"),
            Err(e) => warn!(error = %e, seq, "debug writer task panicked"),
        }
    }

    info!(written, "debug writer stopped");
}

fn write_artifact(root: &Path, artifact: &DebugArtifact) -> Result<(), image::ImageError> {
    let frame = &artifact.frame;
    std::fs::create_dir_all(day_dir(root, frame.captured_at_ms))?;

    artifact
        .mask
        .save(mask_path(root, frame.captured_at_ms, frame.seq))?;

    let mut annotated = frame.image().clone();
    if let Some((cx, cy)) = artifact.centroid {
        draw_marker(&mut annotated, cx, cy);
    }
    annotated.save(frame_path(root, frame.captured_at_ms, frame.seq))?;
    Ok(())
}

/// Filled disc at the centroid, clipped to the image.
fn draw_marker(image: &mut RgbImage, cx: u32, cy: u32) {
    let (w, h) = (image.width() as i64, image.height() as i64);
    for dy in -MARKER_RADIUS..=MARKER_RADIUS {
        for dx in -MARKER_RADIUS..=MARKER_RADIUS {
            if dx * dx + dy * dy > MARKER_RADIUS * MARKER_RADIUS {
                continue;
            }
            let (x, y) = (cx as i64 + dx, cy as i64 + dy);
            if (0..w).contains(&x) && (0..h).contains(&y) {
                image.put_pixel(x as u32, y as u32, MARKER_COLOR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::time::Duration;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "blob-servo-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn artifact(seq: u64) -> DebugArtifact {
        let frame = Frame::from_image(RgbImage::new(16, 12), seq, 1_739_871_000_000);
        DebugArtifact {
            frame: Arc::new(frame),
            mask: GrayImage::from_pixel(16, 12, Luma([255])),
            centroid: Some((8, 6)),
        }
    }

    #[test]
    fn marker_is_clipped_at_edges() {
        let mut image = RgbImage::new(5, 5);
        draw_marker(&mut image, 0, 0);
        assert_eq!(image.get_pixel(0, 0), &MARKER_COLOR);
        assert_eq!(image.get_pixel(3, 0), &MARKER_COLOR);
        assert_eq!(image.get_pixel(3, 3), &Rgb([0, 0, 0]));
    }

    #[test]
    fn writes_mask_and_frame() {
        let root = scratch_dir("write");
        write_artifact(&root, &artifact(7)).unwrap();

        let mask = image::open(mask_path(&root, 1_739_871_000_000, 7)).unwrap();
        assert_eq!(mask.width(), 16);
        let frame = image::open(frame_path(&root, 1_739_871_000_000, 7))
            .unwrap()
            .to_rgb8();
        assert_eq!(frame.get_pixel(8, 6), &MARKER_COLOR);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn sampling_interval() {
        let (tx, _rx) = mpsc::channel(1);
        let sink = DebugSink {
            tx,
            every_n_frames: 30,
            dropped: 0,
        };
        assert!(sink.wants(0));
        assert!(!sink.wants(29));
        assert!(sink.wants(30));
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let mut sink = DebugSink {
            tx,
            every_n_frames: 1,
            dropped: 0,
        };
        assert!(sink.submit(artifact(1)));
        assert!(!sink.submit(artifact(2)));
        assert_eq!(sink.dropped(), 1);
    }

    #[tokio::test]
    async fn writer_task_drains_and_stops() {
        let root = scratch_dir("task");
        let config = DebugConfig {
            enabled: true,
            output_dir: root.clone(),
            every_n_frames: 1,
        };
        let (mut sink, handle) = DebugSink::spawn(&config);
        assert!(sink.submit(artifact(3)));
        drop(sink);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(mask_path(&root, 1_739_871_000_000, 3).exists());
        let _ = std::fs::remove_dir_all(&root);
    }
}
