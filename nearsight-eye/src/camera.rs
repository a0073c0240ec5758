//! Frame sources: the acquisition capability and a recorded-sequence replay

use crate::error::VisionError;
use crate::frame::{ColorFrame, DepthMap, FramePair};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of waiting for the next frame pair
#[derive(Debug)]
pub enum FrameFetch {
    Pair(FramePair),
    /// Depth or color missing for this iteration; try again
    Missing,
    /// The source has nothing more to deliver
    EndOfStream,
}

/// Synchronized depth + color acquisition
#[cfg_attr(test, mockall::automock)]
pub trait FrameSource: Send {
    /// Start streaming; failure here is fatal to the pipeline
    fn start(&mut self) -> Result<(), VisionError>;

    /// Stop streaming and release the device
    fn stop(&mut self);

    /// Block until the next frame pair is available
    fn next_frame_pair(&mut self) -> Result<FrameFetch, VisionError>;
}

/// Keeps a source streaming for the guard's lifetime; stops it on drop
pub struct StreamGuard<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: FrameSource + ?Sized> StreamGuard<'a, S> {
    /// Start `source`; it is stopped again on every exit path once this returns
    pub fn start(source: &'a mut S) -> Result<Self, VisionError> {
        source.start()?;
        Ok(Self { source })
    }

    pub fn next_frame_pair(&mut self) -> Result<FrameFetch, VisionError> {
        self.source.next_frame_pair()
    }
}

impl<S: FrameSource + ?Sized> Drop for StreamGuard<'_, S> {
    fn drop(&mut self) {
        self.source.stop();
    }
}

/// Read a 16-bit grayscale image as a millimeter depth map
pub fn load_depth_png(path: &Path) -> Result<DepthMap, VisionError> {
    let image = image::open(path)?.to_luma16();
    let (width, height) = image.dimensions();
    DepthMap::new(width, height, image.into_raw())
}

/// Replays `frame_NNNNN_depth.png` (16-bit) / `frame_NNNNN_color.png` pairs from a directory
pub struct ReplaySource {
    dir: PathBuf,
    next_sequence: u64,
    is_running: bool,
}

impl ReplaySource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            next_sequence: 0,
            is_running: false,
        }
    }

    /// Begin replay at a later frame
    pub fn starting_at(mut self, sequence: u64) -> Self {
        self.next_sequence = sequence;
        self
    }

    pub fn depth_path(&self, sequence: u64) -> PathBuf {
        self.dir.join(format!("frame_{:05}_depth.png", sequence))
    }

    pub fn color_path(&self, sequence: u64) -> PathBuf {
        self.dir.join(format!("frame_{:05}_color.png", sequence))
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    fn load_color(path: &Path, sequence: u64) -> Result<ColorFrame, VisionError> {
        let image = image::open(path)?.to_rgb8();
        let (width, height) = image.dimensions();
        let mut data = image.into_raw();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        ColorFrame::new(sequence, width, height, data)
    }
}

impl FrameSource for ReplaySource {
    fn start(&mut self) -> Result<(), VisionError> {
        if !self.dir.is_dir() {
            return Err(VisionError::Camera(format!(
                "Replay directory {} does not exist",
                self.dir.display()
            )));
        }
        self.is_running = true;
        info!("Replay stream started from {}", self.dir.display());
        Ok(())
    }

    fn stop(&mut self) {
        if self.is_running {
            self.is_running = false;
            info!("Replay stream stopped");
        }
    }

    fn next_frame_pair(&mut self) -> Result<FrameFetch, VisionError> {
        if !self.is_running {
            return Err(VisionError::Camera("Replay stream not started".to_string()));
        }

        let sequence = self.next_sequence;
        let depth_path = self.depth_path(sequence);
        let color_path = self.color_path(sequence);

        let has_depth = depth_path.exists();
        let has_color = color_path.exists();
        if !has_depth && !has_color {
            debug!("No frame {} in replay directory, end of stream", sequence);
            return Ok(FrameFetch::EndOfStream);
        }

        self.next_sequence += 1;

        if !has_depth || !has_color {
            warn!("Frame {} is missing its {} image", sequence, if has_depth { "color" } else { "depth" });
            return Ok(FrameFetch::Missing);
        }

        let loaded = load_depth_png(&depth_path)
            .and_then(|depth| Ok((depth, Self::load_color(&color_path, sequence)?)));
        let (depth, color) = match loaded {
            Ok(images) => images,
            Err(e) => {
                warn!("Skipping frame {}: unreadable image: {}", sequence, e);
                return Ok(FrameFetch::Missing);
            }
        };

        match FramePair::new(depth, color) {
            Ok(pair) => Ok(FrameFetch::Pair(pair)),
            Err(e) => {
                warn!("Skipping frame {}: {}", sequence, e);
                Ok(FrameFetch::Missing)
            }
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_depth(path: &Path, width: u32, height: u32, value: u16) {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(width, height, Luma([value]));
        img.save(path).unwrap();
    }

    fn write_color(path: &Path, width: u32, height: u32) {
        let img: RgbImage = ImageBuffer::from_pixel(width, height, Rgb([10, 20, 30]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_start_requires_directory() {
        let dir = TempDir::new().unwrap();
        let mut source = ReplaySource::new(dir.path().join("missing"));
        assert!(matches!(source.start(), Err(VisionError::Camera(_))));
    }

    #[test]
    fn test_next_before_start_fails() {
        let dir = TempDir::new().unwrap();
        let mut source = ReplaySource::new(dir.path());
        assert!(source.next_frame_pair().is_err());
    }

    #[test]
    fn test_replays_pairs_then_ends() {
        let dir = TempDir::new().unwrap();
        let mut source = ReplaySource::new(dir.path());
        write_depth(&source.depth_path(0), 4, 3, 1200);
        write_color(&source.color_path(0), 4, 3);

        source.start().unwrap();
        match source.next_frame_pair().unwrap() {
            FrameFetch::Pair(pair) => {
                assert_eq!(pair.sequence, 0);
                assert_eq!(pair.depth.get(3, 2), Some(1200));
                // Stored as RGB, delivered as BGR
                assert_eq!(&pair.color.data[..3], &[30, 20, 10]);
            }
            other => panic!("Expected a frame pair, got {:?}", other),
        }
        assert!(matches!(source.next_frame_pair().unwrap(), FrameFetch::EndOfStream));
    }

    #[test]
    fn test_half_pair_is_missing() {
        let dir = TempDir::new().unwrap();
        let mut source = ReplaySource::new(dir.path());
        write_depth(&source.depth_path(0), 2, 2, 500);
        write_depth(&source.depth_path(1), 2, 2, 500);
        write_color(&source.color_path(1), 2, 2);

        source.start().unwrap();
        assert!(matches!(source.next_frame_pair().unwrap(), FrameFetch::Missing));
        assert!(matches!(source.next_frame_pair().unwrap(), FrameFetch::Pair(_)));
    }

    #[test]
    fn test_mismatched_resolution_is_missing() {
        let dir = TempDir::new().unwrap();
        let mut source = ReplaySource::new(dir.path());
        write_depth(&source.depth_path(0), 4, 4, 500);
        write_color(&source.color_path(0), 2, 2);

        source.start().unwrap();
        assert!(matches!(source.next_frame_pair().unwrap(), FrameFetch::Missing));
    }

    #[test]
    fn test_corrupt_image_is_missing() {
        let dir = TempDir::new().unwrap();
        let mut source = ReplaySource::new(dir.path());
        std::fs::write(source.depth_path(0), b"not a png").unwrap();
        write_color(&source.color_path(0), 2, 2);
        write_depth(&source.depth_path(1), 2, 2, 500);
        write_color(&source.color_path(1), 2, 2);

        source.start().unwrap();
        assert!(matches!(source.next_frame_pair().unwrap(), FrameFetch::Missing));
        assert!(matches!(source.next_frame_pair().unwrap(), FrameFetch::Pair(_)));
    }

    #[test]
    fn test_guard_stops_source_on_drop() {
        let mut source = MockFrameSource::new();
        source.expect_start().times(1).returning(|| Ok(()));
        source
            .expect_next_frame_pair()
            .times(1)
            .returning(|| Ok(FrameFetch::EndOfStream));
        source.expect_stop().times(1).return_const(());

        let mut guard = StreamGuard::start(&mut source).unwrap();
        assert!(matches!(guard.next_frame_pair().unwrap(), FrameFetch::EndOfStream));
        drop(guard);
        source.checkpoint();
    }

    #[test]
    fn test_guard_not_created_when_start_fails() {
        let mut source = MockFrameSource::new();
        source
            .expect_start()
            .returning(|| Err(VisionError::Camera("no device".to_string())));
        source.expect_stop().times(0);

        assert!(StreamGuard::start(&mut source).is_err());
    }
}
