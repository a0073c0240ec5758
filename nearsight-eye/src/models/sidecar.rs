//! Detector that replays detections recorded next to a frame sequence

use crate::error::VisionError;
use crate::frame::ColorFrame;
use crate::models::detector::{Detection, Detector};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Replays `frame_NNNNN_detections.json` files, one JSON array of detections per frame
pub struct SidecarDetector {
    dir: PathBuf,
}

impl SidecarDetector {
    /// Open a detection directory; a missing directory is an initialization failure
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, VisionError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(VisionError::Detector(format!(
                "Detection directory {} does not exist",
                dir.display()
            )));
        }
        info!("Replaying detections from {}", dir.display());
        Ok(Self { dir })
    }

    /// Path of the detection file for a frame
    pub fn path_for(&self, sequence: u64) -> PathBuf {
        self.dir.join(format!("frame_{:05}_detections.json", sequence))
    }
}

impl Detector for SidecarDetector {
    fn detect(&self, frame: &ColorFrame) -> Result<Vec<Detection>, VisionError> {
        let path = self.path_for(frame.sequence);
        if !path.exists() {
            debug!("No detections recorded for frame {}", frame.sequence);
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path)?;
        let detections: Vec<Detection> = serde_json::from_str(&content).map_err(|e| {
            VisionError::Detector(format!("Invalid detection file {}: {}", path.display(), e))
        })?;
        debug!("Detected {} objects", detections.len());
        Ok(detections)
    }
}
