//! Detector capability and the detections it produces

use crate::error::VisionError;
use crate::frame::ColorFrame;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// `width × height` with each side clamped at zero, so any inverted box has area 0
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x_min + self.x_max) / 2.0, (self.y_min + self.y_max) / 2.0)
    }
}

/// Detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label: String,
    #[serde(default)]
    pub score: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f32, bbox: BoundingBox) -> Self {
        Self {
            bbox,
            label: label.into(),
            score,
        }
    }
}

/// Object detector run on one color frame at a time.
///
/// Implementations keep no memory between frames; the pipeline hands every
/// frame in independently.
#[cfg_attr(test, mockall::automock)]
pub trait Detector: Send {
    /// Detect objects in a color frame
    fn detect(&self, frame: &ColorFrame) -> Result<Vec<Detection>, VisionError>;
}

impl<D: Detector + Sync + ?Sized> Detector for std::sync::Arc<D> {
    fn detect(&self, frame: &ColorFrame) -> Result<Vec<Detection>, VisionError> {
        (**self).detect(frame)
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&self, frame: &ColorFrame) -> Result<Vec<Detection>, VisionError> {
        (**self).detect(frame)
    }
}
