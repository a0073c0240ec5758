//! Bounding-box area filtering

use crate::models::Detection;

/// Keep detections whose box area is at least `min_area`, preserving order
pub fn filter(detections: &[Detection], min_area: f32) -> Vec<Detection> {
    detections
        .iter()
        .filter(|d| d.bbox.area() >= min_area)
        .cloned()
        .collect()
}

/// Area filter bound to a threshold
#[derive(Debug, Clone, Copy)]
pub struct DetectionFilter {
    min_area: f32,
}

impl DetectionFilter {
    pub fn new(min_area: f32) -> Self {
        Self { min_area }
    }

    pub fn min_area(&self) -> f32 {
        self.min_area
    }

    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.bbox.area() >= self.min_area
    }

    pub fn apply(&self, detections: &[Detection]) -> Vec<Detection> {
        filter(detections, self.min_area)
    }
}
