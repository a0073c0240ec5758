//! Detection/depth fusion

use crate::config::{FusionConfig, HoleFillingMode};
use crate::frame::DepthMap;
use crate::models::Detection;
use crate::processing::filter::DetectionFilter;
use crate::processing::hole_filling::fill_holes;
use crate::processing::sampler::DepthSampler;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A detection annotated with its estimated distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedObject {
    pub label: String,
    /// Millimeters; `None` when the neighborhood had no valid depth
    pub distance_mm: Option<u32>,
    #[serde(default)]
    pub score: f32,
}

impl FusedObject {
    pub fn new(label: impl Into<String>, distance_mm: Option<u32>) -> Self {
        Self {
            label: label.into(),
            distance_mm,
            score: 0.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.distance_mm.is_some()
    }
}

/// Assigns distances to detections from the co-registered depth map
#[derive(Debug, Clone)]
pub struct FusionEngine {
    filter: DetectionFilter,
    sampler: DepthSampler,
    hole_filling: HoleFillingMode,
}

impl FusionEngine {
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            filter: DetectionFilter::new(config.min_box_area),
            sampler: DepthSampler::new(config.sample_radius),
            hole_filling: config.hole_filling,
        }
    }

    pub fn filter(&self) -> &DetectionFilter {
        &self.filter
    }

    pub fn sampler(&self) -> &DepthSampler {
        &self.sampler
    }

    /// One fused object per detection, in input order.
    ///
    /// Objects without a valid depth are kept with `distance_mm: None`; the
    /// organizer drops them when ranking.
    pub fn fuse(&self, detections: &[Detection], depth: &DepthMap) -> Vec<FusedObject> {
        detections
            .iter()
            .map(|detection| {
                let (cx, cy) = detection.bbox.center();
                let distance_mm = self.sampler.sample(depth, cx, cy);
                if distance_mm.is_none() {
                    debug!(
                        "No valid depth around ({:.1}, {:.1}) for '{}'",
                        cx, cy, detection.label
                    );
                }
                FusedObject {
                    label: detection.label.clone(),
                    distance_mm,
                    score: detection.score,
                }
            })
            .collect()
    }

    /// Area-filter the raw detections, fill depth holes if configured, then fuse
    pub fn process(&self, detections: &[Detection], depth: &DepthMap) -> Vec<FusedObject> {
        let kept = self.filter.apply(detections);
        debug!(
            "Kept {} of {} detections (min area {})",
            kept.len(),
            detections.len(),
            self.filter.min_area()
        );

        if kept.is_empty() {
            return Vec::new();
        }

        match self.hole_filling {
            HoleFillingMode::Disabled => self.fuse(&kept, depth),
            mode => self.fuse(&kept, &fill_holes(depth, mode)),
        }
    }
}
