//! Object detector capability and replay implementation

pub mod detector;
pub mod sidecar;

pub use detector::{BoundingBox, Detection, Detector};
pub use sidecar::SidecarDetector;
