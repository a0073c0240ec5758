//! nearsight-eye: proximity ranking from paired color/depth frames
//!
//! Fuses object detections with a co-registered depth map: every detection
//! large enough to trust gets a distance from the depth samples around its
//! box center, the nearest objects are ranked, and each frame yields a
//! fixed-shape record that is appended to a log, echoed, or sent over a
//! serial link.

pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod sink;

pub use camera::{FrameFetch, FrameSource, ReplaySource, StreamGuard};
pub use config::{FusionConfig, OutputConfig, PipelineConfig};
pub use error::VisionError;
pub use frame::{ColorFrame, DepthMap, FramePair};
pub use models::{BoundingBox, Detection, Detector, SidecarDetector};
pub use pipeline::{FusionPipeline, PipelineStats, StopSignal};
pub use processing::{DataOrganizer, FusedObject, FusionEngine, RankedRecord, RecordValue};
pub use sink::{RecordSink, SinkSet};
