//! Fusion processing stages

pub mod filter;
pub mod fusion;
pub mod hole_filling;
pub mod organizer;
pub mod sampler;

pub use filter::DetectionFilter;
pub use fusion::{FusedObject, FusionEngine};
pub use hole_filling::fill_holes;
pub use organizer::{DataOrganizer, RankedRecord, RecordValue};
pub use sampler::DepthSampler;
