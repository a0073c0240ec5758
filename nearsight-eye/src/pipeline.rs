//! Per-frame fusion loop: acquire → detect → fuse → rank → deliver

use crate::camera::{FrameFetch, FrameSource, StreamGuard};
use crate::config::PipelineConfig;
use crate::error::VisionError;
use crate::frame::FramePair;
use crate::models::Detector;
use crate::processing::{DataOrganizer, FusedObject, FusionEngine, RankedRecord};
use crate::sink::{DeliveryReport, SinkSet};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared "stop requested" flag, checked at the top of every frame
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<RwLock<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        *self.stopped.write() = true;
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.stopped.read()
    }
}

/// Counters for one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frame pairs that went through detection
    pub frames_processed: u64,
    /// Iterations without a usable frame pair
    pub frames_skipped: u64,
    pub records_emitted: u64,
    pub detector_failures: u64,
    pub sink_failures: u64,
}

/// Everything produced for one frame
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub sequence: u64,
    /// Every detection that passed the area filter, including invalid distances
    pub fused: Vec<FusedObject>,
    pub record: RankedRecord,
    pub delivery: DeliveryReport,
}

/// Single-threaded fusion pipeline around an injected detector
pub struct FusionPipeline<D: Detector> {
    detector: D,
    engine: FusionEngine,
    organizer: DataOrganizer,
    sinks: SinkSet,
    max_frames: Option<u64>,
    stop: StopSignal,
    stats: PipelineStats,
}

impl<D: Detector> FusionPipeline<D> {
    /// Create a pipeline with explicitly provided sinks
    pub fn new(config: &PipelineConfig, detector: D, sinks: SinkSet) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;

        Ok(Self {
            detector,
            engine: FusionEngine::new(&config.fusion),
            organizer: DataOrganizer::new(&config.fusion),
            sinks,
            max_frames: config.max_frames,
            stop: StopSignal::new(),
            stats: PipelineStats::default(),
        })
    }

    /// Create a pipeline whose sinks are opened from `config.output`
    pub fn from_config(config: &PipelineConfig, detector: D) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        let sinks = SinkSet::from_config(&config.output)?;
        Self::new(config, detector, sinks)
    }

    /// Handle for requesting a stop from another thread
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Detect, fuse, rank and deliver one frame pair
    pub fn process_frame(&mut self, pair: &FramePair) -> Result<FrameOutcome, VisionError> {
        debug!(
            "Frame {}: {:.1}% of depth pixels without reading",
            pair.sequence,
            pair.depth.zero_fraction() * 100.0
        );

        let detections = self.detector.detect(&pair.color).map_err(|e| match e {
            VisionError::Detector(_) => e,
            other => VisionError::Detector(other.to_string()),
        })?;
        let fused = self.engine.process(&detections, &pair.depth);
        let record = self.organizer.organize(&fused);
        let line = record.to_json_line()?;

        let delivery = self.sinks.deliver(&line)?;
        self.stats.frames_processed += 1;
        self.stats.records_emitted += 1;
        self.stats.sink_failures += delivery.failed.len() as u64;

        debug!("Frame {}: {} ranked of {} fused", pair.sequence, record.filled(), fused.len());

        Ok(FrameOutcome {
            sequence: pair.sequence,
            fused,
            record,
            delivery,
        })
    }

    /// Run until the source ends, a stop is requested or `max_frames` is reached.
    ///
    /// The source is started here and stopped on every exit path.
    pub fn run<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<PipelineStats, VisionError> {
        let mut stream = StreamGuard::start(source)?;
        info!("Fusion pipeline running");

        loop {
            if self.stop.is_stop_requested() {
                info!("Stop requested, leaving fusion loop");
                break;
            }

            if let Some(max) = self.max_frames {
                if self.stats.frames_processed >= max {
                    info!("Processed {} frames, leaving fusion loop", max);
                    break;
                }
            }

            let pair = match stream.next_frame_pair()? {
                FrameFetch::Pair(pair) => pair,
                FrameFetch::Missing => {
                    self.stats.frames_skipped += 1;
                    continue;
                }
                FrameFetch::EndOfStream => {
                    info!("Frame source exhausted");
                    break;
                }
            };

            match self.process_frame(&pair) {
                Ok(_) => {}
                Err(VisionError::Detector(e)) => {
                    error!("Detection failed on frame {}: {}", pair.sequence, e);
                    self.stats.detector_failures += 1;
                    self.stats.frames_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        drop(stream);
        if self.stats.sink_failures > 0 {
            warn!("{} record deliveries failed during the run", self.stats.sink_failures);
        }
        info!(
            "Fusion pipeline finished: {} processed, {} skipped, {} records",
            self.stats.frames_processed, self.stats.frames_skipped, self.stats.records_emitted
        );
        Ok(self.stats)
    }
}
