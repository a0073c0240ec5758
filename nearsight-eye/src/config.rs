//! Configuration for nearsight-eye

use crate::error::VisionError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Minimum box area for a 1280x720 stream: an eighth of each dimension
pub const DEFAULT_MIN_BOX_AREA: f32 = 14_400.0;
pub const DEFAULT_SAMPLE_RADIUS: u32 = 3;
pub const DEFAULT_TOP_K: usize = 3;

/// What to do when two ranked objects share a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateLabelPolicy {
    /// Keep both, suffixing later ones (`person_2`, `person_3`, ...)
    Disambiguate,
    /// Later entries replace the earlier value in place; the freed slot is padded
    Overwrite,
}

/// Depth hole filling applied before sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoleFillingMode {
    Disabled,
    /// Zero pixels take the value of their left neighbor
    FillFromLeft,
    /// Zero pixels take the farthest non-zero 4-neighbor
    FarthestFromAround,
    /// Zero pixels take the nearest non-zero 4-neighbor
    NearestFromAround,
}

/// Policy for a sink that fails to deliver a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkFailurePolicy {
    /// Log the failure and keep processing frames
    Continue,
    /// Stop the pipeline with the sink error
    Abort,
}

/// Fusion and ranking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Detections with a smaller box area (pixels²) are dropped
    pub min_box_area: f32,
    /// Half side of the square depth neighborhood
    pub sample_radius: u32,
    /// Number of slots in each ranked record
    pub top_k: usize,
    pub duplicate_labels: DuplicateLabelPolicy,
    pub hole_filling: HoleFillingMode,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            min_box_area: DEFAULT_MIN_BOX_AREA,
            sample_radius: DEFAULT_SAMPLE_RADIUS,
            top_k: DEFAULT_TOP_K,
            duplicate_labels: DuplicateLabelPolicy::Disambiguate,
            hole_filling: HoleFillingMode::Disabled,
        }
    }
}

impl FusionConfig {
    /// Area threshold tuned to a stream resolution: `(width / 8) × (height / 8)`
    pub fn area_for_resolution(width: u32, height: u32) -> f32 {
        ((width / 8) * (height / 8)) as f32
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.min_box_area.is_finite() || self.min_box_area < 0.0 {
            return Err("Minimum box area must be a non-negative number".to_string());
        }

        if self.sample_radius > 64 {
            return Err("Sample radius too large (max 64)".to_string());
        }

        if self.top_k == 0 {
            return Err("Top-K must be greater than 0".to_string());
        }

        if self.top_k > 100 {
            return Err("Top-K too large (max 100)".to_string());
        }

        Ok(())
    }
}

/// Serial link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub enabled: bool,
    /// Device path (`/dev/ttyUSB0`, `COM4`, ...)
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            timeout_ms: 1000,
        }
    }
}

/// Where ranked records go
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding the append-only record log; created if absent
    pub output_dir: PathBuf,
    pub file_name: String,
    /// Written after every record, in the file and on the serial link
    pub record_terminator: String,
    /// Print every record on stdout
    pub echo_stdout: bool,
    pub failure_policy: SinkFailurePolicy,
    pub serial: SerialConfig,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./out"),
            file_name: "output.json".to_string(),
            record_terminator: "\r".to_string(),
            echo_stdout: true,
            failure_policy: SinkFailurePolicy::Continue,
            serial: SerialConfig::default(),
        }
    }
}

impl OutputConfig {
    /// Full path of the record log
    pub fn log_path(&self) -> PathBuf {
        self.output_dir.join(&self.file_name)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.file_name.is_empty() {
            return Err("Output file name must not be empty".to_string());
        }

        if self.file_name.contains('/') || self.file_name.contains('\\') {
            return Err("Output file name must not contain path separators".to_string());
        }

        if self.serial.enabled {
            if self.serial.port.is_empty() {
                return Err("Serial port must be set when serial output is enabled".to_string());
            }
            if self.serial.baud_rate == 0 {
                return Err("Serial baud rate must be greater than 0".to_string());
            }
        }

        Ok(())
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stop after this many frame pairs have been processed
    pub max_frames: Option<u64>,
    pub fusion: FusionConfig,
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Default location of the configuration file, `~/.nearsight/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|mut p| {
                p.push(".nearsight");
                p.push("config.toml");
                p
            })
            .unwrap_or_else(|| PathBuf::from("./nearsight.toml"))
    }

    /// Parse a TOML document without validating it; missing keys keep their defaults
    pub fn parse_toml(content: &str) -> Result<Self, VisionError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, VisionError> {
        let config = Self::parse_toml(content)?;
        config.validate().map_err(VisionError::Config)?;
        Ok(config)
    }

    /// Read a TOML configuration file without validating it, for callers
    /// that adjust values before checking them
    pub fn read_file(path: &Path) -> Result<Self, VisionError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisionError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse_toml(&content)
    }

    /// Load and validate a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self, VisionError> {
        let config = Self::read_file(path)?;
        config.validate().map_err(VisionError::Config)?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, VisionError> {
        toml::to_string_pretty(self)
            .map_err(|e| VisionError::Config(format!("Failed to render configuration: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.fusion.validate()?;
        self.output.validate()?;

        if self.max_frames == Some(0) {
            return Err("Max frames must be greater than 0 when set".to_string());
        }

        Ok(())
    }
}
