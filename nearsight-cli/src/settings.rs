// Configuration resolution: file on disk, then command-line overrides

use anyhow::Context;
use clap::Args;
use nearsight_eye::PipelineConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Command-line overrides for the pipeline configuration
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Directory holding the record log
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Minimum detection box area in pixels²
    #[arg(long)]
    pub min_area: Option<f32>,

    /// Depth sampling radius in pixels
    #[arg(long)]
    pub radius: Option<u32>,

    /// Number of ranked slots per record
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Also send records over the serial link
    #[arg(long)]
    pub serial: bool,

    /// Serial device path
    #[arg(long)]
    pub serial_port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    pub baud: Option<u32>,

    /// Do not echo records on stdout
    #[arg(long)]
    pub no_echo: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(dir) = &self.output_dir {
            config.output.output_dir = dir.clone();
        }
        if let Some(area) = self.min_area {
            config.fusion.min_box_area = area;
        }
        if let Some(radius) = self.radius {
            config.fusion.sample_radius = radius;
        }
        if let Some(top_k) = self.top_k {
            config.fusion.top_k = top_k;
        }
        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
        if self.serial {
            config.output.serial.enabled = true;
        }
        if let Some(port) = &self.serial_port {
            config.output.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.output.serial.baud_rate = baud;
        }
        if self.no_echo {
            config.output.echo_stdout = false;
        }
    }
}

/// Load the configuration file without validating it.
///
/// An explicit path must exist; otherwise the default location is used when
/// present and built-in defaults when not. Validation happens in [`resolve`]
/// once overrides are applied.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    if let Some(path) = explicit {
        info!("Loading configuration from {}", path.display());
        return PipelineConfig::read_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()));
    }

    let default_path = PipelineConfig::default_path();
    if default_path.exists() {
        info!("Loading configuration from {}", default_path.display());
        return PipelineConfig::read_file(&default_path)
            .with_context(|| format!("Failed to load configuration from {}", default_path.display()));
    }

    debug!("No configuration file, using defaults");
    Ok(PipelineConfig::default())
}

/// Load, override and validate
pub fn resolve(explicit: Option<&Path>, overrides: &Overrides) -> anyhow::Result<PipelineConfig> {
    let mut config = load(explicit)?;
    overrides.apply(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let mut config = PipelineConfig::default();
        Overrides::default().apply(&mut config);
        assert_eq!(config.fusion.top_k, 3);
        assert!(config.output.echo_stdout);
        assert!(!config.output.serial.enabled);
    }

    #[test]
    fn test_overrides_applied() {
        let overrides = Overrides {
            output_dir: Some(PathBuf::from("/tmp/records")),
            min_area: Some(100.0),
            radius: Some(1),
            top_k: Some(5),
            max_frames: Some(10),
            serial: true,
            serial_port: Some("COM4".to_string()),
            baud: Some(9600),
            no_echo: true,
        };

        let mut config = PipelineConfig::default();
        overrides.apply(&mut config);
        assert_eq!(config.output.output_dir, PathBuf::from("/tmp/records"));
        assert_eq!(config.fusion.min_box_area, 100.0);
        assert_eq!(config.fusion.sample_radius, 1);
        assert_eq!(config.fusion.top_k, 5);
        assert_eq!(config.max_frames, Some(10));
        assert!(config.output.serial.enabled);
        assert_eq!(config.output.serial.port, "COM4");
        assert_eq!(config.output.serial.baud_rate, 9600);
        assert!(!config.output.echo_stdout);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(load(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }

    #[test]
    fn test_resolve_rejects_invalid_override() {
        let overrides = Overrides {
            top_k: Some(0),
            ..Overrides::default()
        };
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[fusion]\nsample_radius = 2\n");
        assert!(resolve(Some(&path), &overrides).is_err());
    }

    #[test]
    fn test_override_repairs_invalid_file_value() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[fusion]\ntop_k = 0\n");
        assert!(resolve(Some(&path), &Overrides::default()).is_err());

        let overrides = Overrides {
            top_k: Some(4),
            ..Overrides::default()
        };
        let config = resolve(Some(&path), &overrides).unwrap();
        assert_eq!(config.fusion.top_k, 4);
    }
}
