//! Record sinks: append-log file, stdout echo and serial link

use crate::config::{OutputConfig, SinkFailurePolicy};
use crate::error::VisionError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Destination for serialized records
#[cfg_attr(test, mockall::automock)]
pub trait RecordSink: Send {
    fn name(&self) -> &'static str;

    /// Deliver one serialized record
    fn deliver(&mut self, line: &str) -> Result<(), VisionError>;
}

/// Appends records to a file, each followed by the terminator
pub struct FileSink {
    path: PathBuf,
    file: File,
    terminator: String,
}

impl FileSink {
    /// Open `path` for appending, creating parent directories and the file as needed
    pub fn open(path: impl AsRef<Path>, terminator: impl Into<String>) -> Result<Self, VisionError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| VisionError::sink("file", format!("Failed to open {}: {}", path.display(), e)))?;

        info!("Appending records to {}", path.display());
        Ok(Self {
            path,
            file,
            terminator: terminator.into(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn deliver(&mut self, line: &str) -> Result<(), VisionError> {
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.write_all(self.terminator.as_bytes()))
            .and_then(|_| self.file.flush())
            .map_err(|e| VisionError::sink("file", format!("{}: {}", self.path.display(), e)))
    }
}

/// Prints records on stdout, one per line
#[derive(Debug, Default)]
pub struct StdoutSink;

impl RecordSink for StdoutSink {
    fn name(&self) -> &'static str {
        "stdout"
    }

    fn deliver(&mut self, line: &str) -> Result<(), VisionError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", line).map_err(|e| VisionError::sink("stdout", e.to_string()))
    }
}

/// Writes records to a serial device
#[cfg(feature = "serial")]
pub struct SerialSink {
    port: Box<dyn serialport::SerialPort>,
    terminator: String,
}

#[cfg(feature = "serial")]
impl SerialSink {
    pub fn open(config: &crate::config::SerialConfig, terminator: impl Into<String>) -> Result<Self, VisionError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .open()
            .map_err(|e| VisionError::sink("serial", format!("Failed to open {}: {}", config.port, e)))?;

        info!("Serial output on {} at {} baud", config.port, config.baud_rate);
        Ok(Self {
            port,
            terminator: terminator.into(),
        })
    }
}

#[cfg(feature = "serial")]
impl RecordSink for SerialSink {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn deliver(&mut self, line: &str) -> Result<(), VisionError> {
        let mut payload = Vec::with_capacity(line.len() + self.terminator.len());
        payload.extend_from_slice(line.as_bytes());
        payload.extend_from_slice(self.terminator.as_bytes());
        self.port
            .write_all(&payload)
            .and_then(|_| self.port.flush())
            .map_err(|e| VisionError::sink("serial", e.to_string()))
    }
}

/// Outcome of delivering one record to every sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Names of the sinks that failed
    pub failed: Vec<String>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans a record out to every configured sink
pub struct SinkSet {
    sinks: Vec<Box<dyn RecordSink>>,
    policy: SinkFailurePolicy,
}

impl SinkSet {
    pub fn new(policy: SinkFailurePolicy) -> Self {
        Self {
            sinks: Vec::new(),
            policy,
        }
    }

    /// Open the sinks described by `config`.
    ///
    /// Failing to open a sink is an initialization error regardless of policy.
    pub fn from_config(config: &OutputConfig) -> Result<Self, VisionError> {
        let mut set = Self::new(config.failure_policy);

        set.push(Box::new(FileSink::open(config.log_path(), config.record_terminator.clone())?));

        if config.echo_stdout {
            set.push(Box::new(StdoutSink));
        }

        if config.serial.enabled {
            set.push(open_serial(config)?);
        }

        Ok(set)
    }

    pub fn push(&mut self, sink: Box<dyn RecordSink>) {
        debug!("Registered {} sink", sink.name());
        self.sinks.push(sink);
    }

    pub fn with_sink(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn policy(&self) -> SinkFailurePolicy {
        self.policy
    }

    /// Deliver `line` to every sink.
    ///
    /// Under `Continue` every sink is attempted and failures are reported; under
    /// `Abort` the first failure is returned.
    pub fn deliver(&mut self, line: &str) -> Result<DeliveryReport, VisionError> {
        let mut report = DeliveryReport::default();
        for sink in self.sinks.iter_mut() {
            match sink.deliver(line) {
                Ok(()) => report.delivered += 1,
                Err(e) => match self.policy {
                    SinkFailurePolicy::Abort => return Err(e),
                    SinkFailurePolicy::Continue => {
                        warn!("Dropping record for {} sink: {}", sink.name(), e);
                        report.failed.push(sink.name().to_string());
                    }
                },
            }
        }
        Ok(report)
    }
}

#[cfg(feature = "serial")]
fn open_serial(config: &OutputConfig) -> Result<Box<dyn RecordSink>, VisionError> {
    Ok(Box::new(SerialSink::open(&config.serial, config.record_terminator.clone())?))
}

#[cfg(not(feature = "serial"))]
fn open_serial(_config: &OutputConfig) -> Result<Box<dyn RecordSink>, VisionError> {
    Err(VisionError::Config(
        "Serial output requested but nearsight-eye was built without the `serial` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn failing_sink(name: &'static str) -> MockRecordSink {
        let mut sink = MockRecordSink::new();
        sink.expect_name().return_const(name);
        sink.expect_deliver()
            .returning(move |_| Err(VisionError::sink(name, "unavailable")));
        sink
    }

    fn counting_sink(name: &'static str, times: usize) -> MockRecordSink {
        let mut sink = MockRecordSink::new();
        sink.expect_name().return_const(name);
        sink.expect_deliver().times(times).returning(|_| Ok(()));
        sink
    }

    #[test]
    fn test_file_sink_appends_with_terminator() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("output.json");

        let mut sink = FileSink::open(&path, "\r").unwrap();
        sink.deliver(r#"{"a":1.0}"#).unwrap();
        sink.deliver(r#"{"b":2.0}"#).unwrap();
        drop(sink);

        // Reopening appends rather than truncating
        let mut sink = FileSink::open(&path, "\r").unwrap();
        sink.deliver(r#"{"c":3.0}"#).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1.0}\r{\"b\":2.0}\r{\"c\":3.0}\r");
    }

    #[test]
    fn test_continue_policy_attempts_every_sink() {
        let mut set = SinkSet::new(SinkFailurePolicy::Continue)
            .with_sink(Box::new(failing_sink("serial")))
            .with_sink(Box::new(counting_sink("file", 1)));

        let report = set.deliver("{}").unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec!["serial".to_string()]);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_abort_policy_stops_at_first_failure() {
        let mut set = SinkSet::new(SinkFailurePolicy::Abort)
            .with_sink(Box::new(failing_sink("serial")))
            .with_sink(Box::new(counting_sink("file", 0)));

        let err = set.deliver("{}").unwrap_err();
        assert!(matches!(err, VisionError::Sink { .. }));
    }

    #[test]
    fn test_from_config_opens_file_and_stdout() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            output_dir: dir.path().join("out"),
            ..OutputConfig::default()
        };

        let set = SinkSet::from_config(&config).unwrap();
        assert_eq!(set.len(), 2);
        assert!(config.log_path().exists());
    }

    #[test]
    fn test_from_config_without_echo() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            output_dir: dir.path().to_path_buf(),
            echo_stdout: false,
            ..OutputConfig::default()
        };
        assert_eq!(SinkSet::from_config(&config).unwrap().len(), 1);
    }

    #[cfg(not(feature = "serial"))]
    #[test]
    fn test_serial_requires_feature() {
        let dir = TempDir::new().unwrap();
        let mut config = OutputConfig {
            output_dir: dir.path().to_path_buf(),
            ..OutputConfig::default()
        };
        config.serial.enabled = true;
        assert!(matches!(SinkSet::from_config(&config), Err(VisionError::Config(_))));
    }
}
