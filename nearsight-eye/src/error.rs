//! Error types for nearsight-eye

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sink error ({sink}): {message}")]
    Sink { sink: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl VisionError {
    /// Build a sink error tagged with the sink's name
    pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
        VisionError::Sink {
            sink: sink.into(),
            message: message.into(),
        }
    }
}

#[cfg(feature = "serial")]
impl From<serialport::Error> for VisionError {
    fn from(err: serialport::Error) -> Self {
        VisionError::sink("serial", err.description)
    }
}
