//! Error types for the export pipeline.

use thiserror::Error;

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for geometry export operations.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The host geometry query could not complete.
    #[error("Geometry source unavailable for {selector}: {reason}")]
    SourceUnavailable { selector: String, reason: String },

    /// A raw triangle buffer does not describe whole triangles.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Malformed geometry reached the encoder.
    #[error("Encoding failure: {0}")]
    EncodingFailure(String),

    /// The host storage write was rejected or timed out.
    #[error("Asset sink unavailable for key '{key}': {reason}")]
    SinkUnavailable { key: String, reason: String },

    /// Storage key cannot be used by the sink.
    #[error("Invalid storage key: '{0}'")]
    InvalidKey(String),

    /// An export is already running on this exporter.
    #[error("An export is already in progress")]
    ExportInProgress,

    /// A GLB container failed validation while being read back.
    #[error("Invalid GLB container: {0}")]
    InvalidGlb(String),

    /// Failed to serialize or parse JSON data.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    pub(crate) fn source_unavailable(selector: impl ToString, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn sink_unavailable(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::SinkUnavailable {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}
