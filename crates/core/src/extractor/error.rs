//! Error types for the extractor module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running the extraction tool.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Extraction binary not found.
    #[error("Extractor not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// The startup capability probe failed.
    #[error("Extractor probe failed: {reason}")]
    ProbeFailed { reason: String },

    /// The tool ran but produced no usable artifact.
    #[error("Extraction failed: {reason}")]
    ExtractionFailed {
        reason: String,
        stderr_tail: Option<String>,
    },

    /// The tool exceeded its wall-clock deadline and was killed.
    #[error("Extraction timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while supervising the process or its output file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// Creates a new extraction failed error with captured stderr.
    pub fn extraction_failed(reason: impl Into<String>, stderr_tail: Option<String>) -> Self {
        Self::ExtractionFailed {
            reason: reason.into(),
            stderr_tail,
        }
    }

    /// Whether the job was killed at its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
