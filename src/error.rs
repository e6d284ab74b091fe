// src/error.rs
//! Caller-visible failures of a sort invocation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SortError {
    /// The trigger event is missing its bucket or object key.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// The object key does not follow the mission naming grammar.
    #[error("malformed filename: {0}")]
    MalformedFilename(String),

    /// The instrument has no entry in the destination table.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    /// The object named by the event is not in the source bucket.
    #[error("source object not found: {0}")]
    SourceNotFound(String),

    /// The storage backend failed while checking or copying the object.
    #[error("transfer failed: {0}")]
    TransferFailed(String),
}

impl SortError {
    /// Stable snake_case identifier, used in logs, metrics labels and JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            SortError::InvalidEvent(_) => "invalid_event",
            SortError::MalformedFilename(_) => "malformed_filename",
            SortError::UnknownInstrument(_) => "unknown_instrument",
            SortError::SourceNotFound(_) => "source_not_found",
            SortError::TransferFailed(_) => "transfer_failed",
        }
    }

    /// Data and configuration problems never get better on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SortError::TransferFailed(_))
    }
}

/// Serializable view of a [`SortError`] carried inside results and HTTP bodies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
}

impl From<&SortError> for ErrorInfo {
    fn from(err: &SortError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
