//! Error types for the sync pipeline.

use sla_calendar::CalendarError;
use sla_types::SyncError;
use thiserror::Error;

/// Errors that can occur in the sync pipeline
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Ticket source call failed
    #[error("Source error: {0}")]
    Source(String),

    /// Ticket source is not configured
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Sink read or write failed
    #[error("Sink error: {0}")]
    Sink(String),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Holiday file error
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),
}

impl From<serde_json::Error> for IndexingError {
    fn from(err: serde_json::Error) -> Self {
        IndexingError::Serialization(err.to_string())
    }
}

/// Shared-type errors surface here only from content hashing.
impl From<SyncError> for IndexingError {
    fn from(err: SyncError) -> Self {
        IndexingError::Serialization(err.to_string())
    }
}
