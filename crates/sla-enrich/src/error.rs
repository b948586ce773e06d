//! Error types for enrichment lookups.

use thiserror::Error;

/// Failure of a remote lookup.
///
/// Lookups that fail are never cached; callers fall back to the
/// unknown sentinel for the current call only.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Remote call failed (transport, HTTP status, API error code)
    #[error("Remote lookup failed: {0}")]
    Remote(String),

    /// Response body could not be interpreted
    #[error("Malformed response: {0}")]
    Parse(String),

    /// Remote is not configured (missing URL or credentials)
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
}

pub type Result<T> = std::result::Result<T, EnrichError>;
