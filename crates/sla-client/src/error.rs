//! Error types for the HTTP clients.

use sla_calendar::CalendarError;
use sla_enrich::EnrichError;
use sla_indexing::IndexingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// URL or credentials missing
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Transport failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Ticketing system reported an error code in the response envelope
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Response body could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Client could not be built
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(_) => true,
            ClientError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Convert for the ticket source interface.
    pub fn into_source_error(self) -> IndexingError {
        match self {
            ClientError::NotConfigured(msg) => IndexingError::SourceUnavailable(msg),
            other => IndexingError::Source(other.to_string()),
        }
    }

    /// Convert for the sink interface.
    pub fn into_sink_error(self) -> IndexingError {
        IndexingError::Sink(self.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err.to_string())
    }
}

impl From<ClientError> for EnrichError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotConfigured(msg) => EnrichError::SourceUnavailable(msg),
            ClientError::Parse(msg) => EnrichError::Parse(msg),
            other => EnrichError::Remote(other.to_string()),
        }
    }
}

impl From<ClientError> for CalendarError {
    fn from(err: ClientError) -> Self {
        CalendarError::Source(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ClientError::Http("connection reset".into()).is_transient());
        assert!(ClientError::Status { status: 503, body: String::new() }.is_transient());
        assert!(ClientError::Status { status: 429, body: String::new() }.is_transient());
        assert!(!ClientError::Status { status: 401, body: String::new() }.is_transient());
        assert!(!ClientError::Api { code: 1, message: "bad".into() }.is_transient());
    }

    #[test]
    fn test_conversions() {
        let err = ClientError::NotConfigured("missing ITOP_API_URL".into());
        assert!(matches!(err.into_source_error(), IndexingError::SourceUnavailable(_)));

        let err = EnrichError::from(ClientError::Parse("eof".into()));
        assert!(matches!(err, EnrichError::Parse(_)));

        let err = EnrichError::from(ClientError::Api { code: 100, message: "denied".into() });
        assert!(matches!(err, EnrichError::Remote(_)));
    }
}
