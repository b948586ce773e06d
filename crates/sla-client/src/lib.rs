//! # sla-client
//!
//! HTTP implementations of the sync interfaces:
//!
//! - [`ItopClient`]: tickets, SLA thresholds, person teams and holidays
//!   from the iTop REST API
//! - [`ElasticSink`]: the Elasticsearch index the enriched records live in
//!
//! Transient failures (transport errors, 429, 5xx) are retried with
//! exponential backoff; see [`RetryPolicy`].

pub mod elastic;
pub mod error;
pub mod itop;
pub mod retry;

pub use elastic::{ElasticConfig, ElasticSink};
pub use error::ClientError;
pub use itop::{ItopClient, ItopConfig};
pub use retry::RetryPolicy;
