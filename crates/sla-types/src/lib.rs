//! # sla-types
//!
//! Shared domain types for the SLA sync system.
//!
//! This crate defines the data structures passed between the calendar,
//! enrichment, indexing and client crates:
//! - Tickets: records fetched fresh from the ticketing system every cycle
//! - Indexed tickets: the enriched projection stored in the search index
//! - Compliance: thresholds, threshold keys and tri-state verdicts
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use sla_types::{identity_hash, ComplianceVerdict};
//!
//! let id = identity_hash("42", "I-000042", "Incident");
//! assert_eq!(id.len(), 64);
//! assert_eq!(ComplianceVerdict::Unknown.as_str(), "");
//! ```

pub mod compliance;
pub mod config;
pub mod error;
pub mod indexed;
pub mod ticket;

pub use compliance::{ComplianceVerdict, SlaThreshold, ThresholdKey};
pub use config::{ElasticSettings, ItopSettings, Settings, SyncSettings};
pub use error::SyncError;
pub use indexed::IndexedTicket;
pub use ticket::{identity_hash, Ticket};

/// Sentinel stored when a person has no resolvable team.
pub const NO_TEAM: &str = "-";
