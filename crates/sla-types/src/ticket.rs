//! Ticket records fetched from the ticketing system.
//!
//! Tickets are never persisted by this system; they are fetched fresh
//! every sync cycle and projected into [`crate::IndexedTicket`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A ticket as returned by the ticketing system.
///
/// Identity is the composite (id, reference, class). The class is stamped
/// by the fetcher since the ticketing system reports it per query, not per
/// object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub reference: String,
    pub class: String,
    pub title: String,
    pub status: String,
    /// Raw priority code ("1".."4")
    pub priority: String,
    /// Raw urgency code ("1".."4")
    pub urgency: String,
    /// Raw impact code ("1".."3")
    pub impact: String,
    pub service_id: String,
    pub service_name: String,
    pub service_subcategory: String,
    pub agent_id: String,
    pub agent: String,
    pub team_id: String,
    pub team: String,
    /// Display name of the caller, used for the team lookup
    pub caller: String,
    pub origin: String,

    /// When the ticket was opened
    pub start_date: Option<DateTime<Utc>>,
    /// When the ticket was first assigned (response event)
    pub assignment_date: Option<DateTime<Utc>>,
    /// When the ticket was resolved (resolution event)
    pub resolution_date: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Create a ticket with its identity fields set.
    pub fn new(
        id: impl Into<String>,
        reference: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            reference: reference.into(),
            class: class.into(),
            ..Default::default()
        }
    }

    /// Stable sink address for this ticket.
    pub fn identity_hash(&self) -> String {
        identity_hash(&self.id, &self.reference, &self.class)
    }
}

/// Deterministic digest of a ticket's identity fields.
///
/// Hex-encoded SHA-256 of `id:reference:class`. The same composite key
/// always yields the same sink document ID, which is what keeps a sink
/// free of duplicate records for one source ticket.
pub fn identity_hash(id: &str, reference: &str, class: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(b":");
    hasher.update(reference.as_bytes());
    hasher.update(b":");
    hasher.update(class.as_bytes());
    hex::encode(hasher.finalize())
}
