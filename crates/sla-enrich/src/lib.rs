//! # sla-enrich
//!
//! Enrichment of fetched tickets into indexed records.
//!
//! - [`ThresholdCache`]: memoized SLA threshold lookups with coalesced fills
//! - [`PersonTeamResolver`]: rate-limited, cached person to team lookups
//! - [`compliance`]: tri-state verdicts from a duration and a threshold
//! - [`TicketMapper`]: combines the calendar, thresholds and teams into an
//!   [`sla_types::IndexedTicket`]
//!
//! Remote lookups go through the [`ThresholdSource`] and [`TeamSource`]
//! traits; `sla-client` provides the HTTP implementations.

pub mod cache;
pub mod compliance;
pub mod error;
pub mod gate;
pub mod mapper;
pub mod teams;
pub mod threshold;

pub use cache::CoalescingCache;
pub use compliance::{evaluate, evaluate_raw};
pub use error::{EnrichError, Result};
pub use gate::{IntervalGate, NoopGate, RateGate};
pub use mapper::{impact_label, priority_label, DimensionVerdicts, TicketMapper};
pub use teams::{escape_filter_value, PersonTeamResolver, TeamSource};
pub use threshold::{ThresholdCache, ThresholdSource};
