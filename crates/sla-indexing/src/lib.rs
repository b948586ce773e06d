//! Reconciliation engine and sync pipeline for sla-sync.
//!
//! ## Key Components
//!
//! - [`reconcile`]: pure diff of a target record set against a sink snapshot
//! - [`TicketSource`] / [`TicketSink`]: interfaces to the ticketing system
//!   and the search index
//! - [`SyncPipeline`]: one fetch, enrich, reconcile, apply cycle
//! - [`MemorySink`]: in-process sink for tests and dry runs
//!
//! ## Cycle
//!
//! 1. Every configured class is fetched concurrently; a failing class is
//!    skipped for the cycle
//! 2. Tickets are projected with bounded concurrency
//! 3. The sink snapshot is read; failure aborts before any write
//! 4. Sink records of failed classes are set aside, the rest reconciled
//! 5. Upserts and deletes are applied; failures are counted and retried
//!    next cycle
//!
//! ## Example
//!
//! ```ignore
//! use sla_indexing::{PipelineConfig, SyncPipeline};
//!
//! let pipeline = SyncPipeline::new(source, sink, mapper, PipelineConfig::from_settings(&settings));
//! let result = pipeline.run_cycle().await?;
//! println!("{} upserted, {} deleted", result.upserts.processed, result.deletes.processed);
//! ```

pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod sink;

pub use error::IndexingError;
pub use pipeline::{CycleResult, PipelineConfig, SyncPipeline};
pub use reconcile::{reconcile, ReconcilePlan};
pub use sink::{MemorySink, SinkDocument, TicketSink, TicketSource, UpdateResult, WriteLog};
