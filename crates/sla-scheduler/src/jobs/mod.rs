//! Periodic jobs run by the daemon.
//!
//! - **sync**: one reconciliation cycle per tick, never overlapping
//! - **holidays**: refresh of the holiday file from the ticket system

pub mod holidays;
pub mod sync;

pub use holidays::{create_holiday_refresh_job, HOLIDAY_JOB};
pub use sync::{create_sync_job, SYNC_JOB};
