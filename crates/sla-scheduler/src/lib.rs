//! Background job scheduler for the sla-sync daemon.
//!
//! Wraps `tokio-cron-scheduler` with fixed-interval jobs, an overlap guard
//! per job and graceful shutdown through a `CancellationToken`.
//!
//! # Example
//!
//! ```ignore
//! use sla_scheduler::{SchedulerService, SchedulerConfig, create_sync_job};
//!
//! let config = SchedulerConfig::from_settings(&settings);
//! let scheduler = SchedulerService::new(config.clone()).await?;
//! create_sync_job(&scheduler, pipeline, config.sync_interval()).await?;
//! scheduler.start().await?;
//! ```

mod config;
mod error;
mod overlap;
mod scheduler;

#[cfg(feature = "jobs")]
pub mod jobs;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use overlap::{OverlapGuard, RunGuard};
pub use scheduler::{JobStatus, SchedulerService};

#[cfg(feature = "jobs")]
pub use jobs::{create_holiday_refresh_job, create_sync_job};
