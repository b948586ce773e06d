//! Sync cycle job.
//!
//! Runs [`SyncPipeline::run_cycle`] on every tick. Ticks that arrive while
//! a cycle is still running are skipped, so cycles never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use sla_indexing::SyncPipeline;

use crate::{SchedulerError, SchedulerService};

pub const SYNC_JOB: &str = "sync";

/// Register the sync job with the scheduler.
///
/// # Errors
///
/// Returns error if the interval is zero or registration fails.
pub async fn create_sync_job(
    scheduler: &SchedulerService,
    pipeline: Arc<SyncPipeline>,
    interval: Duration,
) -> Result<Uuid, SchedulerError> {
    let uuid = scheduler
        .add_interval_job(SYNC_JOB, interval, move |token| {
            let pipeline = pipeline.clone();
            async move { run_sync_job(&pipeline, &token).await }
        })
        .await?;

    info!(interval_ms = interval.as_millis(), "Registered sync job");
    Ok(uuid)
}

/// Execute one sync cycle unless shutdown has begun.
pub async fn run_sync_job(
    pipeline: &SyncPipeline,
    token: &CancellationToken,
) -> Result<(), String> {
    if token.is_cancelled() {
        debug!("Sync job cancelled before start");
        return Ok(());
    }

    let result = pipeline
        .run_cycle()
        .await
        .map_err(|e| format!("Sync cycle failed: {}", e))?;

    if result.has_errors() {
        return Err(format!(
            "Sync cycle finished with {} failed classes, {} failed writes",
            result.failed_classes.len(),
            result.upserts.errors + result.deletes.errors
        ));
    }
    Ok(())
}
