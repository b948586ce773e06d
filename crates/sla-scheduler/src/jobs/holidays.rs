//! Holiday file refresh job.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use sla_calendar::{refresh_holiday_file, HolidaySource};

use crate::{SchedulerError, SchedulerService};

pub const HOLIDAY_JOB: &str = "holiday_refresh";

/// Register the job that rewrites `path` from `source` every `interval`.
///
/// A failed refresh leaves the existing file in place; the sync cycle keeps
/// reading it.
pub async fn create_holiday_refresh_job(
    scheduler: &SchedulerService,
    source: Arc<dyn HolidaySource>,
    path: PathBuf,
    interval: Duration,
) -> Result<Uuid, SchedulerError> {
    let log_path = path.display().to_string();
    let uuid = scheduler
        .add_interval_job(HOLIDAY_JOB, interval, move |token| {
            let source = source.clone();
            let path = path.clone();
            async move { run_holiday_refresh(source.as_ref(), &path, &token).await }
        })
        .await?;

    info!(path = %log_path, interval_ms = interval.as_millis(), "Registered holiday refresh job");
    Ok(uuid)
}

pub async fn run_holiday_refresh(
    source: &dyn HolidaySource,
    path: &Path,
    token: &CancellationToken,
) -> Result<(), String> {
    if token.is_cancelled() {
        return Ok(());
    }
    refresh_holiday_file(source, path)
        .await
        .map(|_| ())
        .map_err(|e| format!("Holiday refresh failed: {}", e))
}
