//! Error types for the scheduler crate.

use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

/// Errors that can occur during scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Error from the underlying tokio-cron-scheduler
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Repeat interval of zero or otherwise unusable
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Scheduler is not running")]
    NotRunning,
}

impl From<JobSchedulerError> for SchedulerError {
    fn from(err: JobSchedulerError) -> Self {
        SchedulerError::Scheduler(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedulerError::InvalidInterval("sync: 0ms".to_string());
        assert!(err.to_string().contains("Invalid interval"));

        let err = SchedulerError::JobNotFound("sync".to_string());
        assert!(err.to_string().contains("Job not found"));

        assert!(SchedulerError::AlreadyRunning
            .to_string()
            .contains("already running"));
        assert!(SchedulerError::NotRunning.to_string().contains("not running"));
    }
}
