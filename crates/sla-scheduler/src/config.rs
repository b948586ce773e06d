//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use sla_types::Settings;

use crate::SchedulerError;

/// Intervals of the daemon's periodic jobs and the shutdown grace period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Milliseconds between sync cycles (default 3000)
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,

    /// Milliseconds between holiday file refreshes (default 10000)
    #[serde(default = "default_holiday_refresh_ms")]
    pub holiday_refresh_ms: u64,

    /// Seconds a running job is given to finish on shutdown (default 30)
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_sync_interval_ms() -> u64 {
    3_000
}

fn default_holiday_refresh_ms() -> u64 {
    10_000
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: default_sync_interval_ms(),
            holiday_refresh_ms: default_holiday_refresh_ms(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            sync_interval_ms: settings.sync.interval_ms,
            holiday_refresh_ms: settings.sync.holiday_refresh_ms,
            ..Default::default()
        }
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn holiday_refresh(&self) -> Duration {
        Duration::from_millis(self.holiday_refresh_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Reject zero intervals.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.sync_interval_ms == 0 {
            return Err(SchedulerError::InvalidInterval(
                "sync interval must be positive".to_string(),
            ));
        }
        if self.holiday_refresh_ms == 0 {
            return Err(SchedulerError::InvalidInterval(
                "holiday refresh interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
