//! Scheduler service wrapper around tokio-cron-scheduler.
//!
//! Jobs repeat on a fixed interval. Each job carries an [`OverlapGuard`] and
//! receives the service's shutdown token.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::overlap::OverlapGuard;
use crate::{SchedulerConfig, SchedulerError};

const IDLE_POLL: Duration = Duration::from_millis(50);

struct RegisteredJob {
    name: String,
    uuid: Uuid,
    period: Duration,
    guard: Arc<OverlapGuard>,
}

/// Point-in-time view of a registered job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub name: String,
    pub uuid: Uuid,
    pub period: Duration,
    pub running: bool,
    /// Ticks dropped because the previous run was still active
    pub skipped: u64,
}

/// Service wrapper around JobScheduler for lifecycle management.
pub struct SchedulerService {
    scheduler: JobScheduler,
    config: SchedulerConfig,
    shutdown_token: CancellationToken,
    is_running: AtomicBool,
    jobs: RwLock<Vec<RegisteredJob>>,
}

impl SchedulerService {
    /// Create the service. Jobs run only after `start()`.
    pub async fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;

        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            config,
            shutdown_token: CancellationToken::new(),
            is_running: AtomicBool::new(false),
            jobs: RwLock::new(Vec::new()),
        })
    }

    /// # Errors
    ///
    /// Returns `SchedulerError::AlreadyRunning` if the scheduler is already started.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.scheduler.start().await?;
        info!(jobs = self.jobs.read().await.len(), "Scheduler started");

        Ok(())
    }

    /// Shutdown the scheduler gracefully.
    ///
    /// Cancels the shutdown token, waits up to the configured timeout for
    /// in-flight runs to finish, then stops the scheduler.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NotRunning` if the scheduler is not started.
    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }

        info!("Initiating scheduler shutdown");
        self.shutdown_token.cancel();

        if !self.wait_idle(self.config.shutdown_timeout()).await {
            warn!(
                timeout_secs = self.config.shutdown_timeout_secs,
                "Jobs still running at shutdown timeout"
            );
        }

        if let Err(e) = self.scheduler.shutdown().await {
            warn!("Error during scheduler shutdown: {}", e);
        }

        self.is_running.store(false, Ordering::SeqCst);
        info!("Scheduler shutdown complete");

        Ok(())
    }

    /// Wait until no registered job is running. Returns false on timeout.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let busy = self
                .jobs
                .read()
                .await
                .iter()
                .any(|job| job.guard.is_running());
            if !busy {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(IDLE_POLL).await;
        }
    }

    /// Token cancelled when shutdown begins. Jobs check it between steps.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Register a job that runs every `period`.
    ///
    /// `job_fn` receives the shutdown token; an `Err` is logged and the job
    /// stays scheduled. A tick arriving while the previous run is active is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidInterval` for a zero period.
    pub async fn add_interval_job<F, Fut>(
        &self,
        name: &str,
        period: Duration,
        job_fn: F,
    ) -> Result<Uuid, SchedulerError>
    where
        F: Fn(CancellationToken) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send,
    {
        if period.is_zero() {
            return Err(SchedulerError::InvalidInterval(format!(
                "'{}': period must be positive",
                name
            )));
        }

        let guard = Arc::new(OverlapGuard::new());
        let job_name = name.to_string();
        let job_guard = guard.clone();
        let shutdown_token = self.shutdown_token.clone();

        let job = Job::new_repeated_async(period, move |_uuid, _lock| {
            let name = job_name.clone();
            let guard = job_guard.clone();
            let token = shutdown_token.clone();
            let job_fn = job_fn.clone();

            Box::pin(async move {
                if token.is_cancelled() {
                    debug!(job = %name, "Shutdown in progress, not starting run");
                    return;
                }
                let Some(_run) = guard.try_acquire() else {
                    debug!(job = %name, skipped = guard.skipped(), "Previous run still active, skipping tick");
                    return;
                };

                let start = Instant::now();
                match job_fn(token).await {
                    Ok(()) => {
                        debug!(job = %name, duration_ms = start.elapsed().as_millis(), "Job completed")
                    }
                    Err(e) => {
                        warn!(job = %name, duration_ms = start.elapsed().as_millis(), error = %e, "Job failed")
                    }
                }
            })
        })?;

        let uuid = self.scheduler.add(job).await?;
        info!(job = %name, uuid = %uuid, period_ms = period.as_millis(), "Job registered");

        self.jobs.write().await.push(RegisteredJob {
            name: name.to_string(),
            uuid,
            period,
            guard,
        });

        Ok(uuid)
    }

    /// Status of every registered job, in registration order.
    pub async fn jobs(&self) -> Vec<JobStatus> {
        self.jobs
            .read()
            .await
            .iter()
            .map(|job| JobStatus {
                name: job.name.clone(),
                uuid: job.uuid,
                period: job.period,
                running: job.guard.is_running(),
                skipped: job.guard.skipped(),
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns `SchedulerError::JobNotFound` if no job has that name.
    pub async fn job(&self, name: &str) -> Result<JobStatus, SchedulerError> {
        self.jobs()
            .await
            .into_iter()
            .find(|job| job.name == name)
            .ok_or_else(|| SchedulerError::JobNotFound(name.to_string()))
    }
}
