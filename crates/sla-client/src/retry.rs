//! Retry with exponential backoff for transient HTTP failures.

use std::future::Future;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use tracing::{debug, error, warn};

use crate::error::ClientError;

/// Retry policy shared by the clients.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_interval: Duration,
    /// Give up once this much time has passed
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(500),
            max_elapsed: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut backoff = self.backoff();
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(call = what, attempt = attempts, "Calling remote");

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    if attempts >= self.max_attempts {
                        error!(call = what, error = %e, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                call = what,
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "Remote call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(call = what, error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::default().with_initial_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ClientError::Http("reset".into()))
                } else {
                    Ok(5)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::Status { status: 401, body: "unauthorized".into() })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .with_max_attempts(2)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::Status { status: 502, body: String::new() })
            })
            .await;
        assert!(matches!(result, Err(ClientError::Status { status: 502, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
