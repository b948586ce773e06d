//! Outbound rate limiting.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Shared gate every rate-limited remote call passes through.
#[async_trait]
pub trait RateGate: Send + Sync {
    /// Wait until one call may proceed.
    async fn acquire(&self);
}

/// Grants at most one token per `period`, regardless of caller count.
///
/// Waiters queue on the internal lock in arrival order.
pub struct IntervalGate {
    period: Duration,
    next: Mutex<Option<Instant>>,
}

impl IntervalGate {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl RateGate for IntervalGate {
    async fn acquire(&self) {
        let mut next = self.next.lock().await;
        if let Some(at) = *next {
            tokio::time::sleep_until(at).await;
        }
        *next = Some(Instant::now() + self.period);
    }
}

/// Gate that never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGate;

#[async_trait]
impl RateGate for NoopGate {
    async fn acquire(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let gate = IntervalGate::new(Duration::from_millis(200));
        let start = Instant::now();
        gate.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquires_are_spaced() {
        let gate = Arc::new(IntervalGate::new(Duration::from_millis(200)));
        let start = Instant::now();

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.acquire().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_gate_does_not_wait() {
        let gate = IntervalGate::new(Duration::from_millis(200));
        gate.acquire().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let start = Instant::now();
        gate.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_noop_gate() {
        NoopGate.acquire().await;
    }
}
