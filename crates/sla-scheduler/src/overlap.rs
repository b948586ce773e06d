//! Overlap control for periodic jobs.
//!
//! A tick that fires while the previous run of the same job is still in
//! progress is skipped and counted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Tracks whether a job is running and how many ticks were dropped.
#[derive(Default)]
pub struct OverlapGuard {
    active: Arc<AtomicBool>,
    skipped: AtomicU64,
}

impl OverlapGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the job for one run.
    ///
    /// Returns `None` while another run holds the guard; the dropped tick
    /// is counted.
    pub fn try_acquire(&self) -> Option<RunGuard> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(RunGuard {
                flag: self.active.clone(),
            })
        } else {
            self.skipped.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Ticks dropped because a run was still active.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::SeqCst)
    }
}

/// Releases the guard when dropped, including on panic.
pub struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
