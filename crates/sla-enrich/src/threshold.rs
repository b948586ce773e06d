//! SLA threshold lookup with memoization.

use std::sync::Arc;

use async_trait::async_trait;
use sla_types::{SlaThreshold, ThresholdKey};
use tracing::{debug, warn};

use crate::cache::CoalescingCache;
use crate::error::Result;

/// Remote provider of SLA thresholds.
#[async_trait]
pub trait ThresholdSource: Send + Sync {
    /// `Ok(None)` means the remote confirmed no threshold is defined.
    async fn fetch_threshold(&self, key: &ThresholdKey) -> Result<Option<SlaThreshold>>;
}

/// Process-wide threshold cache.
///
/// Found and confirmed-absent results are kept until invalidated. A
/// failed lookup yields [`SlaThreshold::undefined`] for that call and is
/// retried on the next one.
pub struct ThresholdCache {
    source: Arc<dyn ThresholdSource>,
    entries: CoalescingCache<ThresholdKey, SlaThreshold>,
}

impl ThresholdCache {
    pub fn new(source: Arc<dyn ThresholdSource>) -> Self {
        Self {
            source,
            entries: CoalescingCache::new(),
        }
    }

    pub async fn lookup(&self, key: &ThresholdKey) -> SlaThreshold {
        let result = self
            .entries
            .get_or_try_fill(key, || async {
                let found = self.source.fetch_threshold(key).await?;
                debug!(key = %key, defined = found.is_some(), "Fetched SLA threshold");
                Ok::<_, crate::error::EnrichError>(found.unwrap_or_default())
            })
            .await;

        match result {
            Ok(threshold) => threshold,
            Err(e) => {
                warn!(key = %key, error = %e, "SLA threshold lookup failed");
                SlaThreshold::undefined()
            }
        }
    }

    pub async fn invalidate(&self, key: &ThresholdKey) -> bool {
        self.entries.invalidate(key).await
    }

    pub async fn clear(&self) {
        self.entries.clear().await;
    }

    pub async fn len(&self) -> usize {
        self.entries.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.is_empty().await
    }
}
