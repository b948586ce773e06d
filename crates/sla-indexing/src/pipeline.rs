//! Sync pipeline.
//!
//! One cycle: fetch every class concurrently, project tickets into indexed
//! records, read the sink snapshot, reconcile, and apply the writes.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use sla_calendar::HolidaySet;
use sla_enrich::TicketMapper;
use sla_types::{Settings, Ticket};

use crate::error::IndexingError;
use crate::reconcile::{reconcile, ReconcilePlan};
use crate::sink::{SinkDocument, TicketSink, TicketSource, UpdateResult};

/// Configuration for the sync pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Ticket classes fetched every cycle
    pub classes: Vec<String>,
    /// Holiday file read at the start of every cycle
    pub holidays_path: PathBuf,
    /// Maximum tickets enriched concurrently
    pub enrich_concurrency: usize,
    /// Plan writes without issuing them
    pub dry_run: bool,
    /// Whether to continue with the next write after a failed one
    pub continue_on_error: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classes: vec!["Incident".to_string(), "UserRequest".to_string()],
            holidays_path: PathBuf::from("holidays.txt"),
            enrich_concurrency: 4,
            dry_run: false,
            continue_on_error: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            classes: settings.classes.clone(),
            holidays_path: settings.expanded_holidays_path(),
            enrich_concurrency: settings.sync.enrich_concurrency,
            dry_run: settings.sync.dry_run,
            continue_on_error: true,
        }
    }

    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_holidays_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.holidays_path = path.into();
        self
    }

    pub fn with_enrich_concurrency(mut self, concurrency: usize) -> Self {
        self.enrich_concurrency = concurrency;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set whether to continue on errors.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

/// Outcome of one sync cycle.
#[derive(Debug, Default, Clone)]
pub struct CycleResult {
    /// Tickets fetched per successfully fetched class
    pub fetched: BTreeMap<String, usize>,
    /// Classes whose fetch failed this cycle
    pub failed_classes: Vec<String>,
    /// Sink records kept untouched because their class failed to fetch
    pub retained: usize,
    /// Target records already up to date
    pub unchanged: usize,
    pub upserts: UpdateResult,
    pub deletes: UpdateResult,
    pub dry_run: bool,
}

impl CycleResult {
    pub fn total_fetched(&self) -> usize {
        self.fetched.values().sum()
    }

    /// Writes actually issued to the sink, successful or not.
    pub fn writes_attempted(&self) -> usize {
        self.upserts.processed + self.upserts.errors + self.deletes.processed + self.deletes.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.failed_classes.is_empty() || self.upserts.errors > 0 || self.deletes.errors > 0
    }
}

/// Periodic reconciliation of the sink against the ticket source.
pub struct SyncPipeline {
    source: Arc<dyn TicketSource>,
    sink: Arc<dyn TicketSink>,
    mapper: Arc<TicketMapper>,
    config: PipelineConfig,
    holidays: RwLock<HolidaySet>,
}

impl SyncPipeline {
    pub fn new(
        source: Arc<dyn TicketSource>,
        sink: Arc<dyn TicketSink>,
        mapper: Arc<TicketMapper>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            sink,
            mapper,
            config,
            holidays: RwLock::new(HolidaySet::new()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Reload the holiday file, keeping the previous set if it cannot be read.
    pub async fn refresh_holidays(&self) -> HolidaySet {
        match HolidaySet::load(&self.config.holidays_path) {
            Ok(set) => {
                *self.holidays.write().await = set.clone();
                set
            }
            Err(e) => {
                warn!(
                    path = %self.config.holidays_path.display(),
                    error = %e,
                    "Failed to read holiday file, keeping previous set"
                );
                self.holidays.read().await.clone()
            }
        }
    }

    /// Fetch every configured class concurrently.
    ///
    /// Returns the tickets of the classes that succeeded and the names of
    /// the classes that failed.
    async fn fetch_all_classes(&self, result: &mut CycleResult) -> Vec<Ticket> {
        let fetches = self.config.classes.iter().map(|class| async move {
            (class, self.source.fetch_by_class(class).await)
        });

        let mut tickets = Vec::new();
        for (class, outcome) in join_all(fetches).await {
            match outcome {
                Ok(batch) => {
                    debug!(class = %class, count = batch.len(), "Fetched tickets");
                    result.fetched.insert(class.clone(), batch.len());
                    tickets.extend(batch);
                }
                Err(e) => {
                    warn!(class = %class, error = %e, "Failed to fetch tickets, skipping class");
                    result.failed_classes.push(class.clone());
                }
            }
        }
        tickets
    }

    /// Run one full cycle.
    ///
    /// Fails without writing anything if the sink snapshot cannot be read.
    /// Individual write failures are counted and logged; with
    /// `continue_on_error` disabled the first one aborts the cycle.
    pub async fn run_cycle(&self) -> Result<CycleResult, IndexingError> {
        let mut result = CycleResult {
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        let tickets = self.fetch_all_classes(&mut result).await;
        let holidays = self.refresh_holidays().await;
        let target = self
            .mapper
            .map_all(&tickets, &holidays, self.config.enrich_concurrency)
            .await;

        let snapshot = self.sink.fetch_all().await.map_err(|e| {
            warn!(sink = %self.sink.name(), error = %e, "Failed to read sink snapshot, aborting cycle");
            e
        })?;

        let failed: HashSet<&str> = result.failed_classes.iter().map(String::as_str).collect();
        let (retained, current): (Vec<SinkDocument>, Vec<SinkDocument>) = snapshot
            .into_iter()
            .partition(|doc| failed.contains(doc.record.class.as_str()));
        result.retained = retained.len();

        let plan = reconcile(&target, &current)?;
        result.unchanged = plan.unchanged;

        self.apply(&plan, &mut result).await?;

        info!(
            fetched = result.total_fetched(),
            failed_classes = result.failed_classes.len(),
            upserted = result.upserts.processed,
            deleted = result.deletes.processed,
            unchanged = result.unchanged,
            retained = result.retained,
            errors = result.upserts.errors + result.deletes.errors,
            dry_run = result.dry_run,
            "Sync cycle complete"
        );
        Ok(result)
    }

    async fn apply(
        &self,
        plan: &ReconcilePlan,
        result: &mut CycleResult,
    ) -> Result<(), IndexingError> {
        for record in &plan.to_upsert {
            let doc_id = record.identity_hash();
            if self.config.dry_run {
                debug!(doc_id = %doc_id, reference = %record.reference, "Would upsert");
                result.upserts.record_skip();
                continue;
            }
            match self.sink.upsert(&doc_id, record).await {
                Ok(()) => {
                    debug!(doc_id = %doc_id, reference = %record.reference, "Upserted");
                    result.upserts.record_success();
                }
                Err(e) => {
                    warn!(
                        sink = %self.sink.name(),
                        doc_id = %doc_id,
                        reference = %record.reference,
                        error = %e,
                        "Failed to upsert record"
                    );
                    if self.config.continue_on_error {
                        result.upserts.record_error();
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        for doc_id in &plan.to_delete {
            if self.config.dry_run {
                debug!(doc_id = %doc_id, "Would delete");
                result.deletes.record_skip();
                continue;
            }
            match self.sink.delete(doc_id).await {
                Ok(()) => {
                    debug!(doc_id = %doc_id, "Deleted");
                    result.deletes.record_success();
                }
                Err(e) => {
                    warn!(sink = %self.sink.name(), doc_id = %doc_id, error = %e, "Failed to delete record");
                    if self.config.continue_on_error {
                        result.deletes.record_error();
                    } else {
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }
}
