//! End-to-end test infrastructure for sla-sync.
//!
//! Provides an in-memory ticket system ([`FakeItop`]), an in-memory index
//! and a [`TestHarness`] wiring them through the real sync pipeline.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use sla_calendar::{BusinessCalendar, CalendarError, HolidaySource, WorkWindow};
use sla_enrich::{
    EnrichError, NoopGate, PersonTeamResolver, TeamSource, ThresholdCache, ThresholdSource,
    TicketMapper,
};
use sla_indexing::{IndexingError, MemorySink, PipelineConfig, SyncPipeline, TicketSource};
use sla_types::{SlaThreshold, ThresholdKey, Ticket};

/// In-memory stand-in for the ticketing system.
///
/// Tickets are grouped by class; any class can be switched to failing.
/// Threshold and team lookups are counted so tests can assert on caching.
#[derive(Default)]
pub struct FakeItop {
    tickets: Mutex<BTreeMap<String, Vec<Ticket>>>,
    failing: Mutex<BTreeSet<String>>,
    thresholds: Mutex<BTreeMap<ThresholdKey, SlaThreshold>>,
    teams: Mutex<BTreeMap<String, Vec<String>>>,
    holidays: Mutex<Vec<NaiveDate>>,
    threshold_delay: Mutex<Option<Duration>>,
    threshold_fails: Mutex<bool>,
    pub threshold_calls: AtomicUsize,
    pub team_calls: AtomicUsize,
}

impl FakeItop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tickets of `class`.
    pub fn set_tickets(&self, class: &str, tickets: Vec<Ticket>) {
        self.tickets
            .lock()
            .expect("tickets lock")
            .insert(class.to_string(), tickets);
    }

    /// Add or replace one ticket, matched on id.
    pub fn upsert_ticket(&self, ticket: Ticket) {
        let mut tickets = self.tickets.lock().expect("tickets lock");
        let list = tickets.entry(ticket.class.clone()).or_default();
        list.retain(|t| t.id != ticket.id);
        list.push(ticket);
    }

    pub fn remove_ticket(&self, class: &str, id: &str) {
        if let Some(list) = self.tickets.lock().expect("tickets lock").get_mut(class) {
            list.retain(|t| t.id != id);
        }
    }

    pub fn set_failing(&self, class: &str, failing: bool) {
        let mut set = self.failing.lock().expect("failing lock");
        if failing {
            set.insert(class.to_string());
        } else {
            set.remove(class);
        }
    }

    pub fn set_threshold(&self, key: ThresholdKey, threshold: SlaThreshold) {
        self.thresholds
            .lock()
            .expect("thresholds lock")
            .insert(key, threshold);
    }

    /// Delay every threshold fetch, widening the window for concurrent lookups.
    pub fn set_threshold_delay(&self, delay: Duration) {
        *self.threshold_delay.lock().expect("delay lock") = Some(delay);
    }

    pub fn set_threshold_fails(&self, fails: bool) {
        *self.threshold_fails.lock().expect("threshold lock") = fails;
    }

    pub fn set_teams(&self, person: &str, teams: &[&str]) {
        self.teams.lock().expect("teams lock").insert(
            person.to_string(),
            teams.iter().map(|t| t.to_string()).collect(),
        );
    }

    pub fn set_holidays(&self, dates: Vec<NaiveDate>) {
        *self.holidays.lock().expect("holidays lock") = dates;
    }
}

#[async_trait]
impl TicketSource for FakeItop {
    async fn fetch_by_class(&self, class: &str) -> Result<Vec<Ticket>, IndexingError> {
        if self.failing.lock().expect("failing lock").contains(class) {
            return Err(IndexingError::Source(format!("{class}: connection reset")));
        }
        Ok(self
            .tickets
            .lock()
            .expect("tickets lock")
            .get(class)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ThresholdSource for FakeItop {
    async fn fetch_threshold(
        &self,
        key: &ThresholdKey,
    ) -> sla_enrich::Result<Option<SlaThreshold>> {
        self.threshold_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.threshold_delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.threshold_fails.lock().expect("threshold lock") {
            return Err(EnrichError::Remote("503 Service Unavailable".to_string()));
        }
        Ok(self
            .thresholds
            .lock()
            .expect("thresholds lock")
            .get(key)
            .copied())
    }
}

#[async_trait]
impl TeamSource for FakeItop {
    async fn fetch_teams(&self, escaped_name: &str) -> sla_enrich::Result<Vec<String>> {
        self.team_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .teams
            .lock()
            .expect("teams lock")
            .get(escaped_name)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl HolidaySource for FakeItop {
    async fn fetch_holidays(&self) -> Result<Vec<NaiveDate>, CalendarError> {
        Ok(self.holidays.lock().expect("holidays lock").clone())
    }
}

/// Shared test harness: fake ticket system, in-memory index and a pipeline
/// over both, with the holiday file in a temp dir.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub holidays_path: PathBuf,
    pub itop: Arc<FakeItop>,
    pub sink: Arc<MemorySink>,
    pub thresholds: Arc<ThresholdCache>,
    pub pipeline: SyncPipeline,
}

impl TestHarness {
    /// Harness over an empty index with UTC and the 08:00-17:00 window.
    pub fn new() -> Self {
        Self::with_sink(MemorySink::new(), PipelineConfig::default())
    }

    pub fn with_sink(sink: MemorySink, config: PipelineConfig) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let holidays_path = temp_dir.path().join("holidays.txt");

        let itop = Arc::new(FakeItop::new());
        let sink = Arc::new(sink);
        let thresholds = Arc::new(ThresholdCache::new(itop.clone()));
        let teams = Arc::new(PersonTeamResolver::new(itop.clone(), Arc::new(NoopGate)));
        let mapper = TicketMapper::new(
            BusinessCalendar::new(Tz::UTC, WorkWindow::default()),
            thresholds.clone(),
            teams,
        );
        let config = config
            .with_classes(["Incident", "UserRequest"])
            .with_holidays_path(holidays_path.clone());
        let pipeline = SyncPipeline::new(itop.clone(), sink.clone(), Arc::new(mapper), config);

        Self {
            _temp_dir: temp_dir,
            holidays_path,
            itop,
            sink,
            thresholds,
            pipeline,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// UTC instant on the given day.
pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .expect("valid test timestamp")
}

/// Priority-2 incident on the Email service, opened by Jane Doe.
pub fn incident(id: &str, start: DateTime<Utc>) -> Ticket {
    let mut ticket = Ticket::new(id, format!("I-{:0>6}", id), "Incident");
    ticket.title = format!("Incident {id}");
    ticket.status = "new".to_string();
    ticket.priority = "2".to_string();
    ticket.impact = "2".to_string();
    ticket.urgency = "2".to_string();
    ticket.service_name = "Email".to_string();
    ticket.caller = "Jane Doe".to_string();
    ticket.start_date = Some(start);
    ticket
}

/// Priority-3 user request on the Printing service, opened by John Roe.
pub fn user_request(id: &str, start: DateTime<Utc>) -> Ticket {
    let mut ticket = Ticket::new(id, format!("R-{:0>6}", id), "UserRequest");
    ticket.title = format!("Request {id}");
    ticket.status = "new".to_string();
    ticket.priority = "3".to_string();
    ticket.service_name = "Printing".to_string();
    ticket.caller = "John Roe".to_string();
    ticket.start_date = Some(start);
    ticket
}

pub fn hours(h: u64) -> Option<Duration> {
    Some(Duration::from_secs(h * 3_600))
}
