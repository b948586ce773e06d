//! Ticket to indexed-record projection.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use futures::stream::{self, StreamExt};
use sla_calendar::{BusinessCalendar, Durations, HolidaySet};
use sla_types::{ComplianceVerdict, IndexedTicket, Ticket, ThresholdKey};

use crate::compliance::{evaluate, evaluate_raw};
use crate::teams::PersonTeamResolver;
use crate::threshold::ThresholdCache;

/// Label for a priority or urgency code.
pub fn priority_label(code: &str) -> String {
    match code {
        "1" => "Critical",
        "2" => "High",
        "3" => "Medium",
        "4" => "Low",
        other => other,
    }
    .to_string()
}

/// Label for an impact code.
pub fn impact_label(code: &str) -> String {
    match code {
        "1" => "A department",
        "2" => "A service",
        "3" => "A person",
        other => other,
    }
    .to_string()
}

/// Verdicts for one SLA dimension in all three modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionVerdicts {
    pub raw: ComplianceVerdict,
    pub business: ComplianceVerdict,
    pub full_day: ComplianceVerdict,
}

impl DimensionVerdicts {
    pub fn evaluate(durations: &Durations, threshold: Option<Duration>) -> Self {
        Self {
            raw: evaluate_raw(Some(durations.raw), threshold),
            business: evaluate(Some(durations.business), Some(durations.raw), threshold),
            full_day: evaluate(Some(durations.full_day), Some(durations.raw), threshold),
        }
    }
}

/// Builds [`IndexedTicket`]s from fetched tickets.
pub struct TicketMapper {
    calendar: BusinessCalendar,
    thresholds: Arc<ThresholdCache>,
    teams: Arc<PersonTeamResolver>,
}

impl TicketMapper {
    pub fn new(
        calendar: BusinessCalendar,
        thresholds: Arc<ThresholdCache>,
        teams: Arc<PersonTeamResolver>,
    ) -> Self {
        Self {
            calendar,
            thresholds,
            teams,
        }
    }

    fn localize(&self, instant: Option<DateTime<Utc>>) -> Option<DateTime<FixedOffset>> {
        instant.map(|t| t.with_timezone(&self.calendar.timezone()).fixed_offset())
    }

    /// Project one ticket, computing all durations and verdicts.
    pub async fn map(&self, ticket: &Ticket, holidays: &HolidaySet) -> IndexedTicket {
        let key = ThresholdKey::new(&ticket.class, &ticket.priority, &ticket.service_name);
        let threshold = self.thresholds.lookup(&key).await;
        let caller_team = self.teams.resolve(&ticket.caller).await;

        let response =
            self.calendar
                .durations(ticket.start_date, ticket.assignment_date, holidays);
        let resolution =
            self.calendar
                .durations(ticket.start_date, ticket.resolution_date, holidays);

        let response_verdicts = DimensionVerdicts::evaluate(&response, threshold.response);
        let resolution_verdicts = DimensionVerdicts::evaluate(&resolution, threshold.resolution);

        IndexedTicket {
            id: ticket.id.clone(),
            reference: ticket.reference.clone(),
            class: ticket.class.clone(),
            title: ticket.title.clone(),
            status: ticket.status.clone(),
            priority: priority_label(&ticket.priority),
            urgency: priority_label(&ticket.urgency),
            impact: impact_label(&ticket.impact),
            service_id: ticket.service_id.clone(),
            service_name: ticket.service_name.clone(),
            service_subcategory_name: ticket.service_subcategory.clone(),
            agent_id: ticket.agent_id.clone(),
            agent: ticket.agent.clone(),
            team_id: ticket.team_id.clone(),
            team: ticket.team.clone(),
            caller: ticket.caller.clone(),
            caller_team,
            origin: ticket.origin.clone(),

            start_date: self.localize(ticket.start_date),
            assignment_date: self.localize(ticket.assignment_date),
            resolution_date: self.localize(ticket.resolution_date),

            time_to_response_raw: response.raw.as_secs_f64(),
            time_to_resolve_raw: resolution.raw.as_secs_f64(),
            sla_compliance_response_raw: response_verdicts.raw,
            sla_compliance_resolve_raw: resolution_verdicts.raw,

            time_to_response_business_hr: response.business.as_secs_f64(),
            time_to_resolve_business_hr: resolution.business.as_secs_f64(),
            sla_compliance_response_business_hr: response_verdicts.business,
            sla_compliance_resolve_business_hr: resolution_verdicts.business,

            time_to_response_24bh: response.full_day.as_secs_f64(),
            time_to_resolve_24bh: resolution.full_day.as_secs_f64(),
            sla_compliance_response_24bh: response_verdicts.full_day,
            sla_compliance_resolve_24bh: resolution_verdicts.full_day,
        }
    }

    /// Project many tickets with at most `concurrency` in flight.
    ///
    /// Output order matches input order.
    pub async fn map_all(
        &self,
        tickets: &[Ticket],
        holidays: &HolidaySet,
        concurrency: usize,
    ) -> Vec<IndexedTicket> {
        let futures: Vec<_> = tickets
            .iter()
            .map(|ticket| self.map(ticket, holidays))
            .collect();
        stream::iter(futures)
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}
