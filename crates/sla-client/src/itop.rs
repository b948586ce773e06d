//! iTop REST client.
//!
//! Every call is a form POST of `auth_user`, `auth_pwd` and `json_data` to
//! the REST endpoint. Only the `core/get` operation is used.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use sla_calendar::{CalendarError, HolidaySource};
use sla_enrich::{escape_filter_value, EnrichError, TeamSource, ThresholdSource};
use sla_indexing::{IndexingError, TicketSource};
use sla_types::{Settings, SlaThreshold, ThresholdKey, Ticket};

use crate::error::ClientError;
use crate::retry::RetryPolicy;

/// Fields requested for every ticket.
pub const TICKET_FIELDS: &str = "id,ref,title,origin,status,priority,urgency,impact,service_id,\
service_name,servicesubcategory_name,agent_id,agent_id_friendlyname,team_id,team_id_friendlyname,\
caller_id_friendlyname,start_date,assignment_date,resolution_date";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Configuration for [`ItopClient`].
#[derive(Debug, Clone)]
pub struct ItopConfig {
    /// REST endpoint (e.g. "https://itop.example.com/webservices/rest.php")
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub api_version: String,
    /// Zone the server's wall-clock dates are in
    pub timezone: Tz,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ItopConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            password: None,
            api_version: "1.3".to_string(),
            timezone: Tz::UTC,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl ItopConfig {
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: Some(url.into()),
            user: Some(user.into()),
            password: Some(SecretString::from(password.into())),
            ..Default::default()
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
        let itop = &settings.itop;
        Ok(Self {
            url: itop.url.clone().filter(|s| !s.is_empty()),
            user: itop.user.clone().filter(|s| !s.is_empty()),
            password: itop
                .password
                .clone()
                .filter(|s| !s.is_empty())
                .map(SecretString::from),
            api_version: itop.api_version.clone(),
            timezone: settings
                .parse_timezone()
                .map_err(|e| ClientError::Config(e.to_string()))?,
            timeout: Duration::from_secs(itop.timeout_secs),
            retry: RetryPolicy::default().with_max_attempts(itop.max_retries),
        })
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.timezone = tz;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    objects: Option<Map<String, Value>>,
}

/// Client for the iTop REST/JSON API.
pub struct ItopClient {
    client: Client,
    config: ItopConfig,
}

impl ItopClient {
    pub fn new(config: ItopConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    fn credentials(&self) -> Result<(&str, &str, &SecretString), ClientError> {
        match (&self.config.url, &self.config.user, &self.config.password) {
            (Some(url), Some(user), Some(password)) => {
                Ok((url.as_str(), user.as_str(), password))
            }
            _ => Err(ClientError::NotConfigured(
                "iTop URL, user and password are required".to_string(),
            )),
        }
    }

    /// Run `core/get` and return the `fields` of every object, in key order.
    pub async fn core_get(
        &self,
        class: &str,
        key: &str,
        output_fields: &str,
    ) -> Result<Vec<Map<String, Value>>, ClientError> {
        let (url, user, password) = self.credentials()?;
        let json_data = serde_json::json!({
            "operation": "core/get",
            "class": class,
            "key": key,
            "output_fields": output_fields,
        })
        .to_string();

        let body = self
            .config
            .retry
            .run("core/get", || self.post(url, user, password, &json_data))
            .await?;
        parse_objects(&body)
    }

    async fn post(
        &self,
        url: &str,
        user: &str,
        password: &SecretString,
        json_data: &str,
    ) -> Result<String, ClientError> {
        let response = self
            .client
            .post(url)
            .query(&[("version", self.config.api_version.as_str())])
            .form(&[
                ("auth_user", user),
                ("auth_pwd", password.expose_secret()),
                ("json_data", json_data),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Fetch every ticket of `class`, stamping the class onto each.
    pub async fn fetch_tickets(&self, class: &str) -> Result<Vec<Ticket>, ClientError> {
        let objects = self
            .core_get(class, &format!("SELECT {class}"), TICKET_FIELDS)
            .await?;
        let tickets: Vec<Ticket> = objects
            .iter()
            .map(|fields| ticket_from_fields(fields, class, self.config.timezone))
            .collect();
        debug!(class = %class, count = tickets.len(), "Parsed tickets");
        Ok(tickets)
    }

    /// Team names of every person whose display name matches.
    pub async fn fetch_person_teams(&self, escaped_name: &str) -> Result<Vec<String>, ClientError> {
        let objects = self
            .core_get(
                "Person",
                &format!("SELECT Person WHERE friendlyname=\"{escaped_name}\""),
                "friendlyname,team_list",
            )
            .await?;
        Ok(objects.iter().flat_map(team_names).collect())
    }

    /// SLA deadlines for a (class, priority, service).
    pub async fn fetch_slt(&self, key: &ThresholdKey) -> Result<Option<SlaThreshold>, ClientError> {
        let objects = self
            .core_get("SLT", &slt_query(key), "metric,value,unit")
            .await?;
        if objects.is_empty() {
            return Ok(None);
        }
        threshold_from_objects(&objects).map(Some)
    }

    pub async fn fetch_holiday_dates(&self) -> Result<Vec<NaiveDate>, ClientError> {
        let objects = self.core_get("Holiday", "SELECT Holiday", "date").await?;
        let mut dates = Vec::with_capacity(objects.len());
        for fields in &objects {
            let raw = field_str(fields, "date");
            match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
                Ok(date) => dates.push(date),
                Err(e) => warn!(value = %raw, error = %e, "Skipping invalid holiday date"),
            }
        }
        Ok(dates)
    }
}

/// Request type the SLT is scoped to for a ticket class.
pub fn request_type(class: &str) -> &'static str {
    if class == "Incident" {
        "incident"
    } else {
        "service_request"
    }
}

fn slt_query(key: &ThresholdKey) -> String {
    format!(
        "SELECT SLT AS slt \
         JOIN lnkSLAToSLT AS l1 ON l1.slt_id = slt.id \
         JOIN SLA AS sla ON l1.sla_id = sla.id \
         JOIN lnkCustomerContractToService AS l2 ON l2.sla_id = sla.id \
         JOIN Service AS s ON l2.service_id = s.id \
         WHERE s.name = \"{}\" AND slt.priority = \"{}\" AND slt.request_type = \"{}\"",
        escape_filter_value(&key.service),
        escape_filter_value(&key.priority),
        request_type(&key.class)
    )
}

fn parse_objects(body: &str) -> Result<Vec<Map<String, Value>>, ClientError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| ClientError::Parse(e.to_string()))?;
    if envelope.code != 0 {
        return Err(ClientError::Api {
            code: envelope.code,
            message: envelope.message.unwrap_or_default(),
        });
    }

    let mut out = Vec::new();
    for (key, object) in envelope.objects.unwrap_or_default() {
        match object.get("fields") {
            Some(Value::Object(fields)) => out.push(fields.clone()),
            _ => return Err(ClientError::Parse(format!("object {key} has no fields"))),
        }
    }
    Ok(out)
}

/// String value of a field; numbers are stringified, null is empty.
fn field_str(fields: &Map<String, Value>, name: &str) -> String {
    match fields.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Parse a server wall-clock date. Empty or malformed values are absent.
pub fn parse_itop_datetime(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        Ok(naive) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
        Err(e) => {
            warn!(value = %raw, error = %e, "Ignoring malformed date");
            None
        }
    }
}

fn ticket_from_fields(fields: &Map<String, Value>, class: &str, tz: Tz) -> Ticket {
    Ticket {
        id: field_str(fields, "id"),
        reference: field_str(fields, "ref"),
        class: class.to_string(),
        title: field_str(fields, "title"),
        status: field_str(fields, "status"),
        priority: field_str(fields, "priority"),
        urgency: field_str(fields, "urgency"),
        impact: field_str(fields, "impact"),
        service_id: field_str(fields, "service_id"),
        service_name: field_str(fields, "service_name"),
        service_subcategory: field_str(fields, "servicesubcategory_name"),
        agent_id: field_str(fields, "agent_id"),
        agent: field_str(fields, "agent_id_friendlyname"),
        team_id: field_str(fields, "team_id"),
        team: field_str(fields, "team_id_friendlyname"),
        caller: field_str(fields, "caller_id_friendlyname"),
        origin: field_str(fields, "origin"),
        start_date: parse_itop_datetime(&field_str(fields, "start_date"), tz),
        assignment_date: parse_itop_datetime(&field_str(fields, "assignment_date"), tz),
        resolution_date: parse_itop_datetime(&field_str(fields, "resolution_date"), tz),
    }
}

fn team_names(fields: &Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(teams)) = fields.get("team_list") else {
        return Vec::new();
    };
    teams
        .iter()
        .filter_map(|team| team.as_object())
        .map(|team| {
            let name = field_str(team, "team_name");
            if name.is_empty() {
                field_str(team, "team_id_friendlyname")
            } else {
                name
            }
        })
        .filter(|name| !name.is_empty())
        .collect()
}

fn unit_seconds(unit: &str) -> Option<u64> {
    match unit {
        "minutes" => Some(60),
        "hours" => Some(3600),
        "days" => Some(86400),
        _ => None,
    }
}

/// Fold SLT objects into one threshold, keeping the strictest deadline
/// per metric.
fn threshold_from_objects(objects: &[Map<String, Value>]) -> Result<SlaThreshold, ClientError> {
    let mut response: Option<Duration> = None;
    let mut resolution: Option<Duration> = None;

    for fields in objects {
        let metric = field_str(fields, "metric");
        let unit = field_str(fields, "unit");
        let raw_value = field_str(fields, "value");
        let value: u64 = raw_value
            .trim()
            .parse()
            .map_err(|_| ClientError::Parse(format!("SLT value '{raw_value}' is not a number")))?;
        let scale = unit_seconds(&unit)
            .ok_or_else(|| ClientError::Parse(format!("unknown SLT unit '{unit}'")))?;
        let seconds = value.checked_mul(scale).ok_or_else(|| {
            ClientError::Parse(format!("SLT value '{raw_value} {unit}' is out of range"))
        })?;
        let deadline = Duration::from_secs(seconds);

        let slot = match metric.as_str() {
            "tto" => &mut response,
            "ttr" => &mut resolution,
            other => {
                debug!(metric = %other, "Ignoring SLT metric");
                continue;
            }
        };
        *slot = Some(slot.map_or(deadline, |d| d.min(deadline)));
    }

    Ok(SlaThreshold::new(response, resolution))
}

#[async_trait]
impl TicketSource for ItopClient {
    async fn fetch_by_class(&self, class: &str) -> Result<Vec<Ticket>, IndexingError> {
        self.fetch_tickets(class)
            .await
            .map_err(ClientError::into_source_error)
    }
}

#[async_trait]
impl TeamSource for ItopClient {
    async fn fetch_teams(&self, escaped_name: &str) -> Result<Vec<String>, EnrichError> {
        Ok(self.fetch_person_teams(escaped_name).await?)
    }
}

#[async_trait]
impl ThresholdSource for ItopClient {
    async fn fetch_threshold(&self, key: &ThresholdKey) -> Result<Option<SlaThreshold>, EnrichError> {
        Ok(self.fetch_slt(key).await?)
    }
}

#[async_trait]
impl HolidaySource for ItopClient {
    async fn fetch_holidays(&self) -> Result<Vec<NaiveDate>, CalendarError> {
        Ok(self.fetch_holiday_dates().await?)
    }
}
