//! Configuration loading for sla-sync.
//!
//! Layered config: defaults -> config file -> env vars -> legacy env vars -> CLI flags.
//! The config file lives at ~/.config/sla-sync/config.toml.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Sync cycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Delay between reconciliation cycles (ms)
    #[serde(default = "default_sync_interval_ms")]
    pub interval_ms: u64,

    /// Delay between holiday file refreshes (ms)
    #[serde(default = "default_holiday_refresh_ms")]
    pub holiday_refresh_ms: u64,

    /// Maximum tickets enriched concurrently within one cycle
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,

    /// Compute the reconciliation plan but issue no sink writes
    #[serde(default)]
    pub dry_run: bool,
}

fn default_sync_interval_ms() -> u64 {
    3_000
}

fn default_holiday_refresh_ms() -> u64 {
    10_000
}

fn default_enrich_concurrency() -> usize {
    4
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_sync_interval_ms(),
            holiday_refresh_ms: default_holiday_refresh_ms(),
            enrich_concurrency: default_enrich_concurrency(),
            dry_run: false,
        }
    }
}

impl SyncSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn holiday_refresh(&self) -> Duration {
        Duration::from_millis(self.holiday_refresh_ms)
    }
}

/// Ticketing system (iTop REST) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItopSettings {
    /// REST endpoint URL (e.g. https://itop.example.com/webservices/rest.php)
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    /// Password (loaded from env var, not stored in config file)
    #[serde(default)]
    pub password: Option<String>,

    /// REST API version sent with every call
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Minimum delay between person lookups (ms)
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_version() -> String {
    "1.3".to_string()
}

fn default_rate_limit_ms() -> u64 {
    200
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for ItopSettings {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            password: None,
            api_version: default_api_version(),
            rate_limit_ms: default_rate_limit_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl ItopSettings {
    /// True when URL, user and password are all present and non-empty.
    pub fn has_credentials(&self) -> bool {
        [&self.url, &self.user, &self.password]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

/// Search index (Elasticsearch) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticSettings {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub index: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Maximum documents read per snapshot
    #[serde(default = "default_snapshot_size")]
    pub snapshot_size: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_snapshot_size() -> usize {
    10_000
}

impl Default for ElasticSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            index: String::new(),
            user: None,
            password: None,
            snapshot_size: default_snapshot_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// IANA timezone all calendar arithmetic happens in
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Ticket classes fetched every cycle
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,

    /// Start of the business-hour window (HH:MM)
    #[serde(default = "default_work_start")]
    pub work_start: String,

    /// End of the business-hour window (HH:MM)
    #[serde(default = "default_work_end")]
    pub work_end: String,

    /// Holiday file, one ISO date per line
    #[serde(default = "default_holidays_path")]
    pub holidays_path: String,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub itop: ItopSettings,

    #[serde(default)]
    pub elastic: ElasticSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_classes() -> Vec<String> {
    vec!["Incident".to_string(), "UserRequest".to_string()]
}

fn default_work_start() -> String {
    "08:00".to_string()
}

fn default_work_end() -> String {
    "17:00".to_string()
}

fn default_holidays_path() -> String {
    "holidays.txt".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            timezone: default_timezone(),
            classes: default_classes(),
            work_start: default_work_start(),
            work_end: default_work_end(),
            holidays_path: default_holidays_path(),
            sync: SyncSettings::default(),
            itop: ItopSettings::default(),
            elastic: ElasticSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/sla-sync/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (SLA_*, `__` between nested keys)
    /// 5. Legacy flat environment variables (ELASTIC_URL, ITOP_API_URL, ...)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, SyncError> {
        let config_dir = ProjectDirs::from("", "", "sla-sync")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            // 1. Built-in defaults (the rest come from serde defaults)
            .set_default("log_level", default_log_level())
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("timezone", default_timezone())
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("work_start", default_work_start())
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("work_end", default_work_end())
            .map_err(|e| SyncError::Config(e.to_string()))?
            // 2. Default config file
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        // 3. CLI-specified config file (higher precedence than default)
        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // 4. Environment variables, e.g. SLA_ELASTIC__URL, SLA_SYNC__INTERVAL_MS
        builder = builder.add_source(
            Environment::with_prefix("SLA")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("classes")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        let mut settings: Settings = config
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        // 5. Variables understood by earlier deployments
        settings.apply_legacy_vars(|key| std::env::var(key).ok())?;

        Ok(settings)
    }

    /// Overlay the flat, unprefixed variable names of older deployments.
    ///
    /// `lookup` returns the value of a variable, if set. Empty values are
    /// ignored.
    pub fn apply_legacy_vars<F>(&mut self, lookup: F) -> Result<(), SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ELASTIC_URL") {
            self.elastic.url = v;
        }
        if let Some(v) = get("ELASTIC_INDEX") {
            self.elastic.index = v;
        }
        if let Some(v) = get("ELASTIC_USER") {
            self.elastic.user = Some(v);
        }
        if let Some(v) = get("ELASTIC_PWD") {
            self.elastic.password = Some(v);
        }
        if let Some(v) = get("ITOP_API_URL") {
            self.itop.url = Some(v);
        }
        if let Some(v) = get("ITOP_API_USER") {
            self.itop.user = Some(v);
        }
        if let Some(v) = get("ITOP_API_PWD") {
            self.itop.password = Some(v);
        }
        if let Some(v) = get("ITOP_API_RATE_LIMIT_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.itop.rate_limit_ms = ms,
                _ => {
                    return Err(SyncError::Config(format!(
                        "ITOP_API_RATE_LIMIT_MS must be a positive integer, got '{}'",
                        v
                    )))
                }
            }
        }
        if let Some(v) = get("WORK_START") {
            self.work_start = v;
        }
        if let Some(v) = get("WORK_END") {
            self.work_end = v;
        }
        if let Some(v) = get("TIMEZONE") {
            self.timezone = v;
        }
        if let Some(v) = get("SYNC_INTERVAL") {
            self.sync.interval_ms = parse_interval(&v)?.as_millis() as u64;
        }
        if get("DEBUG").as_deref() == Some("true") {
            self.log_level = "debug".to_string();
        }
        Ok(())
    }

    /// Check the settings a running daemon cannot do without.
    ///
    /// Missing ticketing-system credentials are NOT an error here: fetches
    /// then fail per class and the sink is left untouched.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.elastic.url.trim().is_empty() || self.elastic.index.trim().is_empty() {
            return Err(SyncError::Config(
                "elastic.url and elastic.index are required".to_string(),
            ));
        }
        self.parse_timezone()?;
        let (start, end) = self.work_window_times()?;
        if start >= end {
            return Err(SyncError::Config(format!(
                "work_start ({}) must be before work_end ({})",
                self.work_start, self.work_end
            )));
        }
        if self.classes.is_empty() {
            return Err(SyncError::Config("classes must not be empty".to_string()));
        }
        if self.sync.interval_ms == 0 || self.sync.holiday_refresh_ms == 0 {
            return Err(SyncError::Config("sync intervals must be > 0".to_string()));
        }
        if self.sync.enrich_concurrency == 0 {
            return Err(SyncError::Config(
                "sync.enrich_concurrency must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse the configured timezone into a chrono_tz::Tz.
    pub fn parse_timezone(&self) -> Result<chrono_tz::Tz, SyncError> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| SyncError::Config(format!("Invalid timezone: {}", self.timezone)))
    }

    /// Parse the business-hour window bounds.
    pub fn work_window_times(&self) -> Result<(NaiveTime, NaiveTime), SyncError> {
        Ok((
            parse_time_of_day(&self.work_start)?,
            parse_time_of_day(&self.work_end)?,
        ))
    }

    /// Holiday file path with ~ expanded.
    pub fn expanded_holidays_path(&self) -> PathBuf {
        if let Some(rest) = self.holidays_path.strip_prefix("~/") {
            if let Some(base) = directories::BaseDirs::new() {
                return base.home_dir().join(rest);
            }
        }
        PathBuf::from(&self.holidays_path)
    }
}

/// Parse an `HH:MM` (or `HH:MM:SS`) time of day.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, SyncError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| SyncError::Config(format!("Invalid time of day '{}', expected HH:MM", s)))
}

/// Parse a Go-style interval such as `3s`, `500ms`, `2m` or `1h`.
pub fn parse_interval(s: &str) -> Result<Duration, SyncError> {
    let s = s.trim();
    let invalid = || SyncError::Config(format!("Invalid interval '{}'", s));

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (number, unit) = s.split_at(split);
    let n: u64 = number.parse().map_err(|_| invalid())?;

    let duration = match unit {
        "ms" => Duration::from_millis(n),
        "s" => Duration::from_secs(n),
        "m" => Duration::from_secs(n * 60),
        "h" => Duration::from_secs(n * 3600),
        _ => return Err(invalid()),
    };
    if duration.is_zero() {
        return Err(invalid());
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.elastic.url = "http://localhost:9200".to_string();
        settings.elastic.index = "tickets".to_string();
        settings
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.timezone, "UTC");
        assert_eq!(settings.work_start, "08:00");
        assert_eq!(settings.work_end, "17:00");
        assert_eq!(settings.classes, vec!["Incident", "UserRequest"]);
        assert_eq!(settings.sync.interval(), Duration::from_secs(3));
        assert_eq!(settings.sync.holiday_refresh(), Duration::from_secs(10));
        assert_eq!(settings.itop.rate_limit_ms, 200);
        assert_eq!(settings.itop.api_version, "1.3");
        assert_eq!(settings.elastic.snapshot_size, 10_000);
    }

    #[test]
    fn test_validate_requires_sink() {
        let settings = Settings::default();
        assert!(matches!(settings.validate(), Err(SyncError::Config(_))));
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let mut settings = valid_settings();
        settings.work_start = "18:00".to_string();
        assert!(settings.validate().is_err());

        settings.work_start = "8am".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_timezone() {
        let mut settings = valid_settings();
        settings.timezone = "Mars/Olympus".to_string();
        assert!(settings.validate().is_err());

        settings.timezone = "Asia/Jakarta".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_itop_credentials_are_not_fatal() {
        let settings = valid_settings();
        assert!(!settings.itop.has_credentials());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_apply_legacy_vars() {
        let vars: HashMap<&str, &str> = [
            ("ELASTIC_URL", "http://es:9200"),
            ("ELASTIC_INDEX", "itop"),
            ("ITOP_API_URL", "http://itop/webservices/rest.php"),
            ("ITOP_API_USER", "svc"),
            ("ITOP_API_PWD", "secret"),
            ("ITOP_API_RATE_LIMIT_MS", "500"),
            ("WORK_START", "09:00"),
            ("TIMEZONE", "Asia/Jakarta"),
            ("SYNC_INTERVAL", "30s"),
            ("DEBUG", "true"),
            ("WORK_END", ""),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings
            .apply_legacy_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.elastic.url, "http://es:9200");
        assert_eq!(settings.elastic.index, "itop");
        assert!(settings.itop.has_credentials());
        assert_eq!(settings.itop.rate_limit_ms, 500);
        assert_eq!(settings.work_start, "09:00");
        assert_eq!(settings.work_end, "17:00");
        assert_eq!(settings.timezone, "Asia/Jakarta");
        assert_eq!(settings.sync.interval_ms, 30_000);
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_apply_legacy_vars_rejects_bad_rate_limit() {
        let mut settings = Settings::default();
        let result = settings.apply_legacy_vars(|k| {
            (k == "ITOP_API_RATE_LIMIT_MS").then(|| "fast".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_interval("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_interval("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_interval("1h").unwrap(), Duration::from_secs(3600));
        assert!(parse_interval("0s").is_err());
        assert!(parse_interval("3").is_err());
        assert!(parse_interval("s").is_err());
        assert!(parse_interval("3d").is_err());
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("08:00").unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time_of_day("23:59").unwrap(),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap()
        );
        assert!(parse_time_of_day("25:00").is_err());
    }

    #[test]
    fn test_settings_serialization() {
        let settings = valid_settings();
        let json = serde_json::to_string(&settings).unwrap();
        let decoded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.elastic.index, "tickets");
        assert_eq!(decoded.sync.enrich_concurrency, 4);
    }

    #[test]
    fn test_sparse_settings_fill_defaults() {
        let decoded: Settings = serde_json::from_str(r#"{"elastic":{"url":"u","index":"i"}}"#).unwrap();
        assert_eq!(decoded.elastic.snapshot_size, 10_000);
        assert_eq!(decoded.classes.len(), 2);
    }
}
