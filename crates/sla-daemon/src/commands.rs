//! Command implementations.
//!
//! Handles:
//! - Loading configuration (`.env`, files, environment, CLI flags)
//! - Wiring the iTop client, Elasticsearch sink and sync pipeline
//! - Running the scheduler until Ctrl+C / SIGTERM

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tokio::signal;
use tracing::{info, warn};

use sla_calendar::{BusinessCalendar, Durations, HolidaySet, HolidaySource};
use sla_client::{ElasticConfig, ElasticSink, ItopClient, ItopConfig};
use sla_enrich::{IntervalGate, PersonTeamResolver, ThresholdCache, TicketMapper};
use sla_indexing::{CycleResult, PipelineConfig, SyncPipeline};
use sla_scheduler::{
    create_holiday_refresh_job, create_sync_job, SchedulerConfig, SchedulerService,
};
use sla_types::Settings;

/// Load `.env`, then layered settings, then CLI overrides.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    // A missing .env is normal outside development.
    dotenvy::dotenv().ok();

    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Everything a sync cycle needs, built from settings.
pub struct Components {
    pub itop: Arc<ItopClient>,
    pub pipeline: Arc<SyncPipeline>,
}

/// Build the source, sink, caches and pipeline.
pub fn build_components(settings: &Settings) -> Result<Components> {
    let itop = ItopClient::new(ItopConfig::from_settings(settings)?)
        .context("Failed to create iTop client")?;
    let itop = Arc::new(itop);
    if !itop.is_configured() {
        warn!("iTop URL or credentials missing; every class fetch will fail and the index is left untouched");
    }

    let sink = ElasticSink::new(ElasticConfig::from_settings(settings))
        .context("Failed to create Elasticsearch sink")?;

    let gate = Arc::new(IntervalGate::new(Duration::from_millis(
        settings.itop.rate_limit_ms,
    )));
    let thresholds = Arc::new(ThresholdCache::new(itop.clone()));
    let teams = Arc::new(PersonTeamResolver::new(itop.clone(), gate));
    let calendar = BusinessCalendar::from_config(
        &settings.timezone,
        &settings.work_start,
        &settings.work_end,
    )
    .context("Invalid business calendar")?;
    let mapper = Arc::new(TicketMapper::new(calendar, thresholds, teams));

    let pipeline = SyncPipeline::new(
        itop.clone(),
        Arc::new(sink),
        mapper,
        PipelineConfig::from_settings(settings),
    );

    Ok(Components {
        itop,
        pipeline: Arc::new(pipeline),
    })
}

/// Run the daemon until a shutdown signal arrives.
///
/// 1. Load and validate configuration
/// 2. Register the sync and holiday refresh jobs
/// 3. Start the scheduler
/// 4. Shut down gracefully on SIGINT/SIGTERM
pub async fn start_daemon(config_path: Option<&str>, log_level: Option<&str>) -> Result<()> {
    let settings = load_settings(config_path, log_level)?;
    init_logging(&settings.log_level)?;
    settings.validate().context("Invalid configuration")?;

    info!("sla-sync starting...");
    info!("Configuration:");
    info!("  Index: {} at {}", settings.elastic.index, settings.elastic.url);
    info!("  Classes: {}", settings.classes.join(", "));
    info!("  Timezone: {}", settings.timezone);
    info!("  Work window: {}-{}", settings.work_start, settings.work_end);
    info!("  Sync interval: {}ms", settings.sync.interval_ms);

    let components = build_components(&settings)?;
    let scheduler_config = SchedulerConfig::from_settings(&settings);
    let mut scheduler = SchedulerService::new(scheduler_config.clone())
        .await
        .context("Failed to create scheduler")?;

    let holidays: Arc<dyn HolidaySource> = components.itop.clone();
    create_holiday_refresh_job(
        &scheduler,
        holidays,
        settings.expanded_holidays_path(),
        scheduler_config.holiday_refresh(),
    )
    .await
    .context("Failed to register holiday refresh job")?;
    create_sync_job(
        &scheduler,
        components.pipeline.clone(),
        scheduler_config.sync_interval(),
    )
    .await
    .context("Failed to register sync job")?;

    scheduler.start().await.context("Failed to start scheduler")?;

    shutdown_signal().await;

    scheduler
        .shutdown()
        .await
        .context("Failed to shut down scheduler")?;
    info!("sla-sync stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Run one sync cycle and print its outcome.
pub async fn run_once(
    config_path: Option<&str>,
    log_level: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level)?;
    init_logging(&settings.log_level)?;
    settings.sync.dry_run |= dry_run;
    settings.validate().context("Invalid configuration")?;

    let components = build_components(&settings)?;
    let result = components
        .pipeline
        .run_cycle()
        .await
        .context("Sync cycle failed")?;

    print!("{}", format_cycle(&result));
    if result.has_errors() {
        anyhow::bail!("Sync cycle completed with errors");
    }
    Ok(())
}

/// Human-readable cycle summary.
pub fn format_cycle(result: &CycleResult) -> String {
    let mut out = String::new();
    out.push_str(if result.dry_run {
        "Sync cycle (dry run)\n"
    } else {
        "Sync cycle\n"
    });
    for (class, count) in &result.fetched {
        out.push_str(&format!("  fetched {:<16} {}\n", class, count));
    }
    for class in &result.failed_classes {
        out.push_str(&format!("  failed  {}\n", class));
    }
    out.push_str(&format!("  unchanged: {}\n", result.unchanged));
    out.push_str(&format!("  retained:  {}\n", result.retained));
    out.push_str(&format!(
        "  upserts:   {} ok, {} skipped, {} failed\n",
        result.upserts.processed, result.upserts.skipped, result.upserts.errors
    ));
    out.push_str(&format!(
        "  deletes:   {} ok, {} skipped, {} failed\n",
        result.deletes.processed, result.deletes.skipped, result.deletes.errors
    ));
    out
}

/// Parse `YYYY-MM-DD HH:MM[:SS]`; a `T` separator is accepted too.
pub fn parse_local_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim().replacen('T', " ", 1);
    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M"))
        .with_context(|| format!("Invalid timestamp '{}', expected YYYY-MM-DD HH:MM[:SS]", s))
}

/// Compute durations between two local instants with the configured
/// window and holiday file.
pub fn compute_durations(settings: &Settings, start: &str, end: &str) -> Result<Durations> {
    let calendar = BusinessCalendar::from_config(
        &settings.timezone,
        &settings.work_start,
        &settings.work_end,
    )
    .context("Invalid business calendar")?;
    let holidays = HolidaySet::load(&settings.expanded_holidays_path())
        .context("Failed to read holiday file")?;

    let start = parse_local_timestamp(start)?;
    let end = parse_local_timestamp(end)?;
    Ok(calendar.durations_local(Some(start), Some(end), &holidays))
}

/// `1d 2h 3m 4s`-style rendering; zero renders as `0s`.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (days, rest) = (total / 86_400, total % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, seconds) = (rest / 60, rest % 60);

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{}s", seconds));
    }
    parts.join(" ")
}

pub fn show_durations(
    config_path: Option<&str>,
    log_level: Option<&str>,
    start: &str,
    end: &str,
) -> Result<()> {
    let settings = load_settings(config_path, log_level)?;
    let durations = compute_durations(&settings, start, end)?;

    println!("Timezone:     {}", settings.timezone);
    println!("Work window:  {}-{}", settings.work_start, settings.work_end);
    for (label, value) in [
        ("Raw", durations.raw),
        ("Business", durations.business),
        ("24 hours", durations.full_day),
    ] {
        println!(
            "{:<13} {} ({}s)",
            format!("{}:", label),
            format_duration(value),
            value.as_secs()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_local_timestamp() {
        let t = parse_local_timestamp("2024-03-04 09:30").unwrap();
        assert_eq!(t.to_string(), "2024-03-04 09:30:00");

        let t = parse_local_timestamp("2024-03-04T09:30:15").unwrap();
        assert_eq!(t.to_string(), "2024-03-04 09:30:15");

        assert!(parse_local_timestamp("04/03/2024 09:30").is_err());
        assert!(parse_local_timestamp("2024-03-04").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(7_200)), "2h");
        assert_eq!(format_duration(Duration::from_secs(65 * 3_600)), "2d 17h");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "1h 2m 5s");
    }

    #[test]
    fn test_compute_durations_over_weekend() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.holidays_path = dir.path().join("none.txt").display().to_string();

        // Friday 16:00 -> Monday 09:00 with the default 08:00-17:00 window
        let d = compute_durations(&settings, "2024-03-01 16:00", "2024-03-04 09:00").unwrap();
        assert_eq!(d.raw, Duration::from_secs(65 * 3_600));
        assert_eq!(d.business, Duration::from_secs(2 * 3_600));
    }

    #[test]
    fn test_compute_durations_uses_holiday_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("holidays.txt");
        std::fs::write(&path, "2024-03-04\n").unwrap();
        let mut settings = Settings::default();
        settings.holidays_path = path.display().to_string();

        let d = compute_durations(&settings, "2024-03-04 09:00", "2024-03-04 15:00").unwrap();
        assert_eq!(d.business, Duration::ZERO);
        assert_eq!(d.raw, Duration::from_secs(6 * 3_600));
    }

    #[test]
    fn test_compute_durations_rejects_bad_window() {
        let mut settings = Settings::default();
        settings.work_start = "18:00".to_string();
        assert!(compute_durations(&settings, "2024-03-04 09:00", "2024-03-04 15:00").is_err());
    }

    #[test]
    fn test_format_cycle() {
        let mut result = CycleResult {
            dry_run: true,
            unchanged: 3,
            ..Default::default()
        };
        result.fetched.insert("Incident".to_string(), 4);
        result.failed_classes.push("UserRequest".to_string());
        result.upserts.skipped = 1;

        let out = format_cycle(&result);
        assert!(out.starts_with("Sync cycle (dry run)"));
        assert!(out.contains("Incident"));
        assert!(out.contains("failed  UserRequest"));
        assert!(out.contains("unchanged: 3"));
        assert!(out.contains("1 skipped"));
    }

    #[test]
    fn test_build_components_without_itop_credentials() {
        let mut settings = Settings::default();
        settings.elastic.url = "http://localhost:9200".to_string();
        settings.elastic.index = "tickets".to_string();

        let components = build_components(&settings).unwrap();
        assert!(!components.itop.is_configured());
        assert_eq!(components.pipeline.config().classes, settings.classes);
    }
}
