//! SLA sync daemon
//!
//! # Usage
//!
//! ```bash
//! sla-sync start
//! sla-sync once [--dry-run]
//! sla-sync duration --start "2024-03-01 16:00" --end "2024-03-04 09:00"
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/sla-sync/config.toml)
//! 3. `--config` file
//! 4. Environment variables (SLA_*, then ELASTIC_URL, ITOP_API_URL, ...)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use sla_daemon::{run_once, show_durations, start_daemon, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            start_daemon(cli.config.as_deref(), cli.log_level.as_deref()).await?;
        }
        Commands::Once { dry_run } => {
            run_once(cli.config.as_deref(), cli.log_level.as_deref(), dry_run).await?;
        }
        Commands::Duration { start, end } => {
            show_durations(
                cli.config.as_deref(),
                cli.log_level.as_deref(),
                &start,
                &end,
            )?;
        }
    }

    Ok(())
}
