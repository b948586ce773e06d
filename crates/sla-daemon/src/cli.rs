//! CLI argument parsing for the sla-sync daemon.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// SLA sync daemon
///
/// Mirrors tickets from iTop into Elasticsearch with SLA durations and
/// compliance verdicts.
#[derive(Parser, Debug)]
#[command(name = "sla-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/sla-sync/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run sync and holiday refresh on their intervals until Ctrl+C or SIGTERM
    Start,

    /// Run a single sync cycle and print what it did
    Once {
        /// Plan writes without sending them to the index
        #[arg(long)]
        dry_run: bool,
    },

    /// Print raw, business-hour and 24-hour durations between two instants
    Duration {
        /// Start, local to the configured timezone (YYYY-MM-DD HH:MM[:SS])
        #[arg(long)]
        start: String,

        /// End, local to the configured timezone (YYYY-MM-DD HH:MM[:SS])
        #[arg(long)]
        end: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_start() {
        let cli = Cli::parse_from(["sla-sync", "start"]);
        assert!(matches!(cli.command, Commands::Start));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "sla-sync",
            "start",
            "--config",
            "/etc/sla-sync.toml",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.config.as_deref(), Some("/etc/sla-sync.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_once() {
        let cli = Cli::parse_from(["sla-sync", "once"]);
        assert!(matches!(cli.command, Commands::Once { dry_run: false }));

        let cli = Cli::parse_from(["sla-sync", "once", "--dry-run"]);
        assert!(matches!(cli.command, Commands::Once { dry_run: true }));
    }

    #[test]
    fn test_cli_duration() {
        let cli = Cli::parse_from([
            "sla-sync",
            "duration",
            "--start",
            "2024-03-01 16:00",
            "--end",
            "2024-03-04 09:00",
        ]);
        match cli.command {
            Commands::Duration { start, end } => {
                assert_eq!(start, "2024-03-01 16:00");
                assert_eq!(end, "2024-03-04 09:00");
            }
            _ => panic!("Expected Duration command"),
        }
    }

    #[test]
    fn test_cli_duration_requires_both_ends() {
        let result = Cli::try_parse_from(["sla-sync", "duration", "--start", "2024-03-01 16:00"]);
        assert!(result.is_err());
    }
}
