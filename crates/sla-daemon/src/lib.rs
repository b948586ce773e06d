//! sla-sync daemon library exports.
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (start, once, duration)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{build_components, run_once, show_durations, start_daemon};
