//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "scalepos", version, about = "Self-service weighing station")]
pub struct Cli {
    /// Path to config TOML (built-in defaults when omitted)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Optional pricing CSV (strict header `label,price_per_kg`), overrides [pricing]
    #[arg(long, value_name = "FILE")]
    pub pricing: Option<PathBuf>,

    /// Log and print as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the station until `q` or Ctrl-C
    Run {
        /// Stop after this many ticks (mainly for scripted runs)
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
        /// Override classifier.endpoint
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
    },
    /// Validate config and pricing, then exit
    SelfCheck,
    /// Price a label at a weight using the configured table
    Price {
        #[arg(long)]
        label: String,
        #[arg(long)]
        grams: f64,
    },
}
