//! CLI definitions.

pub mod commands;
pub mod positions;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "trading-guard")]
#[command(
    author,
    version,
    about = "Position risk monitoring and automatic stop-loss / take-profit execution"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level (overrides the config file)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Monitor positions against the configured venue and serve the API
    Run(RunArgs),
    /// Replay a CSV tick file through the paper bridge
    Replay(ReplayArgs),
    /// List built-in risk profiles
    Profiles,
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Positions to monitor from startup (JSON array)
    #[arg(short, long)]
    pub positions: Option<PathBuf>,

    /// API bind address (overrides the config file)
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(clap::Args)]
pub struct ReplayArgs {
    /// Tick file (CSV: timestamp,symbol,price)
    #[arg(short, long)]
    pub ticks: PathBuf,

    /// Positions to open before replay (JSON array)
    #[arg(short, long)]
    pub positions: PathBuf,

    /// Portfolio value used for pre-trade limit checks
    #[arg(long, default_value = "100000")]
    pub portfolio_value: f64,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,

    /// Export the trade log to a CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,
}
