//! Position risk monitor CLI.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use trading_config::load_config;
use trading_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes up before config errors are reported so they can be logged
    let config = load_config(&cli.config);
    let logging = config.as_ref().map(|c| c.logging.clone()).unwrap_or_default();
    let level = cli
        .log_level
        .map_or(logging.level.as_str(), |l| l.as_str());
    let _log_guard = setup_logging(
        level,
        cli.json_logs || logging.is_json(),
        logging.file.as_deref().map(Path::new),
    );

    match cli.command {
        Commands::Run(args) => {
            let config = config
                .with_context(|| format!("failed to load config {}", cli.config.display()))?;
            cli::commands::run::run(args, config).await
        }
        Commands::Replay(args) => {
            let config = config
                .with_context(|| format!("failed to load config {}", cli.config.display()))?;
            cli::commands::replay::run(args, config).await
        }
        Commands::Profiles => cli::commands::profiles::run(),
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config, config),
    }
}
