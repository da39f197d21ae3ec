//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use trading_config::{AppConfig, ConfigError};

pub fn run(config_path: &Path, loaded: Result<AppConfig, ConfigError>) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    match loaded {
        Ok(config) => {
            let risk = &config.risk_defaults;
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            println!("Venue: {:?} at {}", config.venue.mode, config.venue.base_url);
            println!("API bind: {}", config.api.bind);
            println!("Cycle period: {}ms", config.monitor.cycle_period_ms);
            println!(
                "Close retries: {} attempts, {}ms..{}ms backoff",
                config.monitor.retry.max_attempts,
                config.monitor.retry.base_delay_ms,
                config.monitor.retry.max_delay_ms
            );
            println!(
                "Default SL/TP: {}% / {}%",
                risk.global_stop_loss_percent, risk.global_take_profit_percent
            );
            println!(
                "Emergency stop: {} at {}%",
                risk.enable_emergency_stop_loss, risk.emergency_stop_loss_threshold_percent
            );
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
