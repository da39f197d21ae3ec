//! CLI command implementations.

pub mod profiles;
pub mod replay;
pub mod run;
pub mod validate;

use trading_config::AppConfig;
use trading_monitor::{MonitorConfig, RetryPolicy};

/// Monitor timing from the loaded configuration.
pub fn monitor_config(config: &AppConfig) -> MonitorConfig {
    let monitor = &config.monitor;
    MonitorConfig {
        cycle_period: monitor.cycle_period(),
        price_timeout: monitor.price_timeout(),
        execution_timeout: monitor.execution_timeout(),
        retry: RetryPolicy::new(
            monitor.retry.max_attempts,
            std::time::Duration::from_millis(monitor.retry.base_delay_ms),
            std::time::Duration::from_millis(monitor.retry.max_delay_ms),
        ),
    }
}
