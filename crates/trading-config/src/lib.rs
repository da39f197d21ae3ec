//! Configuration management.

mod settings;

pub use settings::{
    ApiSettings, AppConfig, AppSettings, LoggingConfig, MonitorSettings, RetrySettings,
    VenueMode, VenueSettings,
};

pub use config::ConfigError;

use config::{Config, Environment, File};
use std::path::Path;

/// Load configuration from file and environment.
///
/// Environment variables use the `TRADING` prefix and `__` as the section
/// separator, e.g. `TRADING__MONITOR__CYCLE_PERIOD_MS=1000`.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("TRADING")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}
