//! Configuration structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trading_risk::RiskSettings;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub venue: VenueSettings,
    #[serde(default)]
    pub api: ApiSettings,
    /// Seed for risk settings created on a user's first read
    #[serde(default)]
    pub risk_defaults: RiskSettings,
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "trading-guard".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Monitoring loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub cycle_period_ms: u64,
    pub price_timeout_ms: u64,
    pub execution_timeout_ms: u64,
    pub retry: RetrySettings,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            cycle_period_ms: 5000,
            price_timeout_ms: 2000,
            execution_timeout_ms: 10_000,
            retry: RetrySettings::default(),
        }
    }
}

impl MonitorSettings {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }

    pub fn price_timeout(&self) -> Duration {
        Duration::from_millis(self.price_timeout_ms)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }
}

/// Close retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

/// Where closes are executed and prices come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VenueMode {
    #[default]
    Paper,
    Http,
}

/// Execution venue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueSettings {
    pub mode: VenueMode,
    pub base_url: String,
    /// Environment variable holding the venue API key
    pub api_key_env: String,
    /// Paper fill slippage, in percent
    pub slippage_pct: Decimal,
}

impl Default for VenueSettings {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            mode: VenueMode::Paper,
            base_url: "http://127.0.0.1:9000".to_string(),
            api_key_env: "TRADING_VENUE_API_KEY".to_string(),
            slippage_pct: dec!(0.05),
        }
    }
}

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub bind: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}
