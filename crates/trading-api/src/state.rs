use std::sync::Arc;
use trading_core::traits::TradeLog;
use trading_risk::RiskSettingsStore;

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<RiskSettingsStore>,
    pub trade_log: Arc<dyn TradeLog>,
}

impl AppState {
    pub fn new(settings: Arc<RiskSettingsStore>, trade_log: Arc<dyn TradeLog>) -> Self {
        Self {
            settings,
            trade_log,
        }
    }
}
