//! Close execution results.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why a position is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseReason {
    TakeProfit,
    StopLoss,
    EmergencyStop,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::TakeProfit => write!(f, "TAKE_PROFIT"),
            CloseReason::StopLoss => write!(f, "STOP_LOSS"),
            CloseReason::EmergencyStop => write!(f, "EMERGENCY_STOP"),
        }
    }
}

/// A confirmed close reported by an execution bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseTrade {
    pub position_id: String,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    pub executed_at: DateTime<Utc>,
    /// Venue-side order id, when the venue reports one
    #[serde(default)]
    pub venue_order_id: Option<String>,
}
