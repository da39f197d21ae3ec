//! Trigger decisions produced by the risk evaluator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CloseReason;

/// Outcome of evaluating one position against one price.
///
/// Each triggering variant carries the signed percent move that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerDecision {
    None,
    TakeProfit { move_percent: Decimal },
    StopLoss { move_percent: Decimal },
    EmergencyStop { move_percent: Decimal },
}

impl TriggerDecision {
    /// The close reason, or `None` when nothing triggered.
    pub fn close_reason(&self) -> Option<CloseReason> {
        match self {
            TriggerDecision::None => None,
            TriggerDecision::TakeProfit { .. } => Some(CloseReason::TakeProfit),
            TriggerDecision::StopLoss { .. } => Some(CloseReason::StopLoss),
            TriggerDecision::EmergencyStop { .. } => Some(CloseReason::EmergencyStop),
        }
    }

    pub fn move_percent(&self) -> Option<Decimal> {
        match self {
            TriggerDecision::None => None,
            TriggerDecision::TakeProfit { move_percent }
            | TriggerDecision::StopLoss { move_percent }
            | TriggerDecision::EmergencyStop { move_percent } => Some(*move_percent),
        }
    }

    pub fn is_triggered(&self) -> bool {
        !matches!(self, TriggerDecision::None)
    }
}
