//! Core data types for the risk monitoring system.

mod decision;
mod position;
mod tick;
mod trade;
mod trade_log;

pub use decision::TriggerDecision;
pub use position::{Direction, Position, PositionOrigin, PositionOverrides, PositionStatus};
pub use tick::PriceTick;
pub use trade::{CloseReason, CloseTrade};
pub use trade_log::{TradeEvent, TradeLogEntry, TradeLogFilter};
