//! Append-only trade log records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CloseReason, Position};

/// Lifecycle event recorded in the trade log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeEvent {
    Open,
    Close,
    CloseFailed,
}

impl std::fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeEvent::Open => write!(f, "OPEN"),
            TradeEvent::Close => write!(f, "CLOSE"),
            TradeEvent::CloseFailed => write!(f, "CLOSE_FAILED"),
        }
    }
}

impl std::str::FromStr for TradeEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Ok(TradeEvent::Open),
            "CLOSE" => Ok(TradeEvent::Close),
            "CLOSE_FAILED" => Ok(TradeEvent::CloseFailed),
            other => Err(format!("unknown trade event: {}", other)),
        }
    }
}

/// One immutable trade log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    /// Sequence number assigned by the log on append
    pub id: u64,
    pub position_id: String,
    pub user_id: String,
    pub symbol: String,
    /// Signal source of the position
    pub source: String,
    pub event: TradeEvent,
    pub reason: Option<CloseReason>,
    pub price: Decimal,
    pub pnl: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl TradeLogEntry {
    fn for_position(position: &Position, event: TradeEvent, price: Decimal) -> Self {
        Self {
            id: 0,
            position_id: position.id.clone(),
            user_id: position.user_id.clone(),
            symbol: position.symbol.clone(),
            source: position.origin.source.clone(),
            event,
            reason: None,
            price,
            pnl: None,
            timestamp: Utc::now(),
        }
    }

    /// Entry recording a newly opened position.
    pub fn opened(position: &Position) -> Self {
        Self::for_position(position, TradeEvent::Open, position.entry_price)
    }

    /// Entry recording a confirmed close.
    pub fn closed(position: &Position, reason: CloseReason, exit_price: Decimal) -> Self {
        let mut entry = Self::for_position(position, TradeEvent::Close, exit_price);
        entry.reason = Some(reason);
        entry.pnl = Some(position.pnl_at(exit_price));
        entry
    }

    /// Entry recording a close that exhausted its retries.
    pub fn close_failed(position: &Position, reason: CloseReason, last_price: Decimal) -> Self {
        let mut entry = Self::for_position(position, TradeEvent::CloseFailed, last_price);
        entry.reason = Some(reason);
        entry
    }
}

/// Trade log query. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeLogFilter {
    pub position_id: Option<String>,
    pub symbol: Option<String>,
    pub source: Option<String>,
    pub event: Option<TradeEvent>,
    pub user_id: Option<String>,
}

impl TradeLogFilter {
    pub fn position(position_id: impl Into<String>) -> Self {
        Self {
            position_id: Some(position_id.into()),
            ..Default::default()
        }
    }

    pub fn with_event(mut self, event: TradeEvent) -> Self {
        self.event = Some(event);
        self
    }

    pub fn matches(&self, entry: &TradeLogEntry) -> bool {
        self.position_id.as_ref().map_or(true, |id| *id == entry.position_id)
            && self.symbol.as_ref().map_or(true, |s| *s == entry.symbol)
            && self.source.as_ref().map_or(true, |s| *s == entry.source)
            && self.event.map_or(true, |e| e == entry.event)
            && self.user_id.as_ref().map_or(true, |u| *u == entry.user_id)
    }
}
