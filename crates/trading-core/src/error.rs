//! Error types for the risk monitoring system.

use thiserror::Error;

use crate::types::PositionStatus;

/// Top-level error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),

    #[error("Price feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A malformed or incomplete risk settings payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("field {field} must be non-negative, got {value}")]
    Negative { field: String, value: String },

    #[error("{0}")]
    Invalid(String),
}

/// Errors raised while reading or replacing risk settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Validation(#[from] ValidationError),

    #[error("unknown risk profile: {0}")]
    UnknownProfile(String),
}

/// Errors returned by an execution bridge when closing a position.
///
/// Everything except `Configuration` is retried, bounded by the retry policy.
#[derive(Error, Debug, Clone)]
pub enum ExecutionError {
    #[error("close timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("venue rejected close: {0}")]
    Rejected(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("position not found at venue: {0}")]
    PositionNotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ExecutionError {
    /// Whether the close may be retried.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ExecutionError::Configuration(_))
    }
}

/// Position store and trade log errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("position not found: {0}")]
    NotFound(String),

    #[error("position already exists: {0}")]
    Duplicate(String),

    #[error("illegal transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: PositionStatus,
        to: PositionStatus,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Price feed errors.
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("no price data available")]
    NoDataAvailable,

    #[error("price request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("out-of-order tick for {symbol}")]
    OutOfOrder { symbol: String },
}

/// Result type alias.
pub type TradingResult<T> = Result<T, TradingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_all() {
        let err = ValidationError::MissingFields(vec![
            "global_stop_loss_percent".to_string(),
            "max_trades_per_day".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "missing required fields: global_stop_loss_percent, max_trades_per_day"
        );
    }

    #[test]
    fn test_execution_error_recoverability() {
        assert!(ExecutionError::Timeout { after_ms: 10 }.is_recoverable());
        assert!(ExecutionError::Rejected("halted".into()).is_recoverable());
        assert!(!ExecutionError::Configuration("no key".into()).is_recoverable());
    }
}
