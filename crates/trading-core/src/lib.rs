//! Core types and traits for position risk monitoring.
//!
//! This crate provides the foundational building blocks including:
//! - Position, price tick, close trade and trade log types
//! - Trigger decisions
//! - Collaborator traits for price feeds, execution bridges, position stores and trade logs

pub mod types;
pub mod traits;
pub mod error;

pub use error::{TradingError, TradingResult};
pub use types::*;
pub use traits::*;
