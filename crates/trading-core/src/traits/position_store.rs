//! Position store trait definition.

use crate::error::StoreError;
use crate::types::{CloseTrade, Position, PositionStatus};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Authoritative set of monitored positions.
///
/// Every mutation of a single position is serialized. `try_begin_close` is the
/// exclusivity guard: only one caller can move a position from OPEN to CLOSING.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Add a new OPEN position.
    async fn insert(&self, position: Position) -> Result<(), StoreError>;

    /// Look up a position by id.
    async fn get(&self, id: &str) -> Result<Option<Position>, StoreError>;

    /// Consistent point-in-time copy of the OPEN positions on `symbol`.
    async fn snapshot_open_positions(&self, symbol: &str) -> Result<Vec<Position>, StoreError>;

    /// Symbols with at least one OPEN position.
    async fn open_symbols(&self) -> Result<Vec<String>, StoreError>;

    /// All positions currently in `status`.
    async fn positions_with_status(
        &self,
        status: PositionStatus,
    ) -> Result<Vec<Position>, StoreError>;

    /// Ratchet the peak price of an OPEN position. Returns whether it changed.
    async fn record_price(&self, id: &str, price: Decimal) -> Result<bool, StoreError>;

    /// Atomically move OPEN -> CLOSING. Returns `false` if the position is not OPEN.
    async fn try_begin_close(&self, id: &str) -> Result<bool, StoreError>;

    /// CLOSING -> CLOSED. Removes the position and returns its final state.
    async fn confirm_closed(&self, id: &str, trade: &CloseTrade) -> Result<Position, StoreError>;

    /// CLOSING -> OPEN after a recoverable failure. Returns the new attempt count.
    async fn revert_to_open(&self, id: &str) -> Result<u32, StoreError>;

    /// CLOSING -> FAILED once retries are exhausted.
    async fn mark_failed(&self, id: &str) -> Result<(), StoreError>;

    /// Operator action: FAILED -> OPEN with the attempt counter reset.
    async fn reset_failed(&self, id: &str) -> Result<(), StoreError>;
}
