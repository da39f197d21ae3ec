//! Trade log trait definition.

use crate::error::StoreError;
use crate::types::{Position, TradeEvent, TradeLogEntry, TradeLogFilter};
use async_trait::async_trait;

/// Append-only record of position lifecycle events.
///
/// Entries are never updated or deleted.
#[async_trait]
pub trait TradeLog: Send + Sync {
    /// Append an entry. The log assigns its sequence id, which is returned.
    async fn append(&self, entry: TradeLogEntry) -> Result<u64, StoreError>;

    /// Entries matching `filter`, in append order.
    async fn query(&self, filter: &TradeLogFilter) -> Result<Vec<TradeLogEntry>, StoreError>;

    /// The CLOSE entry recorded for this instance of `position`, if any.
    ///
    /// Entries logged before the position was opened belong to an earlier
    /// position that used the same id and are ignored.
    async fn find_close(&self, position: &Position) -> Result<Option<TradeLogEntry>, StoreError> {
        let filter = TradeLogFilter::position(position.id.as_str()).with_event(TradeEvent::Close);
        Ok(self
            .query(&filter)
            .await?
            .into_iter()
            .rev()
            .find(|entry| entry.timestamp >= position.opened_at))
    }
}
