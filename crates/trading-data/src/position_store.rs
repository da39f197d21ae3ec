//! In-memory position store with per-position locking.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use trading_core::error::StoreError;
use trading_core::traits::PositionStore;
use trading_core::types::{CloseTrade, Position, PositionStatus};

type Slot = Arc<Mutex<Position>>;

/// In-memory [`PositionStore`].
///
/// The id map is only write-locked to insert or remove a position; every status
/// change happens under that position's own mutex.
#[derive(Default)]
pub struct InMemoryPositionStore {
    positions: RwLock<HashMap<String, Slot>>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &str) -> Result<Slot, StoreError> {
        self.positions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn collect<F>(&self, mut predicate: F) -> Vec<Position>
    where
        F: FnMut(&Position) -> bool,
    {
        let slots: Vec<Slot> = self.positions.read().values().cloned().collect();
        let mut matched: Vec<Position> = slots
            .iter()
            .map(|slot| slot.lock().clone())
            .filter(|p| predicate(p))
            .collect();
        matched.sort_by(|a, b| a.opened_at.cmp(&b.opened_at).then_with(|| a.id.cmp(&b.id)));
        matched
    }

    /// Apply a status transition under the position's lock, then run `then` on it.
    fn transition<R>(
        &self,
        id: &str,
        to: PositionStatus,
        then: impl FnOnce(&mut Position) -> R,
    ) -> Result<R, StoreError> {
        let slot = self.slot(id)?;
        let mut position = slot.lock();
        if !position.status.can_transition_to(to) {
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: position.status,
                to,
            });
        }
        position.status = to;
        Ok(then(&mut position))
    }

    /// Number of positions held, in any status.
    pub fn len(&self) -> usize {
        self.positions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PositionStore for InMemoryPositionStore {
    async fn insert(&self, mut position: Position) -> Result<(), StoreError> {
        let mut positions = self.positions.write();
        if positions.contains_key(&position.id) {
            return Err(StoreError::Duplicate(position.id));
        }
        position.status = PositionStatus::Open;
        debug!(position_id = %position.id, symbol = %position.symbol, "Position stored");
        positions.insert(position.id.clone(), Arc::new(Mutex::new(position)));
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Position>, StoreError> {
        Ok(self
            .positions
            .read()
            .get(id)
            .map(|slot| slot.lock().clone()))
    }

    async fn snapshot_open_positions(&self, symbol: &str) -> Result<Vec<Position>, StoreError> {
        Ok(self.collect(|p| p.status == PositionStatus::Open && p.symbol == symbol))
    }

    async fn open_symbols(&self) -> Result<Vec<String>, StoreError> {
        let mut symbols: Vec<String> = self
            .collect(|p| p.status == PositionStatus::Open)
            .into_iter()
            .map(|p| p.symbol)
            .collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }

    async fn positions_with_status(
        &self,
        status: PositionStatus,
    ) -> Result<Vec<Position>, StoreError> {
        Ok(self.collect(|p| p.status == status))
    }

    async fn record_price(&self, id: &str, price: Decimal) -> Result<bool, StoreError> {
        let slot = self.slot(id)?;
        let mut position = slot.lock();
        if position.status != PositionStatus::Open {
            return Ok(false);
        }
        match position.improved_peak(price) {
            Some(peak) => {
                position.peak_price = Some(peak);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn try_begin_close(&self, id: &str) -> Result<bool, StoreError> {
        match self.transition(id, PositionStatus::Closing, |_| ()) {
            Ok(_) => Ok(true),
            Err(StoreError::InvalidTransition { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn confirm_closed(&self, id: &str, trade: &CloseTrade) -> Result<Position, StoreError> {
        let closed = self.transition(id, PositionStatus::Closed, |p| p.clone())?;
        self.positions.write().remove(id);
        debug!(
            position_id = %id,
            exit_price = %trade.exit_price,
            "Position closed and removed"
        );
        Ok(closed)
    }

    async fn revert_to_open(&self, id: &str) -> Result<u32, StoreError> {
        self.transition(id, PositionStatus::Open, |p| {
            p.close_attempts += 1;
            p.close_attempts
        })
    }

    async fn mark_failed(&self, id: &str) -> Result<(), StoreError> {
        self.transition(id, PositionStatus::Failed, |p| p.close_attempts += 1)
    }

    async fn reset_failed(&self, id: &str) -> Result<(), StoreError> {
        let slot = self.slot(id)?;
        let mut position = slot.lock();
        if position.status != PositionStatus::Failed {
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: position.status,
                to: PositionStatus::Open,
            });
        }
        position.status = PositionStatus::Open;
        position.close_attempts = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use trading_core::types::Direction;

    fn position(id: &str, symbol: &str) -> Position {
        Position::open("u1", symbol, Direction::Long, dec!(100), dec!(1)).with_id(id)
    }

    fn trade(id: &str) -> CloseTrade {
        CloseTrade {
            position_id: id.to_string(),
            exit_price: dec!(110),
            quantity: dec!(1),
            executed_at: Utc::now(),
            venue_order_id: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate() {
        let store = InMemoryPositionStore::new();
        store.insert(position("p1", "BTC")).await.unwrap();
        assert_eq!(
            store.insert(position("p1", "BTC")).await,
            Err(StoreError::Duplicate("p1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_snapshot_filters_symbol_and_status() {
        let store = InMemoryPositionStore::new();
        store.insert(position("p1", "BTC")).await.unwrap();
        store.insert(position("p2", "BTC")).await.unwrap();
        store.insert(position("p3", "ETH")).await.unwrap();
        assert!(store.try_begin_close("p2").await.unwrap());

        let snapshot = store.snapshot_open_positions("BTC").await.unwrap();
        let ids: Vec<_> = snapshot.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);
        assert_eq!(store.open_symbols().await.unwrap(), vec!["BTC", "ETH"]);
    }

    #[tokio::test]
    async fn test_try_begin_close_is_exclusive() {
        let store = InMemoryPositionStore::new();
        store.insert(position("p1", "BTC")).await.unwrap();

        assert!(store.try_begin_close("p1").await.unwrap());
        assert!(!store.try_begin_close("p1").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_begin_close_single_winner() {
        let store = Arc::new(InMemoryPositionStore::new());
        store.insert(position("p1", "BTC")).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.try_begin_close("p1").await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_confirm_closed_removes_position() {
        let store = InMemoryPositionStore::new();
        store.insert(position("p1", "BTC")).await.unwrap();
        store.try_begin_close("p1").await.unwrap();

        let closed = store.confirm_closed("p1", &trade("p1")).await.unwrap();
        assert_eq!(closed.status, PositionStatus::Closed);
        assert!(store.get("p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_confirm_requires_closing() {
        let store = InMemoryPositionStore::new();
        store.insert(position("p1", "BTC")).await.unwrap();
        let err = store.confirm_closed("p1", &trade("p1")).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert!(store.get("p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_revert_counts_attempts() {
        let store = InMemoryPositionStore::new();
        store.insert(position("p1", "BTC")).await.unwrap();

        store.try_begin_close("p1").await.unwrap();
        assert_eq!(store.revert_to_open("p1").await.unwrap(), 1);
        store.try_begin_close("p1").await.unwrap();
        assert_eq!(store.revert_to_open("p1").await.unwrap(), 2);

        let p = store.get("p1").await.unwrap().unwrap();
        assert_eq!(p.status, PositionStatus::Open);
        assert_eq!(p.close_attempts, 2);
    }

    #[tokio::test]
    async fn test_failed_position_persists_until_reset() {
        let store = InMemoryPositionStore::new();
        store.insert(position("p1", "BTC")).await.unwrap();
        store.try_begin_close("p1").await.unwrap();
        store.mark_failed("p1").await.unwrap();

        assert!(store.snapshot_open_positions("BTC").await.unwrap().is_empty());
        assert!(!store.try_begin_close("p1").await.unwrap());
        let failed = store.positions_with_status(PositionStatus::Failed).await.unwrap();
        assert_eq!(failed.len(), 1);

        store.reset_failed("p1").await.unwrap();
        let p = store.get("p1").await.unwrap().unwrap();
        assert_eq!(p.status, PositionStatus::Open);
        assert_eq!(p.close_attempts, 0);
    }

    #[tokio::test]
    async fn test_record_price_ratchets_peak() {
        let store = InMemoryPositionStore::new();
        store.insert(position("p1", "BTC")).await.unwrap();

        assert!(store.record_price("p1", dec!(105)).await.unwrap());
        assert!(!store.record_price("p1", dec!(103)).await.unwrap());
        let p = store.get("p1").await.unwrap().unwrap();
        assert_eq!(p.peak_price, Some(dec!(105)));
    }

    #[tokio::test]
    async fn test_unknown_position() {
        let store = InMemoryPositionStore::new();
        assert_eq!(
            store.try_begin_close("nope").await,
            Err(StoreError::NotFound("nope".to_string()))
        );
    }
}
