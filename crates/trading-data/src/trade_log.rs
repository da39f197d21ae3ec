//! Append-only in-memory trade log.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::io::Write;
use trading_core::error::{StoreError, TradingError};
use trading_core::traits::TradeLog;
use trading_core::types::{TradeLogEntry, TradeLogFilter};

/// In-memory [`TradeLog`]. Entries are only ever appended.
#[derive(Default)]
pub struct InMemoryTradeLog {
    entries: RwLock<Vec<TradeLogEntry>>,
}

impl InMemoryTradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry, in append order.
    pub fn entries(&self) -> Vec<TradeLogEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every entry matching `filter` as CSV.
    pub fn write_csv<W: Write>(
        &self,
        writer: W,
        filter: &TradeLogFilter,
    ) -> Result<usize, TradingError> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record([
            "id",
            "timestamp",
            "position_id",
            "user_id",
            "symbol",
            "source",
            "event",
            "reason",
            "price",
            "pnl",
        ])
        .map_err(|e| TradingError::Serialization(e.to_string()))?;

        let entries = self.entries.read();
        let mut written = 0;
        for entry in entries.iter().filter(|e| filter.matches(e)) {
            csv.write_record([
                entry.id.to_string(),
                entry.timestamp.to_rfc3339(),
                entry.position_id.clone(),
                entry.user_id.clone(),
                entry.symbol.clone(),
                entry.source.clone(),
                entry.event.to_string(),
                entry.reason.map(|r| r.to_string()).unwrap_or_default(),
                entry.price.to_string(),
                entry.pnl.map(|p| p.to_string()).unwrap_or_default(),
            ])
            .map_err(|e| TradingError::Serialization(e.to_string()))?;
            written += 1;
        }

        csv.flush()?;
        Ok(written)
    }
}

#[async_trait]
impl TradeLog for InMemoryTradeLog {
    async fn append(&self, mut entry: TradeLogEntry) -> Result<u64, StoreError> {
        let mut entries = self.entries.write();
        let id = entries.len() as u64 + 1;
        entry.id = id;
        entries.push(entry);
        Ok(id)
    }

    async fn query(&self, filter: &TradeLogFilter) -> Result<Vec<TradeLogEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }
}
