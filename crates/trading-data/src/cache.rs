//! Latest-price cache.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use trading_core::error::FeedError;
use trading_core::traits::PriceFeed;
use trading_core::types::PriceTick;

/// Holds the most recent tick per symbol and serves it as a [`PriceFeed`].
///
/// Updates must arrive with non-decreasing timestamps per symbol.
#[derive(Default)]
pub struct PriceCache {
    ticks: RwLock<HashMap<String, PriceTick>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a tick. Rejects ticks older than the one already cached.
    pub fn update(&self, tick: PriceTick) -> Result<(), FeedError> {
        let mut ticks = self.ticks.write();
        if let Some(current) = ticks.get(&tick.symbol) {
            if tick.timestamp < current.timestamp {
                return Err(FeedError::OutOfOrder {
                    symbol: tick.symbol,
                });
            }
        }
        ticks.insert(tick.symbol.clone(), tick);
        Ok(())
    }

    /// Cached tick for a symbol, if any.
    pub fn latest(&self, symbol: &str) -> Option<PriceTick> {
        self.ticks.read().get(symbol).cloned()
    }

    /// Symbols with a cached price.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.ticks.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn clear(&self) {
        self.ticks.write().clear();
    }
}

#[async_trait]
impl PriceFeed for PriceCache {
    async fn get_price(&self, symbol: &str) -> Result<PriceTick, FeedError> {
        self.latest(symbol)
            .ok_or_else(|| FeedError::SymbolNotFound(symbol.to_string()))
    }

    fn name(&self) -> &str {
        "cache"
    }
}
