//! In-memory stores and price sources for the risk monitor.

mod cache;
mod csv_source;
mod position_store;
mod trade_log;

pub use cache::PriceCache;
pub use csv_source::CsvTickSource;
pub use position_store::InMemoryPositionStore;
pub use trade_log::InMemoryTradeLog;

use trading_core::error::FeedError;
use trading_core::types::PriceTick;

/// Load ticks from a CSV file, ordered by timestamp.
pub fn load_ticks(path: &str) -> Result<Vec<PriceTick>, FeedError> {
    Ok(CsvTickSource::from_path(path)?.into_ticks())
}
