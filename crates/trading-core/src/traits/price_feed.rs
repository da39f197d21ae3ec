//! Price feed trait definition.

use crate::error::FeedError;
use crate::types::PriceTick;
use async_trait::async_trait;

/// Trait for sources of the latest price of a symbol.
///
/// Timestamps must be non-decreasing per symbol.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Get the latest price for a symbol.
    async fn get_price(&self, symbol: &str) -> Result<PriceTick, FeedError>;

    /// Get the feed name.
    fn name(&self) -> &str;
}
