//! Collaborator traits.

mod execution;
mod position_store;
mod price_feed;
mod trade_log;

pub use execution::ExecutionBridge;
pub use position_store::PositionStore;
pub use price_feed::PriceFeed;
pub use trade_log::TradeLog;
