//! Execution bridges and venue price feeds.

mod http;
mod paper;

pub use http::{HttpExecutionBridge, HttpPriceFeed, HttpVenueConfig};
pub use paper::PaperExecutionBridge;
