//! Position monitoring loop, retry policy and logging setup.

mod executor;
mod logging;
mod retry;
mod ticker;

pub use executor::{CloseOutcome, CycleReport, MonitorConfig, PollReport, TriggerExecutor};
pub use logging::setup_logging;
pub use retry::RetryPolicy;
pub use ticker::{IntervalTicker, ManualTicker, ManualTickerHandle, Ticker};
