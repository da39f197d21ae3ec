//! Paper execution bridge for replay and simulation.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use trading_core::error::ExecutionError;
use trading_core::traits::{ExecutionBridge, PriceFeed};
use trading_core::types::{CloseReason, CloseTrade, Position};
use uuid::Uuid;

/// Simulated venue that fills closes at the feed price.
///
/// Closing a long sells and closing a short buys, so slippage is always applied
/// against the position.
pub struct PaperExecutionBridge {
    feed: Arc<dyn PriceFeed>,
    slippage_pct: Decimal,
    latency: Option<Duration>,
    scripted_failures: Mutex<VecDeque<ExecutionError>>,
    fills: Mutex<Vec<CloseTrade>>,
}

impl PaperExecutionBridge {
    /// Create a bridge pricing fills from `feed`.
    pub fn new(feed: Arc<dyn PriceFeed>) -> Self {
        Self {
            feed,
            slippage_pct: dec!(0.05), // 0.05% slippage
            latency: None,
            scripted_failures: Mutex::new(VecDeque::new()),
            fills: Mutex::new(Vec::new()),
        }
    }

    /// Set slippage percentage.
    pub fn with_slippage(mut self, slippage_pct: Decimal) -> Self {
        self.slippage_pct = slippage_pct;
        self
    }

    /// Delay every close by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next `count` closes with a connection error.
    pub fn inject_failures(&self, count: usize) {
        let mut failures = self.scripted_failures.lock();
        for _ in 0..count {
            failures.push_back(ExecutionError::Connection("simulated venue outage".into()));
        }
    }

    /// Fail the next close with `error`.
    pub fn fail_next_with(&self, error: ExecutionError) {
        self.scripted_failures.lock().push_back(error);
    }

    /// Number of successful closes.
    pub fn close_count(&self) -> usize {
        self.fills.lock().len()
    }

    /// Every fill produced so far.
    pub fn fills(&self) -> Vec<CloseTrade> {
        self.fills.lock().clone()
    }

    fn fill_price(&self, position: &Position, market_price: Decimal) -> Decimal {
        let slip = self.slippage_pct / dec!(100);
        if position.is_long() {
            market_price * (dec!(1) - slip)
        } else {
            market_price * (dec!(1) + slip)
        }
    }
}

#[async_trait]
impl ExecutionBridge for PaperExecutionBridge {
    async fn close_position(
        &self,
        position: &Position,
        reason: CloseReason,
    ) -> Result<CloseTrade, ExecutionError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.scripted_failures.lock().pop_front() {
            debug!(position_id = %position.id, %error, "Paper close failed");
            return Err(error);
        }

        let tick = self
            .feed
            .get_price(&position.symbol)
            .await
            .map_err(|e| ExecutionError::Connection(e.to_string()))?;

        let trade = CloseTrade {
            position_id: position.id.clone(),
            exit_price: self.fill_price(position, tick.price),
            quantity: position.quantity,
            executed_at: Utc::now(),
            venue_order_id: Some(Uuid::new_v4().to_string()),
        };

        info!(
            position_id = %position.id,
            symbol = %position.symbol,
            %reason,
            exit_price = %trade.exit_price,
            "Paper close filled"
        );
        self.fills.lock().push(trade.clone());
        Ok(trade)
    }

    fn name(&self) -> &str {
        "paper"
    }
}
