//! Polling schedule for the monitoring loop.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

/// Source of polling instants.
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick. Returns `false` once no more ticks will come.
    async fn tick(&mut self) -> bool;
}

/// Fixed-period ticker backed by a tokio interval.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        // A slow cycle delays the schedule instead of causing a burst
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticker driven by hand through a [`ManualTickerHandle`].
pub struct ManualTicker {
    rx: mpsc::Receiver<()>,
}

/// Sends ticks to a [`ManualTicker`]. Dropping every handle ends the ticker.
#[derive(Clone)]
pub struct ManualTickerHandle {
    tx: mpsc::Sender<()>,
}

impl ManualTicker {
    pub fn channel() -> (Self, ManualTickerHandle) {
        let (tx, rx) = mpsc::channel(16);
        (Self { rx }, ManualTickerHandle { tx })
    }
}

impl ManualTickerHandle {
    /// Emit one tick. Returns `false` if the ticker is gone.
    pub async fn tick(&self) -> bool {
        self.tx.send(()).await.is_ok()
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_ticker() {
        let (mut ticker, handle) = ManualTicker::channel();
        assert!(handle.tick().await);
        assert!(ticker.tick().await);

        drop(handle);
        assert!(!ticker.tick().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_period() {
        let mut ticker = IntervalTicker::new(Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        ticker.tick().await; // first tick is immediate
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }
}
