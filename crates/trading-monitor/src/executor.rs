//! The monitoring loop: evaluates open positions on every price and drives closes.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use trading_core::error::{ExecutionError, StoreError, TradingError};
use trading_core::traits::{ExecutionBridge, PositionStore, PriceFeed, TradeLog};
use trading_core::types::{
    CloseReason, CloseTrade, Position, PositionStatus, PriceTick, TradeEvent, TradeLogEntry,
    TradeLogFilter,
};
use trading_risk::{RiskEvaluator, RiskSettingsStore};

use crate::retry::RetryPolicy;
use crate::ticker::Ticker;

/// Timing parameters of the monitoring loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Period between polling passes
    pub cycle_period: Duration,
    /// Bound on a single price lookup
    pub price_timeout: Duration,
    /// Bound on a single close call to the execution bridge
    pub execution_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cycle_period: Duration::from_millis(5000),
            price_timeout: Duration::from_millis(2000),
            execution_timeout: Duration::from_millis(10_000),
            retry: RetryPolicy::default(),
        }
    }
}

/// What happened to one triggered position.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// Closed through the execution bridge
    Closed { exit_price: Decimal, pnl: Decimal },
    /// The trade log already held a CLOSE; confirmed without calling the bridge
    Reconciled,
    /// Another cycle is already closing this position
    Skipped,
    /// Close failed and will be re-attempted after `delay`
    RetryScheduled { attempt: u32, delay: Duration },
    /// Retries exhausted or unrecoverable error; needs an operator
    Failed { attempts: u32 },
    /// Persistence failure isolated to this position
    Error(String),
}

/// Summary of one symbol's cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub symbol: String,
    pub price: Decimal,
    pub evaluated: usize,
    pub triggered: usize,
    pub outcomes: Vec<(String, CloseOutcome)>,
}

impl CycleReport {
    fn empty(tick: &PriceTick) -> Self {
        Self {
            symbol: tick.symbol.clone(),
            price: tick.price,
            evaluated: 0,
            triggered: 0,
            outcomes: Vec::new(),
        }
    }

    /// Outcome recorded for a position, if it was acted on.
    pub fn outcome(&self, position_id: &str) -> Option<&CloseOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == position_id)
            .map(|(_, outcome)| outcome)
    }
}

/// Summary of one polling pass.
#[derive(Debug, Clone, Default)]
pub struct PollReport {
    pub reconciled: usize,
    pub retries: Vec<(String, CloseOutcome)>,
    pub cycles: Vec<CycleReport>,
}

#[derive(Debug, Clone)]
struct ScheduledRetry {
    reason: CloseReason,
    last_price: Decimal,
    due_at: Instant,
}

/// Set of exclusively claimed keys. A claim is released when its guard drops.
#[derive(Default)]
struct ClaimSet {
    claims: Mutex<HashSet<String>>,
}

impl ClaimSet {
    fn try_claim(&self, key: &str) -> Option<Claim<'_>> {
        if !self.claims.lock().insert(key.to_string()) {
            return None;
        }
        Some(Claim {
            set: self,
            key: key.to_string(),
        })
    }
}

struct Claim<'a> {
    set: &'a ClaimSet,
    key: String,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.set.claims.lock().remove(&self.key);
    }
}

/// Watches open positions and closes them once a threshold is crossed.
///
/// Every collaborator is injected. Overlapping cycles may evaluate the same
/// position, but only one of them reaches the execution bridge: closes hold an
/// exclusive in-process claim on the position id, and the store's
/// `try_begin_close` guards the OPEN to CLOSING transition.
pub struct TriggerExecutor {
    positions: Arc<dyn PositionStore>,
    settings: Arc<RiskSettingsStore>,
    bridge: Arc<dyn ExecutionBridge>,
    trade_log: Arc<dyn TradeLog>,
    feed: Arc<dyn PriceFeed>,
    evaluator: RiskEvaluator,
    config: MonitorConfig,
    last_seen: Mutex<HashMap<String, DateTime<Utc>>>,
    busy_symbols: ClaimSet,
    in_flight: ClaimSet,
    retries: Mutex<HashMap<String, ScheduledRetry>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl TriggerExecutor {
    pub fn new(
        positions: Arc<dyn PositionStore>,
        settings: Arc<RiskSettingsStore>,
        bridge: Arc<dyn ExecutionBridge>,
        trade_log: Arc<dyn TradeLog>,
        feed: Arc<dyn PriceFeed>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            positions,
            settings,
            bridge,
            trade_log,
            feed,
            evaluator: RiskEvaluator::new(),
            config,
            last_seen: Mutex::new(HashMap::new()),
            busy_symbols: ClaimSet::default(),
            in_flight: ClaimSet::default(),
            retries: Mutex::new(HashMap::new()),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Token cancelled when shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Ids with a close re-attempt waiting for its backoff.
    pub fn pending_retries(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.retries.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Start monitoring a newly opened position.
    ///
    /// Rejects positions without a positive entry price and quantity, and ids
    /// that already have a CLOSE in the trade log.
    pub async fn register_position(&self, position: Position) -> Result<(), TradingError> {
        position.validate()?;
        let previous_close =
            TradeLogFilter::position(position.id.as_str()).with_event(TradeEvent::Close);
        if !self.trade_log.query(&previous_close).await?.is_empty() {
            return Err(StoreError::Duplicate(position.id).into());
        }

        let entry = TradeLogEntry::opened(&position);
        info!(
            position_id = %position.id,
            symbol = %position.symbol,
            direction = %position.direction,
            entry_price = %position.entry_price,
            "Monitoring position"
        );
        self.positions.insert(position).await?;
        self.trade_log.append(entry).await?;
        Ok(())
    }

    /// Run a cycle for a pushed tick.
    ///
    /// Returns `None` if the tick is older than one already seen for the symbol or
    /// the symbol's previous cycle is still running.
    pub async fn handle_tick(&self, tick: PriceTick) -> Option<CycleReport> {
        if self.shutdown.is_cancelled() {
            return None;
        }

        {
            let mut last_seen = self.last_seen.lock();
            if let Some(previous) = last_seen.get(&tick.symbol) {
                if tick.timestamp < *previous {
                    warn!(
                        symbol = %tick.symbol,
                        tick_time = %tick.timestamp,
                        last_time = %previous,
                        "Dropping out-of-order tick"
                    );
                    return None;
                }
            }
            last_seen.insert(tick.symbol.clone(), tick.timestamp);
        }

        let Some(_busy) = self.busy_symbols.try_claim(&tick.symbol) else {
            debug!(symbol = %tick.symbol, "Previous cycle still running, skipping tick");
            return None;
        };

        Some(self.run_cycle(&tick).await)
    }

    /// Snapshot the OPEN positions on the tick's symbol and evaluate them.
    pub async fn run_cycle(&self, tick: &PriceTick) -> CycleReport {
        match self.positions.snapshot_open_positions(&tick.symbol).await {
            Ok(snapshot) => self.process_snapshot(snapshot, tick).await,
            Err(e) => {
                error!(symbol = %tick.symbol, error = %e, "Failed to snapshot positions");
                CycleReport::empty(tick)
            }
        }
    }

    /// Evaluate a snapshot against one price and execute every triggered close.
    ///
    /// Closes inside one cycle run concurrently. A failure on one position never
    /// affects the others.
    pub async fn process_snapshot(&self, snapshot: Vec<Position>, tick: &PriceTick) -> CycleReport {
        let mut report = CycleReport::empty(tick);
        if self.shutdown.is_cancelled() {
            return report;
        }

        let pending: HashSet<String> = self.retries.lock().keys().cloned().collect();
        let mut triggered = Vec::new();

        for mut position in snapshot {
            if pending.contains(&position.id) {
                continue;
            }

            match self.positions.record_price(&position.id, tick.price).await {
                Ok(true) => {
                    if let Some(peak) = position.improved_peak(tick.price) {
                        position.peak_price = Some(peak);
                    }
                }
                Ok(false) => {}
                Err(StoreError::NotFound(_)) => {
                    debug!(position_id = %position.id, "Position closed since snapshot");
                    continue;
                }
                Err(e) => {
                    error!(position_id = %position.id, error = %e, "Failed to record price");
                    report
                        .outcomes
                        .push((position.id.clone(), CloseOutcome::Error(e.to_string())));
                    continue;
                }
            }

            report.evaluated += 1;
            let effective = self.settings.effective_for(&position);
            let decision = self.evaluator.evaluate(&position, tick.price, &effective);
            let (Some(reason), Some(move_percent)) = (decision.close_reason(), decision.move_percent())
            else {
                continue;
            };

            info!(
                position_id = %position.id,
                symbol = %position.symbol,
                %reason,
                %move_percent,
                price = %tick.price,
                "Trigger fired"
            );
            triggered.push((position, reason));
        }

        report.triggered = triggered.len();
        let closes = triggered.iter().map(|(position, reason)| {
            self.tracker
                .track_future(self.execute_close(position, *reason, tick.price))
        });
        let outcomes = join_all(closes).await;

        report.outcomes.extend(
            triggered
                .iter()
                .map(|(position, _)| position.id.clone())
                .zip(outcomes),
        );
        report
    }

    /// Re-attempt every scheduled close whose backoff has elapsed at `now`.
    pub async fn run_due_retries(&self, now: Instant) -> Vec<(String, CloseOutcome)> {
        let due: Vec<(String, ScheduledRetry)> = {
            let mut retries = self.retries.lock();
            let ids: Vec<String> = retries
                .iter()
                .filter(|(_, retry)| retry.due_at <= now)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| retries.remove(&id).map(|retry| (id, retry)))
                .collect()
        };
        if due.is_empty() {
            return Vec::new();
        }

        let mut attempts = Vec::new();
        for (id, retry) in due {
            match self.positions.get(&id).await {
                Ok(Some(position)) => attempts.push((position, retry)),
                Ok(None) => debug!(position_id = %id, "Dropping retry for removed position"),
                Err(e) => {
                    error!(position_id = %id, error = %e, "Failed to load position for retry");
                    // Keep the retry so it is picked up again
                    self.retries.lock().insert(id, retry);
                }
            }
        }

        let closes = attempts.iter().map(|(position, retry)| {
            debug!(position_id = %position.id, reason = %retry.reason, "Retrying close");
            self.tracker
                .track_future(self.execute_close(position, retry.reason, retry.last_price))
        });
        let outcomes = join_all(closes).await;

        attempts
            .into_iter()
            .map(|(position, _)| position.id)
            .zip(outcomes)
            .collect()
    }

    /// Settle CLOSING positions that no close in this process is working on.
    ///
    /// A CLOSE already in the trade log is confirmed; anything else goes back to
    /// OPEN. Returns how many positions were settled.
    pub async fn reconcile_stuck(&self) -> usize {
        let closing = match self.positions.positions_with_status(PositionStatus::Closing).await {
            Ok(closing) => closing,
            Err(e) => {
                error!(error = %e, "Failed to list closing positions");
                return 0;
            }
        };

        let mut settled = 0;
        for listed in closing {
            // A close running in this process owns the position until it finishes
            let Some(_claim) = self.in_flight.try_claim(&listed.id) else {
                continue;
            };
            let position = match self.positions.get(&listed.id).await {
                Ok(Some(current))
                    if current.status == PositionStatus::Closing
                        && current.close_attempts == listed.close_attempts =>
                {
                    current
                }
                Ok(_) => {
                    debug!(position_id = %listed.id, "Position moved on since listing, not settling");
                    continue;
                }
                Err(e) => {
                    error!(position_id = %listed.id, error = %e, "Failed to reload CLOSING position");
                    continue;
                }
            };

            let result = match self.trade_log.find_close(&position).await {
                Ok(Some(entry)) => {
                    let trade = CloseTrade {
                        position_id: position.id.clone(),
                        exit_price: entry.price,
                        quantity: position.quantity,
                        executed_at: entry.timestamp,
                        venue_order_id: None,
                    };
                    self.positions
                        .confirm_closed(&position.id, &trade)
                        .await
                        .map(|_| "confirmed")
                }
                Ok(None) => self
                    .positions
                    .revert_to_open(&position.id)
                    .await
                    .map(|_| "reverted"),
                Err(e) => Err(e),
            };

            match result {
                Ok(action) => {
                    warn!(position_id = %position.id, action, "Settled stuck CLOSING position");
                    settled += 1;
                }
                Err(e) => {
                    error!(position_id = %position.id, error = %e, "Failed to settle CLOSING position")
                }
            }
        }
        settled
    }

    /// One polling pass: settle stuck closes, run due retries, then run a cycle for
    /// every symbol with open positions. Symbols are processed in parallel.
    pub async fn poll_once(&self) -> PollReport {
        let mut report = PollReport::default();
        if self.shutdown.is_cancelled() {
            return report;
        }

        report.reconciled = self.reconcile_stuck().await;
        report.retries = self.run_due_retries(Instant::now()).await;

        let symbols = match self.positions.open_symbols().await {
            Ok(symbols) => symbols,
            Err(e) => {
                error!(error = %e, "Failed to list open symbols");
                return report;
            }
        };

        let cycles = symbols.into_iter().map(|symbol| async move {
            let tick = match timeout(self.config.price_timeout, self.feed.get_price(&symbol)).await {
                Ok(Ok(tick)) => tick,
                Ok(Err(e)) => {
                    warn!(%symbol, error = %e, feed = self.feed.name(), "Price unavailable");
                    return None;
                }
                Err(_) => {
                    warn!(
                        %symbol,
                        timeout_ms = self.config.price_timeout.as_millis() as u64,
                        "Price request timed out"
                    );
                    return None;
                }
            };
            self.handle_tick(tick).await
        });

        report.cycles = join_all(cycles).await.into_iter().flatten().collect();
        report
    }

    /// Poll on every tick of `ticker` until shutdown, then drain.
    pub async fn run<T: Ticker>(self: Arc<Self>, mut ticker: T) {
        info!(
            cycle_period_ms = self.config.cycle_period.as_millis() as u64,
            bridge = self.bridge.name(),
            feed = self.feed.name(),
            "Monitor started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                alive = ticker.tick() => {
                    if !alive {
                        break;
                    }
                    let this = Arc::clone(&self);
                    self.tracker.spawn(async move {
                        this.poll_once().await;
                    });
                }
            }
        }

        self.drain().await;
        info!("Monitor stopped");
    }

    /// Run a cycle for every pushed tick until the stream ends or shutdown, then drain.
    pub async fn run_feed<S>(self: Arc<Self>, mut ticks: S)
    where
        S: Stream<Item = PriceTick> + Unpin + Send,
    {
        info!(bridge = self.bridge.name(), "Monitor consuming pushed ticks");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = ticks.next() => {
                    let Some(tick) = next else { break };
                    let this = Arc::clone(&self);
                    self.tracker.spawn(async move {
                        this.run_due_retries(Instant::now()).await;
                        this.handle_tick(tick).await;
                    });
                }
            }
        }

        self.drain().await;
        info!("Monitor stopped");
    }

    /// Stop accepting new cycles and wait for every in-flight close to resolve.
    pub async fn shutdown(&self) {
        info!("Monitor shutting down, draining in-flight closes");
        self.shutdown.cancel();
        self.drain().await;
    }

    async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    async fn execute_close(
        &self,
        position: &Position,
        reason: CloseReason,
        price: Decimal,
    ) -> CloseOutcome {
        let Some(_claim) = self.in_flight.try_claim(&position.id) else {
            warn!(position_id = %position.id, %reason, "Close already in progress, skipping");
            return CloseOutcome::Skipped;
        };

        match self.positions.try_begin_close(&position.id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(position_id = %position.id, %reason, "Close already in progress, skipping");
                return CloseOutcome::Skipped;
            }
            Err(e) => {
                error!(position_id = %position.id, error = %e, "Failed to begin close");
                return CloseOutcome::Error(e.to_string());
            }
        }

        match self.trade_log.find_close(position).await {
            Ok(Some(entry)) => return self.confirm_reconciled(position, entry).await,
            Ok(None) => {}
            Err(e) => {
                error!(position_id = %position.id, error = %e, "Trade log unavailable, deferring close");
                if let Err(revert) = self.positions.revert_to_open(&position.id).await {
                    error!(position_id = %position.id, error = %revert, "Failed to revert position");
                }
                return CloseOutcome::Error(e.to_string());
            }
        }

        let call = self.bridge.close_position(position, reason);
        let result = match timeout(self.config.execution_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ExecutionError::Timeout {
                after_ms: self.config.execution_timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(trade) => self.finish_close(position, reason, trade).await,
            Err(e) => self.handle_close_failure(position, reason, price, e).await,
        }
    }

    async fn confirm_reconciled(&self, position: &Position, entry: TradeLogEntry) -> CloseOutcome {
        let trade = CloseTrade {
            position_id: position.id.clone(),
            exit_price: entry.price,
            quantity: position.quantity,
            executed_at: entry.timestamp,
            venue_order_id: None,
        };
        match self.positions.confirm_closed(&position.id, &trade).await {
            Ok(_) => {
                info!(position_id = %position.id, "Close already logged, confirmed without venue call");
                CloseOutcome::Reconciled
            }
            Err(e) => {
                error!(position_id = %position.id, error = %e, "Failed to confirm logged close");
                CloseOutcome::Error(e.to_string())
            }
        }
    }

    async fn finish_close(
        &self,
        position: &Position,
        reason: CloseReason,
        trade: CloseTrade,
    ) -> CloseOutcome {
        let entry = TradeLogEntry::closed(position, reason, trade.exit_price);
        let pnl = entry.pnl.unwrap_or_default();

        // The venue has closed the position; it must never be retried from here on
        if let Err(e) = self.trade_log.append(entry).await {
            error!(position_id = %position.id, error = %e, "Failed to log CLOSE");
        }

        match self.positions.confirm_closed(&position.id, &trade).await {
            Ok(_) => {
                info!(
                    position_id = %position.id,
                    symbol = %position.symbol,
                    %reason,
                    exit_price = %trade.exit_price,
                    %pnl,
                    "Position closed"
                );
                CloseOutcome::Closed {
                    exit_price: trade.exit_price,
                    pnl,
                }
            }
            Err(e) => {
                error!(position_id = %position.id, error = %e, "Failed to confirm close");
                CloseOutcome::Error(e.to_string())
            }
        }
    }

    async fn handle_close_failure(
        &self,
        position: &Position,
        reason: CloseReason,
        price: Decimal,
        err: ExecutionError,
    ) -> CloseOutcome {
        let attempts = position.close_attempts + 1;

        if !err.is_recoverable() || self.config.retry.is_exhausted(attempts) {
            if let Err(e) = self.positions.mark_failed(&position.id).await {
                error!(position_id = %position.id, error = %e, "Failed to mark position FAILED");
                return CloseOutcome::Error(e.to_string());
            }
            if let Err(e) = self
                .trade_log
                .append(TradeLogEntry::close_failed(position, reason, price))
                .await
            {
                error!(position_id = %position.id, error = %e, "Failed to log CLOSE_FAILED");
            }
            error!(
                position_id = %position.id,
                symbol = %position.symbol,
                %reason,
                attempts,
                error = %err,
                "Close failed permanently, manual action required"
            );
            return CloseOutcome::Failed { attempts };
        }

        match self.positions.revert_to_open(&position.id).await {
            Ok(attempt) => {
                let delay = self.config.retry.delay_for(attempt);
                self.retries.lock().insert(
                    position.id.clone(),
                    ScheduledRetry {
                        reason,
                        last_price: price,
                        due_at: Instant::now() + delay,
                    },
                );
                warn!(
                    position_id = %position.id,
                    %reason,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Close failed, retry scheduled"
                );
                CloseOutcome::RetryScheduled { attempt, delay }
            }
            Err(e) => {
                error!(position_id = %position.id, error = %e, "Failed to revert position");
                CloseOutcome::Error(e.to_string())
            }
        }
    }
}
