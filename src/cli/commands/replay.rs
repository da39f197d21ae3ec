//! Replay command: run recorded ticks through the monitor with paper fills.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs::File;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};
use trading_broker::PaperExecutionBridge;
use trading_config::AppConfig;
use trading_core::traits::PositionStore;
use trading_core::types::{Position, PositionStatus, PriceTick, TradeLogEntry, TradeLogFilter};
use trading_data::{CsvTickSource, InMemoryPositionStore, InMemoryTradeLog, PriceCache};
use trading_monitor::TriggerExecutor;
use trading_risk::{check_new_trade, LimitCheck, RiskSettingsStore, TradeRequest};

use super::monitor_config;
use crate::cli::positions::load_positions;
use crate::cli::ReplayArgs;

pub async fn run(args: ReplayArgs, config: AppConfig) -> Result<()> {
    let ticks = CsvTickSource::from_path(&args.ticks)
        .with_context(|| format!("failed to load ticks from {}", args.ticks.display()))?
        .into_ticks();
    let specs = load_positions(&args.positions)?;
    info!(ticks = ticks.len(), positions = specs.len(), "Starting replay");

    let cache = Arc::new(PriceCache::new());
    let settings = Arc::new(RiskSettingsStore::new(config.risk_defaults.clone()));
    let store = Arc::new(InMemoryPositionStore::new());
    let trade_log = Arc::new(InMemoryTradeLog::new());
    let bridge = Arc::new(
        PaperExecutionBridge::new(cache.clone()).with_slippage(config.venue.slippage_pct),
    );
    let executor = TriggerExecutor::new(
        store.clone(),
        settings.clone(),
        bridge.clone(),
        trade_log.clone(),
        cache.clone(),
        monitor_config(&config),
    );

    let portfolio_value = Decimal::try_from(args.portfolio_value)
        .context("portfolio value is not a valid decimal")?;
    let mut admission = Admission::new(portfolio_value);
    for spec in specs {
        let position = spec.into_position()?;
        if let Some(position) = admission.admit(&settings, position) {
            executor
                .register_position(position)
                .await
                .context("failed to register position")?;
        }
    }

    let triggered = replay_ticks(&executor, &cache, ticks).await;
    executor.shutdown().await;

    let entries = trade_log.entries();
    let failed = store.positions_with_status(PositionStatus::Failed).await?;
    let open = store.positions_with_status(PositionStatus::Open).await?;

    match args.output.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&entries)?;
            println!("{}", json);
        }
        _ => print_summary(&entries, triggered, bridge.close_count(), &open, &failed),
    }

    if !executor.pending_retries().is_empty() {
        warn!(
            pending = ?executor.pending_retries(),
            "Replay ended with close retries still pending"
        );
    }

    if let Some(path) = &args.export {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let written = trade_log.write_csv(file, &TradeLogFilter::default())?;
        info!(entries = written, path = %path.display(), "Trade log exported");
    }

    Ok(())
}

/// Feed `ticks` through the executor and return how many triggers fired.
///
/// Retry backoff runs on the recorded tick times rather than the wall clock.
/// Retries still pending after the last tick are given up to `max_attempts`
/// more backoff windows to settle.
async fn replay_ticks(
    executor: &TriggerExecutor,
    cache: &PriceCache,
    ticks: Vec<PriceTick>,
) -> usize {
    let origin = Instant::now();
    let first_timestamp = ticks.first().map(|tick| tick.timestamp);
    let mut clock = origin;
    let mut triggered = 0;

    for tick in ticks {
        if let Err(e) = cache.update(tick.clone()) {
            warn!(symbol = %tick.symbol, error = %e, "Skipping tick");
            continue;
        }
        let elapsed = first_timestamp
            .and_then(|first| (tick.timestamp - first).to_std().ok())
            .unwrap_or_default();
        clock = clock.max(origin.checked_add(elapsed).unwrap_or(clock));
        executor.run_due_retries(clock).await;
        if let Some(report) = executor.handle_tick(tick).await {
            triggered += report.triggered;
        }
    }

    let retry = executor.config().retry;
    for _ in 0..retry.max_attempts {
        if executor.pending_retries().is_empty() {
            break;
        }
        clock = clock.max(Instant::now()) + retry.max_delay;
        executor.run_due_retries(clock).await;
    }
    triggered
}

/// Pre-trade limit checks across the positions of one replay.
struct Admission {
    portfolio_value: Decimal,
    trades: HashMap<String, u32>,
    open_risk: HashMap<String, Decimal>,
}

impl Admission {
    fn new(portfolio_value: Decimal) -> Self {
        Self {
            portfolio_value,
            trades: HashMap::new(),
            open_risk: HashMap::new(),
        }
    }

    fn admit(&mut self, settings: &RiskSettingsStore, mut position: Position) -> Option<Position> {
        let user_settings = settings.get(&position.user_id);
        let request = TradeRequest {
            notional: position.notional(),
            portfolio_value: self.portfolio_value,
            open_risk: self
                .open_risk
                .get(&position.user_id)
                .copied()
                .unwrap_or_default(),
            trades_today: self.trades.get(&position.user_id).copied().unwrap_or(0),
            overrides: position.overrides.clone(),
        };

        match check_new_trade(&user_settings, &request) {
            LimitCheck::Allowed => {}
            LimitCheck::Reduced { max_size, reason } => {
                let quantity = max_size / position.entry_price;
                info!(
                    position_id = %position.id,
                    from = %position.quantity,
                    to = %quantity,
                    %reason,
                    "Position size reduced"
                );
                position.quantity = quantity;
            }
            LimitCheck::Blocked { reason } => {
                warn!(position_id = %position.id, %reason, "Position rejected");
                return None;
            }
        }

        let stop_loss = settings.effective_for(&position).stop_loss_percent;
        *self.trades.entry(position.user_id.clone()).or_insert(0) += 1;
        *self
            .open_risk
            .entry(position.user_id.clone())
            .or_insert(Decimal::ZERO) += position.notional() * stop_loss / Decimal::ONE_HUNDRED;
        Some(position)
    }
}

fn print_summary(
    entries: &[TradeLogEntry],
    triggered: usize,
    fills: usize,
    open: &[Position],
    failed: &[Position],
) {
    println!("Replay Summary");
    println!("═══════════════════════════════════════════════════════════");
    println!("  Triggers:          {}", triggered);
    println!("  Closes filled:     {}", fills);
    println!("  Still open:        {}", open.len());
    println!("  Failed:            {}", failed.len());
    println!();
    println!("Trade Log");
    println!("───────────────────────────────────────────────────────────");

    for entry in entries {
        let reason = entry.reason.map(|r| r.to_string()).unwrap_or_default();
        let pnl = entry.pnl.map(|p| format!("{:.2}", p)).unwrap_or_default();
        println!(
            "  {:>3}  {}  {:<12} {:<8} {:<13} {:<15} {:>12} {:>10}",
            entry.id,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.position_id,
            entry.symbol,
            entry.event,
            reason,
            entry.price,
            pnl
        );
    }

    for position in failed {
        println!();
        println!(
            "  FAILED {} ({}) after {} attempts; reset manually once the venue recovers",
            position.id, position.symbol, position.close_attempts
        );
    }
}
