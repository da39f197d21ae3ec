//! Live monitoring command.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use trading_api::AppState;
use trading_broker::{HttpExecutionBridge, HttpPriceFeed, HttpVenueConfig, PaperExecutionBridge};
use trading_config::{AppConfig, VenueMode};
use trading_core::traits::{ExecutionBridge, PriceFeed};
use trading_data::{InMemoryPositionStore, InMemoryTradeLog};
use trading_monitor::{IntervalTicker, TriggerExecutor};
use trading_risk::RiskSettingsStore;

use super::monitor_config;
use crate::cli::positions::load_positions;
use crate::cli::RunArgs;

pub async fn run(args: RunArgs, config: AppConfig) -> Result<()> {
    let (bridge, feed) = build_venue(&config)?;
    info!(
        mode = ?config.venue.mode,
        base_url = %config.venue.base_url,
        bridge = bridge.name(),
        feed = feed.name(),
        "Venue configured"
    );

    let settings = Arc::new(RiskSettingsStore::new(config.risk_defaults.clone()));
    let trade_log = Arc::new(InMemoryTradeLog::new());
    let executor = Arc::new(TriggerExecutor::new(
        Arc::new(InMemoryPositionStore::new()),
        settings.clone(),
        bridge,
        trade_log.clone(),
        feed,
        monitor_config(&config),
    ));

    if let Some(path) = &args.positions {
        for spec in load_positions(path)? {
            executor
                .register_position(spec.into_position()?)
                .await
                .context("failed to register position")?;
        }
    }

    let bind = args.bind.unwrap_or_else(|| config.api.bind.clone());
    let token = executor.shutdown_token();
    let mut api = tokio::spawn(async move {
        trading_api::serve(&bind, AppState::new(settings, trade_log), async move {
            token.cancelled().await
        })
        .await
    });

    let ticker = IntervalTicker::new(config.monitor.cycle_period());
    let monitor = tokio::spawn(Arc::clone(&executor).run(ticker));

    let api_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            warn!("Received Ctrl+C, initiating graceful shutdown...");
            executor.shutdown().await;
            (&mut api).await
        }
        result = &mut api => {
            error!("API server exited, shutting down monitor");
            executor.shutdown().await;
            result
        }
    };

    monitor.await.context("monitor task panicked")?;
    api_result
        .context("API task panicked")?
        .context("API server failed")?;

    info!("Shutdown complete");
    Ok(())
}

/// Execution bridge and price feed for the configured venue.
///
/// Paper mode quotes from the venue but fills locally.
fn build_venue(config: &AppConfig) -> Result<(Arc<dyn ExecutionBridge>, Arc<dyn PriceFeed>)> {
    let venue = &config.venue;
    let price_timeout = config.monitor.price_timeout();

    match venue.mode {
        VenueMode::Paper => {
            let quotes = HttpVenueConfig::new(venue.base_url.clone()).with_timeout(price_timeout);
            let feed: Arc<dyn PriceFeed> = Arc::new(HttpPriceFeed::new(quotes)?);
            let bridge =
                PaperExecutionBridge::new(Arc::clone(&feed)).with_slippage(venue.slippage_pct);
            Ok((Arc::new(bridge), feed))
        }
        VenueMode::Http => {
            let venue_config = HttpVenueConfig::from_env(&venue.base_url, &venue.api_key_env)
                .context("venue credentials")?;
            let bridge = HttpExecutionBridge::new(
                venue_config
                    .clone()
                    .with_timeout(config.monitor.execution_timeout()),
            )?;
            let feed = HttpPriceFeed::new(venue_config.with_timeout(price_timeout))?;
            Ok((Arc::new(bridge), Arc::new(feed)))
        }
    }
}
