//! REST venue integration: close execution and price lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use trading_core::error::{ExecutionError, FeedError};
use trading_core::traits::{ExecutionBridge, PriceFeed};
use trading_core::types::{CloseReason, CloseTrade, Direction, Position, PriceTick};

/// Venue connection settings.
#[derive(Debug, Clone)]
pub struct HttpVenueConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl HttpVenueConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Read the API key from the environment variable `api_key_env`.
    pub fn from_env(base_url: &str, api_key_env: &str) -> Result<Self, ExecutionError> {
        let api_key = std::env::var(api_key_env)
            .map_err(|_| ExecutionError::Configuration(format!("{} not set", api_key_env)))?;
        Ok(Self::new(base_url).with_api_key(api_key))
    }

    fn build_client(&self) -> Result<Client, ExecutionError> {
        let mut headers = header::HeaderMap::new();
        if let Some(key) = &self.api_key {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| ExecutionError::Configuration(e.to_string()))?,
            );
        }

        Client::builder()
            .default_headers(headers)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| ExecutionError::Configuration(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct CloseRequest<'a> {
    symbol: &'a str,
    direction: Direction,
    quantity: Decimal,
    reason: CloseReason,
}

/// `{success, trade?, error?}` response to a close request.
#[derive(Debug, Deserialize)]
struct CloseEnvelope {
    success: bool,
    #[serde(default)]
    trade: Option<VenueTrade>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VenueTrade {
    exit_price: Decimal,
    #[serde(default)]
    quantity: Option<Decimal>,
    #[serde(default)]
    executed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceQuote {
    price: Decimal,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

impl CloseEnvelope {
    fn into_trade(self, position: &Position) -> Result<CloseTrade, ExecutionError> {
        if !self.success {
            return Err(ExecutionError::Rejected(
                self.error.unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        let trade = self
            .trade
            .ok_or_else(|| ExecutionError::Api("successful close without trade".to_string()))?;

        Ok(CloseTrade {
            position_id: position.id.clone(),
            exit_price: trade.exit_price,
            quantity: trade.quantity.unwrap_or(position.quantity),
            executed_at: trade.executed_at.unwrap_or_else(Utc::now),
            venue_order_id: trade.order_id,
        })
    }
}

fn status_error(status: StatusCode, body: String, position_id: &str) -> ExecutionError {
    match status {
        StatusCode::NOT_FOUND => ExecutionError::PositionNotFound(position_id.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ExecutionError::Configuration(format!("{}: {}", status, body))
        }
        s if s.is_client_error() => ExecutionError::Rejected(format!("{}: {}", status, body)),
        _ => ExecutionError::Api(format!("{}: {}", status, body)),
    }
}

/// Closes positions through a REST venue.
pub struct HttpExecutionBridge {
    config: HttpVenueConfig,
    client: Client,
}

impl HttpExecutionBridge {
    pub fn new(config: HttpVenueConfig) -> Result<Self, ExecutionError> {
        let client = config.build_client()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ExecutionBridge for HttpExecutionBridge {
    async fn close_position(
        &self,
        position: &Position,
        reason: CloseReason,
    ) -> Result<CloseTrade, ExecutionError> {
        let url = format!("{}/v1/positions/{}/close", self.config.base_url, position.id);
        let body = CloseRequest {
            symbol: &position.symbol,
            direction: position.direction,
            quantity: position.quantity,
            reason,
        };

        debug!(position_id = %position.id, %url, "Sending close request");

        let resp = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                ExecutionError::Timeout {
                    after_ms: self.config.request_timeout.as_millis() as u64,
                }
            } else {
                ExecutionError::Connection(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(position_id = %position.id, %status, "Venue refused close");
            return Err(status_error(status, text, &position.id));
        }

        let envelope: CloseEnvelope = resp
            .json()
            .await
            .map_err(|e| ExecutionError::Api(e.to_string()))?;
        let trade = envelope.into_trade(position)?;

        info!(
            position_id = %position.id,
            %reason,
            exit_price = %trade.exit_price,
            "Venue confirmed close"
        );
        Ok(trade)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Latest prices from the same REST venue.
pub struct HttpPriceFeed {
    config: HttpVenueConfig,
    client: Client,
}

impl HttpPriceFeed {
    pub fn new(config: HttpVenueConfig) -> Result<Self, ExecutionError> {
        let client = config.build_client()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl PriceFeed for HttpPriceFeed {
    async fn get_price(&self, symbol: &str) -> Result<PriceTick, FeedError> {
        let url = format!("{}/v1/prices/{}", self.config.base_url, symbol);

        let resp = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::Timeout {
                    after_ms: self.config.request_timeout.as_millis() as u64,
                }
            } else {
                FeedError::Connection(e.to_string())
            }
        })?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(FeedError::SymbolNotFound(symbol.to_string())),
            s if !s.is_success() => {
                let text = resp.text().await.unwrap_or_default();
                return Err(FeedError::Connection(format!("{}: {}", s, text)));
            }
            _ => {}
        }

        let quote: PriceQuote = resp
            .json()
            .await
            .map_err(|e| FeedError::Parse(e.to_string()))?;

        Ok(PriceTick::new(
            symbol,
            quote.price,
            quote.timestamp.unwrap_or_else(Utc::now),
        ))
    }

    fn name(&self) -> &str {
        "http"
    }
}
