//! Route handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;
use trading_core::types::{TradeEvent, TradeLogEntry, TradeLogFilter};
use trading_risk::{RiskProfile, RiskSettings, RiskSettingsUpdate, RISK_PROFILES};

use crate::{ApiError, AppState, AuthUser};

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/risk-settings", get(get_settings).post(update_settings))
        .route("/risk-settings/profile/{name}", post(apply_profile))
        .route("/risk-profiles", get(list_profiles))
        .route("/trade-log", get(trade_log))
        .with_state(state)
}

async fn get_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Json<RiskSettings> {
    Json(state.settings.get(&user_id))
}

async fn update_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<RiskSettingsUpdate>, JsonRejection>,
) -> Result<Json<RiskSettings>, ApiError> {
    let Json(update) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let settings = state.settings.update(&user_id, &update)?;
    Ok(Json(settings))
}

async fn apply_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(name): Path<String>,
) -> Result<Json<RiskSettings>, ApiError> {
    let settings = state.settings.apply_profile(&user_id, &name)?;
    Ok(Json(settings))
}

async fn list_profiles(_user: AuthUser) -> Json<&'static [RiskProfile]> {
    Json(RISK_PROFILES.as_slice())
}

/// Trade log query string. All fields are optional filters.
#[derive(Debug, Default, Deserialize)]
struct TradeLogQuery {
    position_id: Option<String>,
    symbol: Option<String>,
    source: Option<String>,
    event: Option<String>,
}

impl TradeLogQuery {
    fn into_filter(self, user_id: String) -> Result<TradeLogFilter, ApiError> {
        let event = self
            .event
            .map(|raw| raw.parse::<TradeEvent>())
            .transpose()
            .map_err(ApiError::BadRequest)?;

        Ok(TradeLogFilter {
            position_id: self.position_id,
            symbol: self.symbol,
            source: self.source,
            event,
            user_id: Some(user_id),
        })
    }
}

async fn trade_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<TradeLogQuery>, QueryRejection>,
) -> Result<Json<Vec<TradeLogEntry>>, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let filter = query.into_filter(user_id)?;
    let entries = state.trade_log.query(&filter).await?;
    debug!(count = entries.len(), "Trade log queried");
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use trading_core::traits::TradeLog;
    use trading_core::types::{CloseReason, Direction, Position};
    use trading_data::InMemoryTradeLog;
    use trading_risk::RiskSettingsStore;

    fn test_state() -> (AppState, Arc<InMemoryTradeLog>) {
        let log = Arc::new(InMemoryTradeLog::new());
        let state = AppState::new(Arc::new(RiskSettingsStore::default()), log.clone());
        (state, log)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_as(uri: &str, user: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-user-id", user)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, user: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("x-user-id", user)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn full_payload() -> Value {
        json!({
            "global_stop_loss_percent": 3,
            "global_take_profit_percent": 9,
            "max_position_size": 2500,
            "max_portfolio_risk_percent": 15,
            "max_trades_per_day": 8,
            "enable_global_stop_loss": true,
            "enable_global_take_profit": true,
            "enable_max_position_size": false,
            "stop_loss_strategy": "trailing",
            "enable_emergency_stop_loss": true,
            "emergency_stop_loss_threshold_percent": 12,
            "default_stop_loss_percent": 3,
            "default_take_profit_percent": 9
        })
    }

    #[tokio::test]
    async fn test_missing_user_header_is_401() {
        let (state, _) = test_state();
        let request = Request::builder()
            .uri("/risk-settings")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(router(state), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_first_read_returns_defaults() {
        let (state, _) = test_state();
        let (status, body) = send(router(state), get_as("/risk-settings", "alice")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enable_global_stop_loss"], true);
        assert_eq!(body["stop_loss_strategy"], "fixed");
    }

    #[tokio::test]
    async fn test_update_replaces_settings() {
        let (state, _) = test_state();
        let app = router(state);

        let (status, body) =
            send(app.clone(), post_json("/risk-settings", "alice", &full_payload())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stop_loss_strategy"], "trailing");

        let (_, after) = send(app, get_as("/risk-settings", "alice")).await;
        assert_eq!(after, body);
    }

    #[tokio::test]
    async fn test_missing_field_rejected_without_change() {
        let (state, _) = test_state();
        let app = router(state);
        let (_, before) = send(app.clone(), get_as("/risk-settings", "alice")).await;

        let mut payload = full_payload();
        payload
            .as_object_mut()
            .unwrap()
            .remove("max_position_size");
        let (status, body) = send(app.clone(), post_json("/risk-settings", "alice", &payload)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["fields"], json!(["max_position_size"]));

        let (_, after) = send(app, get_as("/risk-settings", "alice")).await;
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_negative_value_rejected() {
        let (state, _) = test_state();
        let mut payload = full_payload();
        payload["global_stop_loss_percent"] = json!(-1);

        let (status, _) = send(router(state), post_json("/risk-settings", "bob", &payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let (state, _) = test_state();
        let request = Request::builder()
            .method("POST")
            .uri("/risk-settings")
            .header("x-user-id", "alice")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(router(state), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_apply_profile_copies_values() {
        let (state, _) = test_state();
        let app = router(state);

        let (status, body) = send(
            app,
            post_json("/risk-settings/profile/conservative", "alice", &json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["global_stop_loss_percent"], json!(dec!(2)));
        assert_eq!(body["max_position_size"], json!(dec!(500)));
    }

    #[tokio::test]
    async fn test_unknown_profile_is_404() {
        let (state, _) = test_state();
        let (status, body) = send(
            router(state),
            post_json("/risk-settings/profile/yolo", "alice", &json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "PROFILE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_lists_profiles() {
        let (state, _) = test_state();
        let (status, body) = send(router(state), get_as("/risk-profiles", "alice")).await;

        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"conservative"));
        assert_eq!(names.len(), RISK_PROFILES.len());
    }

    #[tokio::test]
    async fn test_trade_log_filters_by_caller_and_event() {
        let (state, log) = test_state();
        let mine = Position::open("alice", "BTC", Direction::Long, dec!(100), dec!(1))
            .with_id("p-1");
        let theirs = Position::open("bob", "BTC", Direction::Long, dec!(100), dec!(1))
            .with_id("p-2");

        log.append(TradeLogEntry::opened(&mine)).await.unwrap();
        log.append(TradeLogEntry::closed(&mine, CloseReason::TakeProfit, dec!(110)))
            .await
            .unwrap();
        log.append(TradeLogEntry::opened(&theirs)).await.unwrap();

        let app = router(state);
        let (status, body) = send(app.clone(), get_as("/trade-log", "alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, closes) = send(app.clone(), get_as("/trade-log?event=CLOSE", "alice")).await;
        let closes = closes.as_array().unwrap();
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0]["reason"], "TAKE_PROFIT");

        let (status, _) = send(app, get_as("/trade-log?event=BOGUS", "alice")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
