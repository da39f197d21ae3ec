//! Pre-trade limit checks against a user's risk settings.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use trading_core::types::PositionOverrides;

use crate::RiskSettings;

/// Result of a limit check.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitCheck {
    /// Trade allowed
    Allowed,
    /// Trade blocked with reason
    Blocked { reason: String },
    /// Trade allowed but with reduced size
    Reduced { max_size: Decimal, reason: String },
}

impl LimitCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, LimitCheck::Allowed | LimitCheck::Reduced { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, LimitCheck::Blocked { .. })
    }
}

/// A prospective trade and the account context needed to check it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    /// Notional value of the new position
    pub notional: Decimal,
    /// Total portfolio value
    pub portfolio_value: Decimal,
    /// Capital already at risk in open positions (notional x stop-loss)
    pub open_risk: Decimal,
    /// Trades already opened today
    pub trades_today: u32,
    /// Overrides the new position will carry; an enabled stop-loss override
    /// sets the risk taken on it
    #[serde(default)]
    pub overrides: PositionOverrides,
}

/// Check a new trade against `settings`.
pub fn check_new_trade(settings: &RiskSettings, request: &TradeRequest) -> LimitCheck {
    if request.trades_today >= settings.max_trades_per_day {
        return LimitCheck::Blocked {
            reason: format!(
                "Max trades per day reached: {} (limit: {})",
                request.trades_today, settings.max_trades_per_day
            ),
        };
    }

    let stop_loss_pct = match request.overrides.stop_loss() {
        Some(pct) => pct,
        None if settings.enable_global_stop_loss => settings.global_stop_loss_percent,
        None => settings.default_stop_loss_percent,
    };

    let mut max_size = request.notional;
    let mut reason = None;

    if settings.enable_max_position_size && max_size > settings.max_position_size {
        max_size = settings.max_position_size;
        reason = Some(format!(
            "Limited by max position size ({:.2})",
            settings.max_position_size
        ));
    }

    if request.portfolio_value > Decimal::ZERO && stop_loss_pct > Decimal::ZERO {
        let risk_budget =
            request.portfolio_value * settings.max_portfolio_risk_percent / dec!(100);
        let remaining = risk_budget - request.open_risk;
        if remaining <= Decimal::ZERO {
            return LimitCheck::Blocked {
                reason: format!(
                    "Max portfolio risk reached: {:.2}% (limit: {:.2}%)",
                    request.open_risk / request.portfolio_value * dec!(100),
                    settings.max_portfolio_risk_percent
                ),
            };
        }

        let max_by_risk = remaining / (stop_loss_pct / dec!(100));
        if max_size > max_by_risk {
            max_size = max_by_risk;
            reason = Some(format!(
                "Limited by max portfolio risk ({:.2}%)",
                settings.max_portfolio_risk_percent
            ));
        }
    }

    match reason {
        Some(reason) => LimitCheck::Reduced { max_size, reason },
        None => LimitCheck::Allowed,
    }
}
