//! Risk management for position monitoring.
//!
//! Provides the trigger evaluator, per-user risk settings with their override
//! chain, the built-in risk profiles and pre-trade limit checks.

mod evaluator;
mod limits;
mod profiles;
mod settings;
mod settings_store;

pub use evaluator::RiskEvaluator;
pub use limits::{check_new_trade, LimitCheck, TradeRequest};
pub use profiles::{find_profile, RiskProfile, RISK_PROFILES};
pub use settings::{
    EffectiveRiskSettings, RiskSettings, RiskSettingsUpdate, StopLossStrategy, ThresholdSource,
};
pub use settings_store::RiskSettingsStore;
