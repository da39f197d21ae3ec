//! Per-user risk settings and the full-replacement update payload.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use trading_core::error::ValidationError;
use trading_core::types::Position;

/// How the stop-loss move is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopLossStrategy {
    /// Measured from the entry price
    #[default]
    Fixed,
    /// Measured from the best price seen since entry
    Trailing,
}

/// A user's global risk configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSettings {
    pub global_stop_loss_percent: Decimal,
    pub global_take_profit_percent: Decimal,
    pub max_position_size: Decimal,
    pub max_portfolio_risk_percent: Decimal,
    pub max_trades_per_day: u32,
    pub enable_global_stop_loss: bool,
    pub enable_global_take_profit: bool,
    pub enable_max_position_size: bool,
    pub stop_loss_strategy: StopLossStrategy,
    pub enable_emergency_stop_loss: bool,
    pub emergency_stop_loss_threshold_percent: Decimal,
    pub default_stop_loss_percent: Decimal,
    pub default_take_profit_percent: Decimal,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            global_stop_loss_percent: dec!(5),
            global_take_profit_percent: dec!(10),
            max_position_size: dec!(1000),
            max_portfolio_risk_percent: dec!(20),
            max_trades_per_day: 10,
            enable_global_stop_loss: true,
            enable_global_take_profit: true,
            enable_max_position_size: false,
            stop_loss_strategy: StopLossStrategy::Fixed,
            enable_emergency_stop_loss: true,
            emergency_stop_loss_threshold_percent: dec!(15),
            default_stop_loss_percent: dec!(5),
            default_take_profit_percent: dec!(10),
        }
    }
}

/// Which layer an effective threshold was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSource {
    Position,
    Global,
    Default,
}

/// Thresholds actually applied to one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveRiskSettings {
    pub stop_loss_percent: Decimal,
    pub stop_loss_source: ThresholdSource,
    pub take_profit_percent: Decimal,
    pub take_profit_source: ThresholdSource,
    pub stop_loss_strategy: StopLossStrategy,
    pub enable_emergency_stop_loss: bool,
    pub emergency_stop_loss_threshold_percent: Decimal,
}

impl RiskSettings {
    /// Resolve the effective thresholds for a position:
    /// per-position override if enabled, else global if enabled, else default.
    pub fn effective_for(&self, position: &Position) -> EffectiveRiskSettings {
        let (stop_loss_percent, stop_loss_source) = match position.overrides.stop_loss() {
            Some(pct) => (pct, ThresholdSource::Position),
            None if self.enable_global_stop_loss => {
                (self.global_stop_loss_percent, ThresholdSource::Global)
            }
            None => (self.default_stop_loss_percent, ThresholdSource::Default),
        };

        let (take_profit_percent, take_profit_source) = match position.overrides.take_profit() {
            Some(pct) => (pct, ThresholdSource::Position),
            None if self.enable_global_take_profit => {
                (self.global_take_profit_percent, ThresholdSource::Global)
            }
            None => (self.default_take_profit_percent, ThresholdSource::Default),
        };

        EffectiveRiskSettings {
            stop_loss_percent,
            stop_loss_source,
            take_profit_percent,
            take_profit_source,
            stop_loss_strategy: self.stop_loss_strategy,
            enable_emergency_stop_loss: self.enable_emergency_stop_loss,
            emergency_stop_loss_threshold_percent: self.emergency_stop_loss_threshold_percent,
        }
    }
}

/// Wire form of a full settings replacement.
///
/// Every field is optional here so that all missing fields can be reported at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettingsUpdate {
    pub global_stop_loss_percent: Option<Decimal>,
    pub global_take_profit_percent: Option<Decimal>,
    pub max_position_size: Option<Decimal>,
    pub max_portfolio_risk_percent: Option<Decimal>,
    pub max_trades_per_day: Option<i64>,
    pub enable_global_stop_loss: Option<bool>,
    pub enable_global_take_profit: Option<bool>,
    pub enable_max_position_size: Option<bool>,
    pub stop_loss_strategy: Option<StopLossStrategy>,
    pub enable_emergency_stop_loss: Option<bool>,
    pub emergency_stop_loss_threshold_percent: Option<Decimal>,
    pub default_stop_loss_percent: Option<Decimal>,
    pub default_take_profit_percent: Option<Decimal>,
}

impl From<&RiskSettings> for RiskSettingsUpdate {
    fn from(settings: &RiskSettings) -> Self {
        Self {
            global_stop_loss_percent: Some(settings.global_stop_loss_percent),
            global_take_profit_percent: Some(settings.global_take_profit_percent),
            max_position_size: Some(settings.max_position_size),
            max_portfolio_risk_percent: Some(settings.max_portfolio_risk_percent),
            max_trades_per_day: Some(i64::from(settings.max_trades_per_day)),
            enable_global_stop_loss: Some(settings.enable_global_stop_loss),
            enable_global_take_profit: Some(settings.enable_global_take_profit),
            enable_max_position_size: Some(settings.enable_max_position_size),
            stop_loss_strategy: Some(settings.stop_loss_strategy),
            enable_emergency_stop_loss: Some(settings.enable_emergency_stop_loss),
            emergency_stop_loss_threshold_percent: Some(
                settings.emergency_stop_loss_threshold_percent,
            ),
            default_stop_loss_percent: Some(settings.default_stop_loss_percent),
            default_take_profit_percent: Some(settings.default_take_profit_percent),
        }
    }
}

/// Collects missing and negative numeric fields while validating.
struct FieldCheck {
    missing: Vec<String>,
    negative: Option<ValidationError>,
}

impl FieldCheck {
    fn new() -> Self {
        Self {
            missing: Vec::new(),
            negative: None,
        }
    }

    fn decimal(&mut self, name: &str, value: Option<Decimal>) -> Decimal {
        match value {
            None => {
                self.missing.push(name.to_string());
                Decimal::ZERO
            }
            Some(v) if v < Decimal::ZERO => {
                self.negative.get_or_insert(ValidationError::Negative {
                    field: name.to_string(),
                    value: v.to_string(),
                });
                Decimal::ZERO
            }
            Some(v) => v,
        }
    }

    fn count(&mut self, name: &str, value: Option<i64>) -> u32 {
        match value {
            None => {
                self.missing.push(name.to_string());
                0
            }
            Some(v) if v < 0 => {
                self.negative.get_or_insert(ValidationError::Negative {
                    field: name.to_string(),
                    value: v.to_string(),
                });
                0
            }
            Some(v) => u32::try_from(v).unwrap_or(u32::MAX),
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if !self.missing.is_empty() {
            return Err(ValidationError::MissingFields(self.missing));
        }
        match self.negative {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl RiskSettingsUpdate {
    /// Validate into complete settings.
    ///
    /// All numeric fields are required and must be non-negative. Missing flags and
    /// the strategy take the documented defaults.
    pub fn validate(&self) -> Result<RiskSettings, ValidationError> {
        let defaults = RiskSettings::default();
        let mut check = FieldCheck::new();

        let settings = RiskSettings {
            global_stop_loss_percent: check
                .decimal("global_stop_loss_percent", self.global_stop_loss_percent),
            global_take_profit_percent: check
                .decimal("global_take_profit_percent", self.global_take_profit_percent),
            max_position_size: check.decimal("max_position_size", self.max_position_size),
            max_portfolio_risk_percent: check
                .decimal("max_portfolio_risk_percent", self.max_portfolio_risk_percent),
            max_trades_per_day: check.count("max_trades_per_day", self.max_trades_per_day),
            enable_global_stop_loss: self
                .enable_global_stop_loss
                .unwrap_or(defaults.enable_global_stop_loss),
            enable_global_take_profit: self
                .enable_global_take_profit
                .unwrap_or(defaults.enable_global_take_profit),
            enable_max_position_size: self
                .enable_max_position_size
                .unwrap_or(defaults.enable_max_position_size),
            stop_loss_strategy: self.stop_loss_strategy.unwrap_or(defaults.stop_loss_strategy),
            enable_emergency_stop_loss: self
                .enable_emergency_stop_loss
                .unwrap_or(defaults.enable_emergency_stop_loss),
            emergency_stop_loss_threshold_percent: check.decimal(
                "emergency_stop_loss_threshold_percent",
                self.emergency_stop_loss_threshold_percent,
            ),
            default_stop_loss_percent: check
                .decimal("default_stop_loss_percent", self.default_stop_loss_percent),
            default_take_profit_percent: check
                .decimal("default_take_profit_percent", self.default_take_profit_percent),
        };

        check.finish()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::types::{Direction, PositionOverrides};

    fn position() -> Position {
        Position::open("u1", "BTC", Direction::Long, dec!(70000), dec!(1))
    }

    #[test]
    fn test_effective_uses_global_when_enabled() {
        let settings = RiskSettings::default();
        let effective = settings.effective_for(&position());
        assert_eq!(effective.stop_loss_percent, dec!(5));
        assert_eq!(effective.stop_loss_source, ThresholdSource::Global);
        assert_eq!(effective.take_profit_source, ThresholdSource::Global);
    }

    #[test]
    fn test_effective_falls_back_to_default() {
        let settings = RiskSettings {
            enable_global_stop_loss: false,
            enable_global_take_profit: false,
            global_stop_loss_percent: dec!(1),
            default_stop_loss_percent: dec!(4),
            default_take_profit_percent: dec!(12),
            ..Default::default()
        };
        let effective = settings.effective_for(&position());
        assert_eq!(effective.stop_loss_percent, dec!(4));
        assert_eq!(effective.stop_loss_source, ThresholdSource::Default);
        assert_eq!(effective.take_profit_percent, dec!(12));
        assert_eq!(effective.take_profit_source, ThresholdSource::Default);
    }

    #[test]
    fn test_effective_prefers_enabled_position_override() {
        let settings = RiskSettings::default();
        let overridden = position().with_overrides(PositionOverrides {
            stop_loss_percent: Some(dec!(2)),
            take_profit_percent: Some(dec!(30)),
            use_custom_stop_loss: true,
            use_custom_take_profit: false,
        });
        let effective = settings.effective_for(&overridden);
        assert_eq!(effective.stop_loss_percent, dec!(2));
        assert_eq!(effective.stop_loss_source, ThresholdSource::Position);
        // Override present but not enabled
        assert_eq!(effective.take_profit_percent, dec!(10));
        assert_eq!(effective.take_profit_source, ThresholdSource::Global);
    }

    #[test]
    fn test_validate_complete_update() {
        let update = RiskSettingsUpdate::from(&RiskSettings::default());
        assert_eq!(update.validate().unwrap(), RiskSettings::default());
    }

    #[test]
    fn test_validate_reports_every_missing_field() {
        let mut update = RiskSettingsUpdate::from(&RiskSettings::default());
        update.max_position_size = None;
        update.max_trades_per_day = None;

        match update.validate() {
            Err(ValidationError::MissingFields(fields)) => {
                assert_eq!(fields, vec!["max_position_size", "max_trades_per_day"]);
            }
            other => panic!("Expected MissingFields, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_negative() {
        let mut update = RiskSettingsUpdate::from(&RiskSettings::default());
        update.global_stop_loss_percent = Some(dec!(-1));
        assert!(matches!(
            update.validate(),
            Err(ValidationError::Negative { ref field, .. }) if field == "global_stop_loss_percent"
        ));
    }

    #[test]
    fn test_missing_flags_take_defaults() {
        let mut update = RiskSettingsUpdate::from(&RiskSettings::default());
        update.enable_global_stop_loss = None;
        update.stop_loss_strategy = None;
        let settings = update.validate().unwrap();
        assert!(settings.enable_global_stop_loss);
        assert_eq!(settings.stop_loss_strategy, StopLossStrategy::Fixed);
    }
}
