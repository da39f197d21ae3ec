//! Stop-loss / take-profit trigger evaluation.

use rust_decimal::Decimal;
use trading_core::types::{Position, TriggerDecision};

use crate::{EffectiveRiskSettings, StopLossStrategy};

/// Pure decision function: (position, current price, effective settings) -> decision.
///
/// Downside protection wins every tie:
/// 1. emergency stop (if enabled) when the loss reaches the emergency threshold
/// 2. stop-loss when the loss reaches the stop-loss threshold
/// 3. take-profit when the gain reaches the take-profit threshold
///
/// All comparisons are inclusive.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskEvaluator;

impl RiskEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a position at `current_price`.
    pub fn evaluate(
        &self,
        position: &Position,
        current_price: Decimal,
        settings: &EffectiveRiskSettings,
    ) -> TriggerDecision {
        let gain = position.gain_percent(current_price);

        if settings.enable_emergency_stop_loss
            && gain <= -settings.emergency_stop_loss_threshold_percent
        {
            return TriggerDecision::EmergencyStop { move_percent: gain };
        }

        let stop_move = match settings.stop_loss_strategy {
            StopLossStrategy::Fixed => gain,
            StopLossStrategy::Trailing => {
                position.move_percent_from(position.reference_peak(), current_price)
            }
        };
        if stop_move <= -settings.stop_loss_percent {
            return TriggerDecision::StopLoss {
                move_percent: stop_move,
            };
        }

        if gain >= settings.take_profit_percent {
            return TriggerDecision::TakeProfit { move_percent: gain };
        }

        TriggerDecision::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RiskSettings, ThresholdSource};
    use rust_decimal_macros::dec;
    use trading_core::types::Direction;

    fn settings(stop_loss: Decimal, take_profit: Decimal) -> EffectiveRiskSettings {
        EffectiveRiskSettings {
            stop_loss_percent: stop_loss,
            stop_loss_source: ThresholdSource::Global,
            take_profit_percent: take_profit,
            take_profit_source: ThresholdSource::Global,
            stop_loss_strategy: StopLossStrategy::Fixed,
            enable_emergency_stop_loss: false,
            emergency_stop_loss_threshold_percent: dec!(15),
        }
    }

    fn btc_long() -> Position {
        Position::open("u1", "BTC", Direction::Long, dec!(70000), dec!(1))
    }

    #[test]
    fn test_take_profit_long() {
        let decision = RiskEvaluator.evaluate(&btc_long(), dec!(77700), &settings(dec!(5), dec!(10)));
        assert_eq!(decision, TriggerDecision::TakeProfit { move_percent: dec!(11) });
    }

    #[test]
    fn test_stop_loss_long() {
        let decision = RiskEvaluator.evaluate(&btc_long(), dec!(65800), &settings(dec!(5), dec!(10)));
        assert_eq!(decision, TriggerDecision::StopLoss { move_percent: dec!(-6) });
    }

    #[test]
    fn test_take_profit_boundary_is_inclusive() {
        let decision = RiskEvaluator.evaluate(&btc_long(), dec!(77000), &settings(dec!(5), dec!(10)));
        assert_eq!(decision, TriggerDecision::TakeProfit { move_percent: dec!(10) });
    }

    #[test]
    fn test_stop_loss_boundary_is_inclusive() {
        let decision = RiskEvaluator.evaluate(&btc_long(), dec!(66500), &settings(dec!(5), dec!(10)));
        assert_eq!(decision, TriggerDecision::StopLoss { move_percent: dec!(-5) });
    }

    #[test]
    fn test_inside_band_is_none() {
        let decision = RiskEvaluator.evaluate(&btc_long(), dec!(71000), &settings(dec!(5), dec!(10)));
        assert_eq!(decision, TriggerDecision::None);
    }

    #[test]
    fn test_emergency_wins_over_stop_loss() {
        let mut s = settings(dec!(5), dec!(10));
        s.enable_emergency_stop_loss = true;
        s.emergency_stop_loss_threshold_percent = dec!(8);

        // Exactly -8%
        let decision = RiskEvaluator.evaluate(&btc_long(), dec!(64400), &s);
        assert_eq!(decision, TriggerDecision::EmergencyStop { move_percent: dec!(-8) });

        // -6% is a plain stop-loss
        let decision = RiskEvaluator.evaluate(&btc_long(), dec!(65800), &s);
        assert!(matches!(decision, TriggerDecision::StopLoss { .. }));
    }

    #[test]
    fn test_emergency_disabled_falls_back_to_stop_loss() {
        let mut s = settings(dec!(5), dec!(10));
        s.emergency_stop_loss_threshold_percent = dec!(8);
        let decision = RiskEvaluator.evaluate(&btc_long(), dec!(63000), &s);
        assert_eq!(decision, TriggerDecision::StopLoss { move_percent: dec!(-10) });
    }

    #[test]
    fn test_overlapping_thresholds_prefer_stop_loss() {
        // A zero stop-loss and zero take-profit both match at the entry price
        let decision = RiskEvaluator.evaluate(&btc_long(), dec!(70000), &settings(dec!(0), dec!(0)));
        assert!(matches!(decision, TriggerDecision::StopLoss { .. }));
    }

    #[test]
    fn test_short_direction() {
        let short = Position::open("u1", "BTC", Direction::Short, dec!(70000), dec!(1));
        let s = settings(dec!(5), dec!(10));

        let decision = RiskEvaluator.evaluate(&short, dec!(63000), &s);
        assert_eq!(decision, TriggerDecision::TakeProfit { move_percent: dec!(10) });

        let decision = RiskEvaluator.evaluate(&short, dec!(73500), &s);
        assert_eq!(decision, TriggerDecision::StopLoss { move_percent: dec!(-5) });
    }

    #[test]
    fn test_trailing_stop_measures_from_peak() {
        let mut position = Position::open("u1", "ETH", Direction::Long, dec!(100), dec!(1));
        position.peak_price = Some(dec!(120));
        let mut s = settings(dec!(5), dec!(50));
        s.stop_loss_strategy = StopLossStrategy::Trailing;

        // 114 is +14% from entry but -5% from the 120 peak
        let decision = RiskEvaluator.evaluate(&position, dec!(114), &s);
        assert_eq!(decision, TriggerDecision::StopLoss { move_percent: dec!(-5) });

        // The same price with a fixed stop does nothing
        s.stop_loss_strategy = StopLossStrategy::Fixed;
        assert_eq!(RiskEvaluator.evaluate(&position, dec!(114), &s), TriggerDecision::None);
    }

    #[test]
    fn test_resolved_settings_end_to_end() {
        let user = RiskSettings {
            enable_emergency_stop_loss: true,
            emergency_stop_loss_threshold_percent: dec!(8),
            ..Default::default()
        };
        let position = btc_long();
        let effective = user.effective_for(&position);
        let decision = RiskEvaluator::new().evaluate(&position, dec!(64400), &effective);
        assert_eq!(decision.close_reason(), Some(trading_core::types::CloseReason::EmergencyStop));
    }
}
