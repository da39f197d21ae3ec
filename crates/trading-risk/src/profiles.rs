//! Built-in risk profiles.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::RiskSettings;

/// A named, read-only bundle of risk parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub stop_loss_percent: Decimal,
    pub take_profit_percent: Decimal,
    pub max_position_size: Decimal,
    pub max_portfolio_risk_percent: Decimal,
}

impl RiskProfile {
    /// Copy this profile's values into `settings`.
    ///
    /// Nothing links the settings back to the profile afterwards.
    pub fn apply_to(&self, settings: &mut RiskSettings) {
        settings.global_stop_loss_percent = self.stop_loss_percent;
        settings.global_take_profit_percent = self.take_profit_percent;
        settings.default_stop_loss_percent = self.stop_loss_percent;
        settings.default_take_profit_percent = self.take_profit_percent;
        settings.max_position_size = self.max_position_size;
        settings.max_portfolio_risk_percent = self.max_portfolio_risk_percent;
        settings.enable_global_stop_loss = true;
        settings.enable_global_take_profit = true;
    }
}

/// The profile catalog.
pub static RISK_PROFILES: [RiskProfile; 5] = [
    RiskProfile {
        name: "conservative",
        description: "Tight stops and small positions for capital preservation",
        stop_loss_percent: dec!(2),
        take_profit_percent: dec!(4),
        max_position_size: dec!(500),
        max_portfolio_risk_percent: dec!(5),
    },
    RiskProfile {
        name: "balanced",
        description: "Moderate stops with a 2:1 reward-to-risk target",
        stop_loss_percent: dec!(5),
        take_profit_percent: dec!(10),
        max_position_size: dec!(1000),
        max_portfolio_risk_percent: dec!(10),
    },
    RiskProfile {
        name: "aggressive",
        description: "Wide stops and large targets for high-volatility trading",
        stop_loss_percent: dec!(10),
        take_profit_percent: dec!(25),
        max_position_size: dec!(5000),
        max_portfolio_risk_percent: dec!(25),
    },
    RiskProfile {
        name: "day-trader",
        description: "Very tight stops and quick profit taking for intraday moves",
        stop_loss_percent: dec!(1.5),
        take_profit_percent: dec!(3),
        max_position_size: dec!(2000),
        max_portfolio_risk_percent: dec!(10),
    },
    RiskProfile {
        name: "swing-trader",
        description: "Room to breathe over multi-day holds",
        stop_loss_percent: dec!(7),
        take_profit_percent: dec!(20),
        max_position_size: dec!(3000),
        max_portfolio_risk_percent: dec!(15),
    },
];

/// Look up a profile by name (case-insensitive).
pub fn find_profile(name: &str) -> Option<&'static RiskProfile> {
    RISK_PROFILES
        .iter()
        .find(|profile| profile.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names() {
        let names: Vec<_> = RISK_PROFILES.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec!["conservative", "balanced", "aggressive", "day-trader", "swing-trader"]
        );
    }

    #[test]
    fn test_find_profile() {
        assert_eq!(find_profile("Balanced").map(|p| p.name), Some("balanced"));
        assert!(find_profile("yolo").is_none());
    }

    #[test]
    fn test_apply_copies_values() {
        let mut settings = RiskSettings {
            enable_global_stop_loss: false,
            ..Default::default()
        };
        let profile = find_profile("day-trader").unwrap();
        profile.apply_to(&mut settings);

        assert_eq!(settings.global_stop_loss_percent, dec!(1.5));
        assert_eq!(settings.default_take_profit_percent, dec!(3));
        assert_eq!(settings.max_position_size, dec!(2000));
        assert!(settings.enable_global_stop_loss);
        // Unrelated fields untouched
        assert_eq!(settings.max_trades_per_day, 10);
    }
}
