//! List risk profiles command.

use anyhow::Result;
use trading_risk::RISK_PROFILES;

pub fn run() -> Result<()> {
    println!("Risk Profiles");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for profile in RISK_PROFILES.iter() {
        println!("  {} ", profile.name);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", profile.description);
        println!(
            "  SL {}%  TP {}%  max size {}  max portfolio risk {}%",
            profile.stop_loss_percent,
            profile.take_profit_percent,
            profile.max_position_size,
            profile.max_portfolio_risk_percent
        );
        println!();
    }

    println!("Apply one with POST /risk-settings/profile/<name>.");

    Ok(())
}
