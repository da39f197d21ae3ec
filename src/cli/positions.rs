//! Position files for `run` and `replay`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use trading_core::types::{Direction, Position, PositionOverrides};

/// A position as written in a positions file.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionSpec {
    /// Generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub overrides: PositionOverrides,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

fn default_source() -> String {
    "manual".to_string()
}

impl PositionSpec {
    /// Build the position, rejecting a non-positive entry price or quantity.
    pub fn into_position(self) -> Result<Position> {
        let position = Position::open(
            self.user_id,
            self.symbol,
            self.direction,
            self.entry_price,
            self.quantity,
        )
        .with_overrides(self.overrides)
        .with_origin(self.source, self.confidence);

        let position = match self.id {
            Some(id) => position.with_id(id),
            None => position,
        };
        position
            .validate()
            .with_context(|| format!("invalid position {}", position.id))?;
        Ok(position)
    }
}

pub fn parse_positions(json: &str) -> Result<Vec<PositionSpec>> {
    serde_json::from_str(json).context("invalid positions file")
}

pub fn load_positions(path: &Path) -> Result<Vec<PositionSpec>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read positions file {}", path.display()))?;
    parse_positions(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_positions() {
        let specs = parse_positions(
            r#"[
                {"id": "p-1", "user_id": "alice", "symbol": "BTC", "direction": "LONG",
                 "entry_price": 100, "quantity": 2,
                 "overrides": {"stop_loss_percent": 2, "use_custom_stop_loss": true}},
                {"user_id": "bob", "symbol": "ETH", "direction": "SHORT",
                 "entry_price": "3000.5", "quantity": 1, "source": "momentum"}
            ]"#,
        )
        .unwrap();

        let first = specs[0].clone().into_position().unwrap();
        assert_eq!(first.id, "p-1");
        assert_eq!(first.overrides.stop_loss(), Some(dec!(2)));
        assert_eq!(first.origin.source, "manual");

        let second = specs[1].clone().into_position().unwrap();
        assert_eq!(second.direction, Direction::Short);
        assert_eq!(second.entry_price, dec!(3000.5));
        assert_eq!(second.origin.source, "momentum");
        assert!(!second.id.is_empty());
    }

    #[test]
    fn test_rejects_non_positive_entry_or_quantity() {
        let specs = parse_positions(
            r#"[
                {"id": "zero-entry", "user_id": "alice", "symbol": "BTC", "direction": "LONG",
                 "entry_price": 0, "quantity": 1},
                {"id": "short-qty", "user_id": "alice", "symbol": "BTC", "direction": "SHORT",
                 "entry_price": 100, "quantity": -1}
            ]"#,
        )
        .unwrap();

        for spec in specs {
            let err = spec.into_position().unwrap_err();
            assert!(err.to_string().starts_with("invalid position"));
        }
    }

    #[test]
    fn test_rejects_missing_fields() {
        assert!(parse_positions(r#"[{"user_id": "alice"}]"#).is_err());
    }
}
