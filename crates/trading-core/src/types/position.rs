//! Monitored position types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => -Decimal::ONE,
        }
    }

    /// Whether `candidate` is a better price than `reference` for this direction.
    pub fn is_favorable(&self, candidate: Decimal, reference: Decimal) -> bool {
        match self {
            Direction::Long => candidate > reference,
            Direction::Short => candidate < reference,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Lifecycle status of a monitored position.
///
/// Transitions: `Open -> Closing -> {Closed | Open (retry) | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    #[default]
    Open,
    Closing,
    Closed,
    Failed,
}

impl PositionStatus {
    /// Check whether `self -> next` is an allowed transition.
    pub fn can_transition_to(&self, next: PositionStatus) -> bool {
        matches!(
            (self, next),
            (PositionStatus::Open, PositionStatus::Closing)
                | (PositionStatus::Closing, PositionStatus::Closed)
                | (PositionStatus::Closing, PositionStatus::Open)
                | (PositionStatus::Closing, PositionStatus::Failed)
        )
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionStatus::Open => write!(f, "OPEN"),
            PositionStatus::Closing => write!(f, "CLOSING"),
            PositionStatus::Closed => write!(f, "CLOSED"),
            PositionStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Per-position threshold overrides.
///
/// An override only applies when its `use_custom_*` flag is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionOverrides {
    pub stop_loss_percent: Option<Decimal>,
    pub take_profit_percent: Option<Decimal>,
    pub use_custom_stop_loss: bool,
    pub use_custom_take_profit: bool,
}

impl PositionOverrides {
    /// The stop-loss override, if present and enabled.
    pub fn stop_loss(&self) -> Option<Decimal> {
        self.stop_loss_percent.filter(|_| self.use_custom_stop_loss)
    }

    /// The take-profit override, if present and enabled.
    pub fn take_profit(&self) -> Option<Decimal> {
        self.take_profit_percent.filter(|_| self.use_custom_take_profit)
    }
}

/// Where the position came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionOrigin {
    /// Signal source (strategy name, "manual", "assistant", ...)
    pub source: String,
    /// Signal confidence in [0, 1]
    pub confidence: Option<f64>,
}

/// An open trade being monitored for automatic closing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub status: PositionStatus,
    #[serde(default)]
    pub overrides: PositionOverrides,
    #[serde(default)]
    pub origin: PositionOrigin,
    /// Best price seen since entry; `None` means the entry price.
    #[serde(default)]
    pub peak_price: Option<Decimal>,
    /// Failed close attempts so far.
    #[serde(default)]
    pub close_attempts: u32,
}

impl Position {
    /// Create a new open position with a generated id.
    pub fn open(
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        direction: Direction,
        entry_price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            symbol: symbol.into(),
            direction,
            entry_price,
            quantity,
            opened_at: Utc::now(),
            status: PositionStatus::Open,
            overrides: PositionOverrides::default(),
            origin: PositionOrigin::default(),
            peak_price: None,
            close_attempts: 0,
        }
    }

    /// Use a caller-provided id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set per-position overrides.
    pub fn with_overrides(mut self, overrides: PositionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Set origin metadata.
    pub fn with_origin(mut self, source: impl Into<String>, confidence: Option<f64>) -> Self {
        self.origin = PositionOrigin {
            source: source.into(),
            confidence,
        };
        self
    }

    /// Reject positions the evaluator cannot measure moves for.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.entry_price <= Decimal::ZERO {
            return Err(ValidationError::Invalid(format!(
                "position {}: entry price must be positive, got {}",
                self.id, self.entry_price
            )));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(ValidationError::Invalid(format!(
                "position {}: quantity must be positive, got {}",
                self.id, self.quantity
            )));
        }
        Ok(())
    }

    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    /// Signed percent move from `reference` to `price`, positive when in our favor.
    pub fn move_percent_from(&self, reference: Decimal, price: Decimal) -> Decimal {
        if reference == Decimal::ZERO {
            return Decimal::ZERO;
        }
        (price - reference) / reference * Decimal::ONE_HUNDRED * self.direction.sign()
    }

    /// Signed percent gain from entry.
    pub fn gain_percent(&self, price: Decimal) -> Decimal {
        self.move_percent_from(self.entry_price, price)
    }

    /// Profit or loss if closed at `exit_price`.
    pub fn pnl_at(&self, exit_price: Decimal) -> Decimal {
        (exit_price - self.entry_price) * self.quantity * self.direction.sign()
    }

    /// Best price seen since entry.
    pub fn reference_peak(&self) -> Decimal {
        self.peak_price.unwrap_or(self.entry_price)
    }

    /// Peak price after observing `price`, if it improves on the current one.
    pub fn improved_peak(&self, price: Decimal) -> Option<Decimal> {
        let current = self.reference_peak();
        self.direction
            .is_favorable(price, current)
            .then_some(price)
    }

    /// Notional value at entry.
    pub fn notional(&self) -> Decimal {
        self.entry_price * self.quantity
    }
}
