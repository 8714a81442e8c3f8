//! Strategy configuration for a simulation run.

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Parameters of a copy-trading strategy.
///
/// Two configs are the same configuration iff all five scalar fields are
/// equal; that equality (and `Hash`) is the grouping fingerprint used by
/// cross-run analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    /// Starting bankroll in USDC
    pub initial_budget: Decimal,

    /// Dollars committed per copied trade
    pub fixed_bet_amount: Decimal,

    /// Minimum dollar size of the trader's original trade to copy it
    pub min_trigger_amount: Decimal,

    /// Lower bound of the copyable price band (inclusive)
    pub min_price: Decimal,

    /// Upper bound of the copyable price band (inclusive)
    pub max_price: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            initial_budget: dec!(1000),
            fixed_bet_amount: dec!(10),
            min_trigger_amount: Decimal::ZERO,
            min_price: Decimal::ZERO,
            max_price: Decimal::ONE,
        }
    }
}

impl StrategyConfig {
    /// Reject invalid parameters before any simulation runs. Nothing is
    /// silently clamped.
    pub fn validate(&self) -> Result<()> {
        if self.initial_budget <= Decimal::ZERO {
            bail!("initial budget must be positive, got {}", self.initial_budget);
        }
        if self.fixed_bet_amount <= Decimal::ZERO {
            bail!(
                "fixed bet amount must be positive, got {}",
                self.fixed_bet_amount
            );
        }
        if self.min_trigger_amount < Decimal::ZERO {
            bail!(
                "minimum trigger amount must be non-negative, got {}",
                self.min_trigger_amount
            );
        }
        if self.min_price < Decimal::ZERO || self.max_price > Decimal::ONE {
            bail!(
                "price band [{}, {}] is outside [0, 1]",
                self.min_price,
                self.max_price
            );
        }
        if self.min_price >= self.max_price {
            bail!(
                "price band is inverted or empty: min {} >= max {}",
                self.min_price,
                self.max_price
            );
        }
        Ok(())
    }

    /// Display form of the grouping fingerprint.
    pub fn fingerprint(&self) -> String {
        format!(
            "budget={} bet={} trigger={} price=[{},{}]",
            self.initial_budget,
            self.fixed_bet_amount,
            self.min_trigger_amount,
            self.min_price,
            self.max_price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_budget_and_bet() {
        let mut config = StrategyConfig::default();
        config.initial_budget = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = StrategyConfig::default();
        config.fixed_bet_amount = dec!(-5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_price_band() {
        let mut config = StrategyConfig::default();
        config.min_price = dec!(0.8);
        config.max_price = dec!(0.2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fingerprint_equality_is_field_equality() {
        let a = StrategyConfig::default();
        let mut b = StrategyConfig::default();
        assert_eq!(a, b);

        b.min_trigger_amount = dec!(50);
        assert_ne!(a, b);
    }
}
