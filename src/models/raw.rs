//! Wire-shaped records from the upstream market-data API.
//!
//! These mirror the JSON the data layer hands us: trader activity,
//! closed positions, and market status lookups. Fetching them is the
//! caller's problem; everything here is plain data.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// An executed buy or sell event from a trader's activity history.
///
/// The same trade can appear in multiple paginated fetches, so identity
/// for deduplication is `(transaction_hash, asset, outcome_index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrade {
    /// Activity record type; only "TRADE" records are simulated
    #[serde(rename = "type", default = "default_activity_type")]
    pub activity_type: String,

    pub side: TradeSide,

    /// Outcome token identifier
    #[serde(default)]
    pub asset: String,

    /// Market condition ID
    pub condition_id: String,

    /// Price per token in USDC (0.0 to 1.0, probability-denominated)
    pub price: Decimal,

    /// Number of outcome tokens traded
    #[serde(default)]
    pub size: Decimal,

    /// Dollar notional reported by the API, when present
    #[serde(default)]
    pub usdc_size: Option<Decimal>,

    /// Seconds since epoch
    pub timestamp: i64,

    #[serde(default)]
    pub transaction_hash: String,

    #[serde(default)]
    pub title: String,

    /// Outcome label being traded (e.g., "Yes", "No")
    #[serde(default)]
    pub outcome: String,

    #[serde(default)]
    pub outcome_index: i32,

    #[serde(default)]
    pub slug: Option<String>,
}

fn default_activity_type() -> String {
    "TRADE".to_string()
}

impl RawTrade {
    /// Identity key for deduplication across paginated fetches.
    pub fn dedup_key(&self) -> (String, String, i32) {
        (
            self.transaction_hash.clone(),
            self.asset.clone(),
            self.outcome_index,
        )
    }

    /// Dollar size of the trader's original trade: the reported notional
    /// when present and positive, otherwise `size * price`.
    pub fn notional(&self) -> Decimal {
        match self.usdc_size {
            Some(amount) if amount > Decimal::ZERO => amount,
            _ => self.size * self.price,
        }
    }

    /// True for BUY-side TRADE activity records.
    pub fn is_copyable_buy(&self) -> bool {
        self.side == TradeSide::Buy && self.activity_type.eq_ignore_ascii_case("TRADE")
    }
}

/// Realized outcome of a position the trader fully exited or that resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedPosition {
    #[serde(default)]
    pub asset: String,

    pub condition_id: String,

    #[serde(default)]
    pub avg_price: Decimal,

    #[serde(default)]
    pub total_bought: Decimal,

    /// Signed dollar P&L; positive means the position won
    pub realized_pnl: Decimal,

    /// Close time, seconds since epoch
    pub timestamp: i64,

    #[serde(default)]
    pub slug: Option<String>,
}

impl ClosedPosition {
    /// Win predicate: strictly positive realized P&L. Zero counts as a
    /// loss by policy.
    pub fn won(&self) -> bool {
        self.realized_pnl > Decimal::ZERO
    }

    /// Realized return on cost basis, guarded to 0 on a zero denominator.
    pub fn roi(&self) -> Decimal {
        let cost = self.total_bought * self.avg_price;
        if cost.is_zero() {
            Decimal::ZERO
        } else {
            self.realized_pnl / cost
        }
    }
}

/// Market status from the markets endpoint, used only to classify trades
/// with no matching closed position as resolved-without-sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStatus {
    #[serde(default)]
    pub condition_id: String,

    #[serde(default)]
    pub slug: Option<String>,

    pub closed: bool,

    #[serde(default)]
    pub active: bool,

    #[serde(default)]
    pub outcomes: Vec<MarketOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOutcome {
    pub outcome: String,
    #[serde(default)]
    pub winner: bool,
}

impl MarketStatus {
    /// Label of the winning outcome, if the market has resolved one.
    pub fn winning_outcome(&self) -> Option<&str> {
        self.outcomes
            .iter()
            .find(|o| o.winner)
            .map(|o| o.outcome.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_trade() -> RawTrade {
        RawTrade {
            activity_type: "TRADE".to_string(),
            side: TradeSide::Buy,
            asset: "token-1".to_string(),
            condition_id: "0xabc".to_string(),
            price: dec!(0.40),
            size: dec!(100),
            usdc_size: None,
            timestamp: 1_700_000_000,
            transaction_hash: "0xtx".to_string(),
            title: "Test Market".to_string(),
            outcome: "Yes".to_string(),
            outcome_index: 0,
            slug: Some("test-market".to_string()),
        }
    }

    #[test]
    fn test_notional_falls_back_to_size_times_price() {
        let trade = make_trade();
        assert_eq!(trade.notional(), dec!(40));

        let mut with_amount = make_trade();
        with_amount.usdc_size = Some(dec!(55));
        assert_eq!(with_amount.notional(), dec!(55));

        // Zero reported notional is unusable, fall back
        let mut zero_amount = make_trade();
        zero_amount.usdc_size = Some(Decimal::ZERO);
        assert_eq!(zero_amount.notional(), dec!(40));
    }

    #[test]
    fn test_closed_position_roi_guards_zero_cost() {
        let pos = ClosedPosition {
            asset: "token-1".to_string(),
            condition_id: "0xabc".to_string(),
            avg_price: Decimal::ZERO,
            total_bought: Decimal::ZERO,
            realized_pnl: dec!(10),
            timestamp: 0,
            slug: None,
        };
        assert_eq!(pos.roi(), Decimal::ZERO);
        assert!(pos.won());
    }

    #[test]
    fn test_zero_pnl_counts_as_loss() {
        let pos = ClosedPosition {
            asset: "token-1".to_string(),
            condition_id: "0xabc".to_string(),
            avg_price: dec!(0.5),
            total_bought: dec!(100),
            realized_pnl: Decimal::ZERO,
            timestamp: 0,
            slug: None,
        };
        assert!(!pos.won());
        assert_eq!(pos.roi(), Decimal::ZERO);
    }
}
