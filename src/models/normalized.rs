//! Normalized trade shape produced by the record normalizer.
//!
//! Raw activity records vary in shape (reported notional vs `size * price`),
//! so the normalizer resolves `notional_amount` once; downstream components
//! never re-derive it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Resolution state of a trade. `Open` means the market outcome is not yet
/// known; transitions are one-way, open to won or lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeOutcome {
    Open,
    Won,
    Lost,
}

impl TradeOutcome {
    /// True once the outcome is known.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, TradeOutcome::Open)
    }
}

/// A deduplicated historical buy, reconciled against closed positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTrade {
    pub asset: String,
    pub condition_id: String,
    pub market_title: String,
    pub outcome_label: String,
    pub slug: Option<String>,

    /// Entry price (0.0 to 1.0)
    pub price: Decimal,

    /// Outcome tokens bought
    pub size: Decimal,

    /// Dollar size of the trader's original trade, computed once
    pub notional_amount: Decimal,

    pub timestamp: DateTime<Utc>,
    pub transaction_hash: String,

    /// Resolution state from the closed-position join (or market status)
    pub outcome: TradeOutcome,

    /// Trader's realized return on the joined position; `None` while open
    pub roi: Option<Decimal>,
}
