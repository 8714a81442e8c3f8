//! Parameter-sweep optimization and cross-run analysis.

mod cross;
mod rank;
mod sweep;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::StrategyConfig;

pub use cross::{cross_analyze, group_by_fingerprint, ConfigGroup, Recommendation, RecommendedValue, RunRecord};
pub use rank::{by_survival_then_balance, by_win_rate_then_avg_pnl, rank, RankPolicy, RATE_TIE_BAND};
pub use sweep::{sweep, SWEEP_REPETITIONS};

/// Which parameter grid a sweep walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAxis {
    /// Minimum trigger amounts
    Trigger,
    /// Price-band windows over the observed price support
    PriceRange,
    /// Budget x bet-size combinations crossed with price presets
    BudgetBet,
}

impl std::str::FromStr for SweepAxis {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trigger" => Ok(SweepAxis::Trigger),
            "price-range" | "price_range" | "price" => Ok(SweepAxis::PriceRange),
            "budget-bet" | "budget_bet" | "budget" => Ok(SweepAxis::BudgetBet),
            other => anyhow::bail!(
                "unknown sweep axis '{}', expected trigger | price-range | budget-bet",
                other
            ),
        }
    }
}

/// One evaluated point in a parameter sweep.
///
/// For the deterministic axes `survival_rate` is 1.0 and `runs` is 1; the
/// budget x bet axis averages over repeated randomized runs, so repeated
/// sweeps with the same candidate may legitimately disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationCandidate {
    pub config: StrategyConfig,

    /// Qualifying (committed) trades per run, averaged across repetitions
    pub trade_count: usize,

    /// Percent, 0-100
    pub win_rate: f64,

    pub avg_pnl: Decimal,
    pub total_pnl: Decimal,

    /// Fraction of repetitions that avoided bankruptcy
    pub survival_rate: f64,

    pub avg_final_balance: Decimal,

    /// Simulation repetitions behind the averages
    pub runs: u32,
}
