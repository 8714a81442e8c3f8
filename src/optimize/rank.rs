//! Named ranking policies for sweep candidates.
//!
//! Every axis ranks by a two-tier comparator: a primary rate descending,
//! with ties inside a 2-percentage-point band broken by a secondary dollar
//! metric descending. The policies live here, separate from the sweep
//! loop, so they can be unit-tested in isolation.

use std::cmp::Ordering;

use super::OptimizationCandidate;

/// Win (or survival) rates closer than this are treated as a tie.
pub const RATE_TIE_BAND: f64 = 2.0;

/// Pairwise ranking policy; `Less` means "ranks earlier".
pub type RankPolicy = fn(&OptimizationCandidate, &OptimizationCandidate) -> Ordering;

/// Win rate descending; ties within the band broken by average P&L
/// descending. Used by the trigger and price-range axes.
pub fn by_win_rate_then_avg_pnl(a: &OptimizationCandidate, b: &OptimizationCandidate) -> Ordering {
    two_tier(a.win_rate, b.win_rate, || b.avg_pnl.cmp(&a.avg_pnl))
}

/// Survival rate descending; ties within the band broken by average final
/// balance descending. Used by the budget x bet axis.
pub fn by_survival_then_balance(a: &OptimizationCandidate, b: &OptimizationCandidate) -> Ordering {
    two_tier(a.survival_rate * 100.0, b.survival_rate * 100.0, || {
        b.avg_final_balance.cmp(&a.avg_final_balance)
    })
}

fn two_tier(rate_a: f64, rate_b: f64, tie_break: impl Fn() -> Ordering) -> Ordering {
    if (rate_a - rate_b).abs() < RATE_TIE_BAND {
        tie_break()
    } else {
        rate_b.partial_cmp(&rate_a).unwrap_or(Ordering::Equal)
    }
}

/// Order candidates best-first under a pairwise policy.
///
/// The tie-band comparator is not a total order, so the std sorts (which
/// may detect the inconsistency and panic) are off the table; a stable
/// insertion sort applies the pairwise policy directly.
pub fn rank(mut candidates: Vec<OptimizationCandidate>, policy: RankPolicy) -> Vec<OptimizationCandidate> {
    for i in 1..candidates.len() {
        let mut j = i;
        while j > 0 && policy(&candidates[j], &candidates[j - 1]) == Ordering::Less {
            candidates.swap(j, j - 1);
            j -= 1;
        }
    }
    candidates
}
