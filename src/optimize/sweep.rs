//! Grid search over strategy parameters.
//!
//! Each axis generates its candidate grid, replays the trade history per
//! candidate, drops candidates with too few qualifying trades, and ranks
//! survivors under the axis's two-tier policy.

use anyhow::Result;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::models::{NormalizedTrade, StrategyConfig};
use crate::sim::{simulate, OutcomeSampler};
use crate::stats::aggregate;

use super::rank::{by_survival_then_balance, by_win_rate_then_avg_pnl, rank};
use super::{OptimizationCandidate, SweepAxis};

/// Randomized repetitions per budget x bet candidate; variance across
/// repetitions is modeled, not averaged away by determinism.
pub const SWEEP_REPETITIONS: u32 = 3;

const BUDGETS: [Decimal; 5] = [dec!(500), dec!(1000), dec!(2000), dec!(3000), dec!(5000)];
const BETS: [Decimal; 5] = [dec!(10), dec!(25), dec!(50), dec!(100), dec!(200)];

/// A bet larger than this fraction of the budget is rejected outright.
const MAX_BET_TO_BUDGET: Decimal = dec!(0.20);

const PRICE_PRESETS: [(Decimal, Decimal); 4] = [
    (dec!(0), dec!(1)),
    (dec!(0.05), dec!(0.95)),
    (dec!(0.2), dec!(0.8)),
    (dec!(0.4), dec!(0.6)),
];

/// Walk the candidate grid for `axis` and return the ranked survivors,
/// best first. Candidates with fewer than `min_sample` qualifying trades
/// are discarded (insufficient data, distinct from "no improvement").
///
/// Only the budget x bet axis consumes random draws; the trigger and
/// price-range axes are deterministic.
pub fn sweep(
    trades: &[NormalizedTrade],
    axis: SweepAxis,
    min_sample: usize,
    sampler: &mut OutcomeSampler,
) -> Result<Vec<OptimizationCandidate>> {
    let candidates = match axis {
        SweepAxis::Trigger => sweep_trigger(trades, min_sample)?,
        SweepAxis::PriceRange => sweep_price_range(trades, min_sample)?,
        SweepAxis::BudgetBet => sweep_budget_bet(trades, min_sample, sampler)?,
    };

    info!(
        axis = ?axis,
        survivors = candidates.len(),
        "Sweep complete"
    );

    let policy = match axis {
        SweepAxis::BudgetBet => by_survival_then_balance,
        _ => by_win_rate_then_avg_pnl,
    };
    Ok(rank(candidates, policy))
}

/// Candidate minimum trigger amounts: dense near zero, sparse at the top.
fn trigger_candidates() -> Vec<Decimal> {
    let mut candidates: Vec<Decimal> = (0..=20).map(Decimal::from).collect();
    candidates.extend((3..=10).map(|t| Decimal::from(t * 10)));
    candidates.extend([dec!(150), dec!(200), dec!(300), dec!(500), dec!(1000)]);
    candidates
}

fn sweep_trigger(
    trades: &[NormalizedTrade],
    min_sample: usize,
) -> Result<Vec<OptimizationCandidate>> {
    let mut survivors = Vec::new();
    for trigger in trigger_candidates() {
        let mut config = stats_config(trades);
        config.min_trigger_amount = trigger;

        if let Some(candidate) = evaluate_deterministic(trades, config, min_sample)? {
            survivors.push(candidate);
        }
    }
    Ok(survivors)
}

/// Price windows of width >= 0.10 slid in 0.01 increments across the
/// observed price support, not the whole [0, 1] domain.
fn price_windows(trades: &[NormalizedTrade]) -> Vec<(Decimal, Decimal)> {
    let mut low_cents = 100i64;
    let mut high_cents = 0i64;
    for trade in trades {
        let cents = (trade.price * dec!(100)).to_i64().unwrap_or(0);
        low_cents = low_cents.min(cents);
        high_cents = high_cents.max(cents);
    }
    if high_cents <= low_cents {
        return Vec::new();
    }
    low_cents = low_cents.max(0);
    high_cents = high_cents.min(100);

    let mut windows = Vec::new();
    for width in [10i64, 15, 20, 25, 30] {
        if low_cents + width > high_cents {
            break;
        }
        for start in low_cents..=(high_cents - width) {
            windows.push((Decimal::new(start, 2), Decimal::new(start + width, 2)));
        }
    }

    // Support narrower than the minimum window: one band covering it
    if windows.is_empty() {
        let end = (low_cents + 10).min(100);
        windows.push((Decimal::new(end - 10, 2), Decimal::new(end, 2)));
    }
    windows
}

fn sweep_price_range(
    trades: &[NormalizedTrade],
    min_sample: usize,
) -> Result<Vec<OptimizationCandidate>> {
    let mut survivors = Vec::new();
    for (min_price, max_price) in price_windows(trades) {
        let mut config = stats_config(trades);
        config.min_price = min_price;
        config.max_price = max_price;

        if let Some(candidate) = evaluate_deterministic(trades, config, min_sample)? {
            survivors.push(candidate);
        }
    }
    Ok(survivors)
}

fn sweep_budget_bet(
    trades: &[NormalizedTrade],
    min_sample: usize,
    sampler: &mut OutcomeSampler,
) -> Result<Vec<OptimizationCandidate>> {
    let mut survivors = Vec::new();

    for budget in BUDGETS {
        for bet in BETS {
            // Risk-sizing sanity filter
            if bet / budget > MAX_BET_TO_BUDGET {
                continue;
            }

            for (min_price, max_price) in PRICE_PRESETS {
                let config = StrategyConfig {
                    initial_budget: budget,
                    fixed_bet_amount: bet,
                    min_trigger_amount: Decimal::ZERO,
                    min_price,
                    max_price,
                };

                if let Some(candidate) =
                    evaluate_randomized(trades, config, min_sample, sampler)?
                {
                    survivors.push(candidate);
                }
            }
        }
    }
    Ok(survivors)
}

/// One deterministic run: open trades stay open and are excluded from the
/// stats rather than coin-flipped.
fn evaluate_deterministic(
    trades: &[NormalizedTrade],
    config: StrategyConfig,
    min_sample: usize,
) -> Result<Option<OptimizationCandidate>> {
    let run = simulate(trades, &config, None)?;
    if run.trades.len() < min_sample {
        debug!(
            config = %config.fingerprint(),
            trades = run.trades.len(),
            "Candidate discarded: insufficient sample"
        );
        return Ok(None);
    }

    let stats = aggregate(&run.trades);
    Ok(Some(OptimizationCandidate {
        trade_count: run.trades.len(),
        win_rate: stats.win_rate,
        avg_pnl: stats.avg_pnl,
        total_pnl: stats.total_pnl,
        survival_rate: 1.0,
        avg_final_balance: run.final_balance,
        runs: 1,
        config,
    }))
}

/// Repeated randomized runs: unresolved outcomes are drawn fresh each
/// repetition and the metrics averaged.
fn evaluate_randomized(
    trades: &[NormalizedTrade],
    config: StrategyConfig,
    min_sample: usize,
    sampler: &mut OutcomeSampler,
) -> Result<Option<OptimizationCandidate>> {
    let reps = SWEEP_REPETITIONS;
    let mut survived = 0u32;
    let mut trade_count_sum = 0usize;
    let mut win_rate_sum = 0.0f64;
    let mut avg_pnl_sum = Decimal::ZERO;
    let mut total_pnl_sum = Decimal::ZERO;
    let mut balance_sum = Decimal::ZERO;

    for _ in 0..reps {
        let run = simulate(trades, &config, Some(&mut *sampler))?;
        let stats = aggregate(&run.trades);

        if !run.bankrupt {
            survived += 1;
        }
        trade_count_sum += run.trades.len();
        win_rate_sum += stats.win_rate;
        avg_pnl_sum += stats.avg_pnl;
        total_pnl_sum += stats.total_pnl;
        balance_sum += run.final_balance;
    }

    let trade_count = trade_count_sum / reps as usize;
    if trade_count < min_sample {
        return Ok(None);
    }

    let reps_dec = Decimal::from(reps);
    Ok(Some(OptimizationCandidate {
        trade_count,
        win_rate: win_rate_sum / reps as f64,
        avg_pnl: avg_pnl_sum / reps_dec,
        total_pnl: total_pnl_sum / reps_dec,
        survival_rate: survived as f64 / reps as f64,
        avg_final_balance: balance_sum / reps_dec,
        runs: reps,
        config,
    }))
}

/// Config for stats-oriented axes: the bankroll is sized so it never
/// binds, keeping the sample uncensored by ruin.
fn stats_config(trades: &[NormalizedTrade]) -> StrategyConfig {
    let bet = dec!(10);
    StrategyConfig {
        initial_budget: bet * Decimal::from(trades.len().max(100)),
        fixed_bet_amount: bet,
        min_trigger_amount: Decimal::ZERO,
        min_price: Decimal::ZERO,
        max_price: Decimal::ONE,
    }
}
