//! Single-run trade replay simulator.
//!
//! Replays a trader's normalized history one trade at a time against a
//! running bankroll: strict left-to-right, no look-ahead. Two settlement
//! paths exist by design:
//! - backtest settlement: trades with a known (or sampled) outcome settle
//!   instantly in the step they are bet, using the synthetic win formula;
//! - live settlement (`resolve`): open ledger entries settle later from
//!   the trader's actual realized ROI when their position closes.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{ClosedPosition, NormalizedTrade, StrategyConfig, TradeOutcome};

/// Fee on stake, applied only on winning trades (observed source policy;
/// losses carry no fee adjustment).
pub const WIN_FEE_RATE: Decimal = dec!(0.02);

/// Random outcome source for trades with no real resolution. Injectable so
/// tests can pin a seed while production draws from OS entropy.
pub struct OutcomeSampler {
    rng: StdRng,
}

impl OutcomeSampler {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Coin flip with win probability equal to the entry price.
    pub fn draw_win(&mut self, win_probability: Decimal) -> bool {
        let p = win_probability.to_f64().unwrap_or(0.0).clamp(0.0, 1.0);
        self.rng.random_bool(p)
    }
}

/// A trade the simulator committed capital to.
///
/// Never mutated after creation except the controlled one-way transition
/// of an `Open` entry to won/lost during a resolution pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedTrade {
    /// The trader's original trade this copy was driven by
    pub source: NormalizedTrade,

    pub entry_price: Decimal,

    /// Dollars committed
    pub bet_amount: Decimal,

    pub status: TradeOutcome,

    /// Signed dollars; `None` while the trade is open
    pub pnl: Option<Decimal>,

    /// Bankroll snapshot immediately after this trade settled (or after
    /// the stake was committed, for open trades)
    pub balance_after: Decimal,
}

/// Output of one simulator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub config: StrategyConfig,

    /// Committed trades in chronological order
    pub trades: Vec<SimulatedTrade>,

    pub final_balance: Decimal,
    pub peak_balance: Decimal,
    pub min_balance: Decimal,

    /// `initial_budget - min_balance`, clamped to >= 0
    pub max_drawdown: Decimal,

    pub bankrupt: bool,

    /// Index into the input trade list where the bankroll first fell below
    /// the fixed bet amount
    pub bankruptcy_index: Option<usize>,

    /// Trades rejected by the copy filter or data-quality checks
    pub skipped: usize,
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n{:=^60}", " SIMULATION RESULT ")?;
        writeln!(f)?;
        writeln!(f, "Config:        {}", self.config.fingerprint())?;
        writeln!(f)?;
        writeln!(f, "--- Bankroll ---")?;
        writeln!(f, "Initial:       ${:.2}", self.config.initial_budget)?;
        writeln!(f, "Final:         ${:.2}", self.final_balance)?;
        writeln!(f, "Peak:          ${:.2}", self.peak_balance)?;
        writeln!(f, "Max Drawdown:  ${:.2}", self.max_drawdown)?;
        writeln!(f)?;
        writeln!(f, "--- Trades ---")?;
        writeln!(f, "Copied:        {} ({} skipped)", self.trades.len(), self.skipped)?;
        match self.bankruptcy_index {
            Some(idx) => writeln!(f, "Bankrupt:      yes (at trade index {})", idx)?,
            None => writeln!(f, "Bankrupt:      no")?,
        }
        writeln!(f, "{:=^60}", "")?;
        Ok(())
    }
}

/// Replay `trades` (chronological ascending) against `config`.
///
/// When `sampler` is supplied, trades with no known resolution settle
/// instantly as a coin flip weighted by entry price (the sweep/backtest
/// path). Without it they stay open with their stake committed, to be
/// settled later by [`resolve`].
pub fn simulate(
    trades: &[NormalizedTrade],
    config: &StrategyConfig,
    mut sampler: Option<&mut OutcomeSampler>,
) -> Result<RunResult> {
    config.validate()?;

    let mut balance = config.initial_budget;
    let mut peak_balance = balance;
    let mut min_balance = balance;
    let mut bankruptcy_index: Option<usize> = None;
    let mut skipped = 0usize;
    let mut ledger: Vec<SimulatedTrade> = Vec::new();

    for (index, trade) in trades.iter().enumerate() {
        if trade.price <= Decimal::ZERO {
            warn!(
                tx = %trade.transaction_hash,
                "Skipping malformed trade with non-positive price"
            );
            skipped += 1;
            continue;
        }

        // Mark broke but keep scanning: later trades still get evaluated
        // against the frozen bankrupt state.
        if balance < config.fixed_bet_amount {
            if bankruptcy_index.is_none() {
                info!(index, balance = %balance, "Bankroll fell below bet size");
                bankruptcy_index = Some(index);
            }
            continue;
        }

        // Copy filter: price band plus the trader's original notional.
        if trade.price < config.min_price
            || trade.price > config.max_price
            || trade.notional_amount < config.min_trigger_amount
        {
            debug!(
                tx = %trade.transaction_hash,
                price = %trade.price,
                notional = %trade.notional_amount,
                "Trade outside copy filter"
            );
            skipped += 1;
            continue;
        }

        let bet = config.fixed_bet_amount;
        balance -= bet;

        let status = match trade.outcome {
            TradeOutcome::Open => match sampler.as_deref_mut() {
                Some(s) => {
                    if s.draw_win(trade.price) {
                        TradeOutcome::Won
                    } else {
                        TradeOutcome::Lost
                    }
                }
                None => TradeOutcome::Open,
            },
            resolved => resolved,
        };

        // Synchronous settlement: known-outcome trades settle in the same
        // step they are bet.
        let pnl = match status {
            TradeOutcome::Won => {
                let pnl = win_pnl(bet, trade.price);
                balance += bet + pnl;
                Some(pnl)
            }
            TradeOutcome::Lost => Some(-bet),
            TradeOutcome::Open => None,
        };

        min_balance = min_balance.min(balance);
        peak_balance = peak_balance.max(balance);

        ledger.push(SimulatedTrade {
            source: trade.clone(),
            entry_price: trade.price,
            bet_amount: bet,
            status,
            pnl,
            balance_after: balance,
        });
    }

    Ok(RunResult {
        config: config.clone(),
        trades: ledger,
        final_balance: balance,
        peak_balance,
        min_balance,
        max_drawdown: (config.initial_budget - min_balance).max(Decimal::ZERO),
        bankrupt: bankruptcy_index.is_some(),
        bankruptcy_index,
        skipped,
    })
}

/// Synthetic backtest win: stake pays out at $1 per token, minus the 2%
/// fee on stake.
fn win_pnl(bet: Decimal, entry_price: Decimal) -> Decimal {
    bet * (Decimal::ONE - entry_price) - bet * WIN_FEE_RATE
}

/// Live-tracking settlement pass.
///
/// Each open ledger entry whose underlying trade now matches a newly
/// closed position transitions to won/lost using the trader's actual
/// realized ROI (`pnl = bet * roi`); a win returns stake plus profit to
/// the bankroll. This is deliberately not the synthetic win formula.
pub fn resolve(mut run: RunResult, newly_closed: &[ClosedPosition]) -> RunResult {
    for trade in run.trades.iter_mut() {
        if trade.status != TradeOutcome::Open {
            continue;
        }

        let Some(position) = match_position(&trade.source, newly_closed) else {
            continue;
        };

        let roi = position.roi();
        let pnl = trade.bet_amount * roi;

        if position.won() {
            trade.status = TradeOutcome::Won;
            run.final_balance += trade.bet_amount + pnl;
            run.peak_balance = run.peak_balance.max(run.final_balance);
        } else {
            trade.status = TradeOutcome::Lost;
        }

        trade.pnl = Some(pnl);
        trade.balance_after = run.final_balance;

        debug!(
            tx = %trade.source.transaction_hash,
            roi = %roi,
            pnl = %pnl,
            "Resolved open trade"
        );
    }

    run
}

/// Same join order as the normalizer: asset, condition ID, slug.
fn match_position<'a>(
    trade: &NormalizedTrade,
    positions: &'a [ClosedPosition],
) -> Option<&'a ClosedPosition> {
    if !trade.asset.is_empty() {
        if let Some(p) = positions.iter().find(|p| p.asset == trade.asset) {
            return Some(p);
        }
    }
    if let Some(p) = positions
        .iter()
        .find(|p| p.condition_id == trade.condition_id)
    {
        return Some(p);
    }
    match &trade.slug {
        Some(slug) => positions
            .iter()
            .find(|p| p.slug.as_deref() == Some(slug.as_str())),
        None => None,
    }
}
