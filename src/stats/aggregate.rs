//! Aggregate statistics over a simulated trade ledger: win rate, P&L,
//! streaks, price-bucketed win rates, and an OLS trend for projection.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::TradeOutcome;
use crate::sim::SimulatedTrade;

/// Kind of the streak at the tail of the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakKind {
    Win,
    Loss,
    None,
}

/// Summary statistics over one or many runs' trades.
///
/// Win rate is a percentage in [0, 100]; with zero closed trades it is
/// reported as 0, never NaN. Open trades count toward `total_trades` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeStats {
    pub total_trades: usize,
    pub closed_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub total_pnl: Decimal,
    pub avg_pnl: Decimal,
    pub longest_win_streak: usize,
    pub longest_loss_streak: usize,
    pub current_streak: usize,
    pub current_streak_kind: StreakKind,
    pub avg_buy_price_when_won: Decimal,
    pub avg_buy_price_when_lost: Decimal,
}

impl std::fmt::Display for TradeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "--- Statistics ---")?;
        writeln!(
            f,
            "Trades:        {} ({} closed, {} open)",
            self.total_trades,
            self.closed_trades,
            self.total_trades - self.closed_trades
        )?;
        writeln!(
            f,
            "Win Rate:      {:.1}% ({} W / {} L)",
            self.win_rate, self.wins, self.losses
        )?;
        writeln!(f, "Total P&L:     ${:.2}", self.total_pnl)?;
        writeln!(f, "Avg P&L:       ${:.2}", self.avg_pnl)?;
        writeln!(
            f,
            "Streaks:       longest {}W / {}L, current {}{}",
            self.longest_win_streak,
            self.longest_loss_streak,
            self.current_streak,
            match self.current_streak_kind {
                StreakKind::Win => "W",
                StreakKind::Loss => "L",
                StreakKind::None => "",
            }
        )?;
        writeln!(
            f,
            "Entry Price:   {:.3} avg when won, {:.3} avg when lost",
            self.avg_buy_price_when_won, self.avg_buy_price_when_lost
        )?;
        Ok(())
    }
}

/// Compute summary statistics over a chronological trade ledger.
pub fn aggregate(trades: &[SimulatedTrade]) -> TradeStats {
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut total_pnl = Decimal::ZERO;
    let mut win_price_sum = Decimal::ZERO;
    let mut loss_price_sum = Decimal::ZERO;

    let mut win_streak = 0usize;
    let mut loss_streak = 0usize;
    let mut longest_win_streak = 0usize;
    let mut longest_loss_streak = 0usize;

    for trade in trades {
        match trade.status {
            TradeOutcome::Won => {
                wins += 1;
                win_price_sum += trade.entry_price;
                win_streak += 1;
                loss_streak = 0;
                longest_win_streak = longest_win_streak.max(win_streak);
            }
            TradeOutcome::Lost => {
                losses += 1;
                loss_price_sum += trade.entry_price;
                loss_streak += 1;
                win_streak = 0;
                longest_loss_streak = longest_loss_streak.max(loss_streak);
            }
            TradeOutcome::Open => continue,
        }
        if let Some(pnl) = trade.pnl {
            total_pnl += pnl;
        }
    }

    let closed = wins + losses;
    let win_rate = if closed > 0 {
        wins as f64 / closed as f64 * 100.0
    } else {
        0.0
    };

    let (current_streak, current_streak_kind) = if win_streak > 0 {
        (win_streak, StreakKind::Win)
    } else if loss_streak > 0 {
        (loss_streak, StreakKind::Loss)
    } else {
        (0, StreakKind::None)
    };

    TradeStats {
        total_trades: trades.len(),
        closed_trades: closed,
        wins,
        losses,
        win_rate,
        total_pnl,
        avg_pnl: if closed > 0 {
            total_pnl / Decimal::from(closed)
        } else {
            Decimal::ZERO
        },
        longest_win_streak,
        longest_loss_streak,
        current_streak,
        current_streak_kind,
        avg_buy_price_when_won: if wins > 0 {
            win_price_sum / Decimal::from(wins)
        } else {
            Decimal::ZERO
        },
        avg_buy_price_when_lost: if losses > 0 {
            loss_price_sum / Decimal::from(losses)
        } else {
            Decimal::ZERO
        },
    }
}

/// Win rate within one price band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBucket {
    pub low: f64,
    pub high: f64,
    pub closed_trades: usize,
    pub wins: usize,
    pub win_rate: f64,
}

/// Partition closed trades into `bands` equal-width price bands over
/// [0, 1] and report the win rate per band. Used to find hot zones.
pub fn price_bucket_win_rates(trades: &[SimulatedTrade], bands: usize) -> Vec<PriceBucket> {
    let bands = bands.max(1);
    let width = 1.0 / bands as f64;

    let mut counts = vec![(0usize, 0usize); bands];
    for trade in trades {
        if !trade.status.is_resolved() {
            continue;
        }
        let price = trade.entry_price.to_f64().unwrap_or(0.0);
        let idx = ((price / width) as usize).min(bands - 1);
        counts[idx].0 += 1;
        if trade.status == TradeOutcome::Won {
            counts[idx].1 += 1;
        }
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, (closed, wins))| PriceBucket {
            low: i as f64 * width,
            high: (i + 1) as f64 * width,
            closed_trades: closed,
            wins,
            win_rate: if closed > 0 {
                wins as f64 / closed as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

/// Ordinary-least-squares fit of cumulative P&L against trade index.
/// Display-only projection, never a ranking input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendLine {
    /// Projected cumulative P&L at trade index `x`.
    pub fn project(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit the closed-form OLS line over `(index, cumulative pnl)` of the
/// settled trades. Returns `None` with fewer than two points or a
/// degenerate denominator.
pub fn pnl_trend(trades: &[SimulatedTrade]) -> Option<TrendLine> {
    let mut points: Vec<(f64, f64)> = Vec::new();
    let mut cumulative = Decimal::ZERO;
    for trade in trades {
        if let Some(pnl) = trade.pnl {
            cumulative += pnl;
            points.push((points.len() as f64, cumulative.to_f64().unwrap_or(0.0)));
        }
    }

    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }

    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_x2: f64 = points.iter().map(|(x, _)| x * x).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Some(TrendLine { slope, intercept })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NormalizedTrade, TradeOutcome};
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn simulated(status: TradeOutcome, price: Decimal, pnl: Option<Decimal>) -> SimulatedTrade {
        SimulatedTrade {
            source: NormalizedTrade {
                asset: String::new(),
                condition_id: String::new(),
                market_title: String::new(),
                outcome_label: "Yes".to_string(),
                slug: None,
                price,
                size: dec!(10),
                notional_amount: dec!(10) * price,
                timestamp: DateTime::from_timestamp(0, 0).unwrap_or_default(),
                transaction_hash: String::new(),
                outcome: status,
                roi: None,
            },
            entry_price: price,
            bet_amount: dec!(10),
            status,
            pnl,
            balance_after: Decimal::ZERO,
        }
    }

    fn won(price: Decimal, pnl: Decimal) -> SimulatedTrade {
        simulated(TradeOutcome::Won, price, Some(pnl))
    }

    fn lost(price: Decimal) -> SimulatedTrade {
        simulated(TradeOutcome::Lost, price, Some(dec!(-10)))
    }

    #[test]
    fn test_win_rate_and_pnl() {
        let trades = vec![
            won(dec!(0.5), dec!(4.8)),
            lost(dec!(0.6)),
            won(dec!(0.4), dec!(5.8)),
            simulated(TradeOutcome::Open, dec!(0.5), None),
        ];

        let stats = aggregate(&trades);
        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.closed_trades, 3);
        assert!((stats.win_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.total_pnl, dec!(0.6));
    }

    #[test]
    fn test_win_rate_zero_not_nan_with_no_closed_trades() {
        let trades = vec![simulated(TradeOutcome::Open, dec!(0.5), None)];
        let stats = aggregate(&trades);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.avg_pnl, Decimal::ZERO);

        let empty = aggregate(&[]);
        assert_eq!(empty.win_rate, 0.0);
        assert_eq!(empty.current_streak_kind, StreakKind::None);
    }

    #[test]
    fn test_streak_tracking() {
        let trades = vec![
            won(dec!(0.5), dec!(4.8)),
            won(dec!(0.5), dec!(4.8)),
            won(dec!(0.5), dec!(4.8)),
            lost(dec!(0.5)),
            lost(dec!(0.5)),
            won(dec!(0.5), dec!(4.8)),
        ];

        let stats = aggregate(&trades);
        assert_eq!(stats.longest_win_streak, 3);
        assert_eq!(stats.longest_loss_streak, 2);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.current_streak_kind, StreakKind::Win);
    }

    #[test]
    fn test_open_trades_do_not_break_streaks() {
        let trades = vec![
            won(dec!(0.5), dec!(4.8)),
            simulated(TradeOutcome::Open, dec!(0.5), None),
            won(dec!(0.5), dec!(4.8)),
        ];

        let stats = aggregate(&trades);
        assert_eq!(stats.longest_win_streak, 2);
        assert_eq!(stats.current_streak, 2);
    }

    #[test]
    fn test_avg_entry_price_by_outcome() {
        let trades = vec![
            won(dec!(0.2), dec!(7.8)),
            won(dec!(0.4), dec!(5.8)),
            lost(dec!(0.8)),
        ];

        let stats = aggregate(&trades);
        assert_eq!(stats.avg_buy_price_when_won, dec!(0.3));
        assert_eq!(stats.avg_buy_price_when_lost, dec!(0.8));
    }

    #[test]
    fn test_price_buckets() {
        let trades = vec![
            won(dec!(0.05), dec!(9.3)),
            lost(dec!(0.08)),
            won(dec!(0.55), dec!(4.3)),
            won(dec!(0.95), dec!(0.3)),
            simulated(TradeOutcome::Open, dec!(0.55), None),
        ];

        let buckets = price_bucket_win_rates(&trades, 10);
        assert_eq!(buckets.len(), 10);
        assert_eq!(buckets[0].closed_trades, 2);
        assert_eq!(buckets[0].wins, 1);
        assert!((buckets[0].win_rate - 50.0).abs() < 1e-9);
        assert_eq!(buckets[5].closed_trades, 1);
        // Price 0.95 lands in the last band, never out of range
        assert_eq!(buckets[9].closed_trades, 1);
    }

    #[test]
    fn test_trend_slope_on_steady_gains() {
        let trades: Vec<_> = (0..10).map(|_| won(dec!(0.5), dec!(4.8))).collect();

        let trend = pnl_trend(&trades).unwrap();
        assert!((trend.slope - 4.8).abs() < 1e-9);
        assert!((trend.project(10.0) - 52.8).abs() < 1e-6);
    }

    #[test]
    fn test_trend_requires_two_points() {
        assert!(pnl_trend(&[]).is_none());
        assert!(pnl_trend(&[won(dec!(0.5), dec!(4.8))]).is_none());
    }
}
