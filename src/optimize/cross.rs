//! Cross-run analysis over persisted run history.
//!
//! Groups runs sharing a configuration fingerprint, merges their trade
//! sets for aggregate statistics, and recommends a single configuration
//! across runs with distinct parameters.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::StrategyConfig;
use crate::sim::SimulatedTrade;
use crate::stats::{aggregate, TradeStats};

/// Minimum closed trades before a price-range or trigger group is
/// eligible for recommendation.
const MIN_GROUP_TRADES: usize = 20;

/// One persisted simulation run: the `{config, trades[]}` history shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    #[serde(default)]
    pub name: Option<String>,
    pub config: StrategyConfig,
    pub trades: Vec<SimulatedTrade>,
}

impl RunRecord {
    /// Whether this run's bankroll ever fell below its bet size. The
    /// ledger only carries balances after committed trades, so the
    /// minimum snapshot stands in for the live bankruptcy flag.
    pub fn went_bankrupt(&self) -> bool {
        self.trades
            .iter()
            .any(|t| t.balance_after < self.config.fixed_bet_amount)
    }
}

/// Runs sharing one configuration fingerprint, with merged statistics.
#[derive(Debug, Clone)]
pub struct ConfigGroup {
    pub config: StrategyConfig,
    pub runs: usize,
    pub trades: Vec<SimulatedTrade>,
    pub stats: TradeStats,
}

/// Merge runs whose configs are field-for-field equal and recompute
/// aggregate statistics over the union of their trades.
pub fn group_by_fingerprint(records: &[RunRecord]) -> Vec<ConfigGroup> {
    let mut by_config: HashMap<StrategyConfig, (usize, Vec<SimulatedTrade>)> = HashMap::new();
    for record in records {
        let entry = by_config
            .entry(record.config.clone())
            .or_insert_with(|| (0, Vec::new()));
        entry.0 += 1;
        entry.1.extend(record.trades.iter().cloned());
    }

    let mut groups: Vec<ConfigGroup> = by_config
        .into_iter()
        .map(|(config, (runs, mut trades))| {
            trades.sort_by_key(|t| t.source.timestamp);
            let stats = aggregate(&trades);
            ConfigGroup {
                config,
                runs,
                trades,
                stats,
            }
        })
        .collect();

    // Largest merged sample first for stable presentation
    groups.sort_by(|a, b| b.trades.len().cmp(&a.trades.len()));
    groups
}

/// A recommended parameter value with its human-readable justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedValue<T> {
    pub value: T,
    pub justification: String,
}

/// Best single configuration across runs with distinct parameters. Each
/// field is recommended independently; `None` when the history has no
/// eligible group for that parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub budget: Option<RecommendedValue<Decimal>>,
    pub bet_amount: Option<RecommendedValue<Decimal>>,
    pub price_range: Option<RecommendedValue<(Decimal, Decimal)>>,
    pub trigger: Option<RecommendedValue<Decimal>>,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "--- Recommended Configuration ---")?;
        match &self.budget {
            Some(r) => writeln!(f, "Budget:      ${} ({})", r.value, r.justification)?,
            None => writeln!(f, "Budget:      no data")?,
        }
        match &self.bet_amount {
            Some(r) => writeln!(f, "Bet Size:    ${} ({})", r.value, r.justification)?,
            None => writeln!(f, "Bet Size:    no data")?,
        }
        match &self.price_range {
            Some(r) => writeln!(
                f,
                "Price Band:  [{}, {}] ({})",
                r.value.0, r.value.1, r.justification
            )?,
            None => writeln!(f, "Price Band:  no data")?,
        }
        match &self.trigger {
            Some(r) => writeln!(f, "Trigger:     ${} ({})", r.value, r.justification)?,
            None => writeln!(f, "Trigger:     no data")?,
        }
        Ok(())
    }
}

/// Recommend one configuration across all persisted runs:
/// - budget: lowest bankruptcy rate, ties broken by the higher budget;
/// - bet size: maximizes the risk-adjusted score `win_rate * (1 - bet/budget)`;
/// - price range and trigger: highest win rate among groups with at
///   least 20 closed trades.
pub fn cross_analyze(records: &[RunRecord]) -> Recommendation {
    Recommendation {
        budget: recommend_budget(records),
        bet_amount: recommend_bet(records),
        price_range: recommend_price_range(records),
        trigger: recommend_trigger(records),
    }
}

fn recommend_budget(records: &[RunRecord]) -> Option<RecommendedValue<Decimal>> {
    let mut by_budget: HashMap<Decimal, (usize, usize)> = HashMap::new();
    for record in records {
        let entry = by_budget
            .entry(record.config.initial_budget)
            .or_insert((0, 0));
        entry.0 += 1;
        if record.went_bankrupt() {
            entry.1 += 1;
        }
    }

    by_budget
        .into_iter()
        .map(|(budget, (runs, bankrupt))| (budget, runs, bankrupt as f64 / runs as f64))
        .min_by(|a, b| {
            a.2.partial_cmp(&b.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                // Lower ruin rate wins; on a tie prefer the higher budget
                .then(b.0.cmp(&a.0))
        })
        .map(|(budget, runs, rate)| RecommendedValue {
            value: budget,
            justification: format!(
                "lowest bankruptcy rate: {:.0}% across {} runs",
                rate * 100.0,
                runs
            ),
        })
}

fn recommend_bet(records: &[RunRecord]) -> Option<RecommendedValue<Decimal>> {
    let mut by_sizing: HashMap<(Decimal, Decimal), Vec<SimulatedTrade>> = HashMap::new();
    for record in records {
        by_sizing
            .entry((
                record.config.fixed_bet_amount,
                record.config.initial_budget,
            ))
            .or_default()
            .extend(record.trades.iter().cloned());
    }

    by_sizing
        .into_iter()
        .map(|((bet, budget), trades)| {
            let stats = aggregate(&trades);
            let risk_fraction = (bet / budget).to_f64().unwrap_or(0.0);
            let score = stats.win_rate / 100.0 * (1.0 - risk_fraction);
            (bet, budget, stats, score)
        })
        .max_by(|a, b| {
            a.3.partial_cmp(&b.3)
                .unwrap_or(std::cmp::Ordering::Equal)
                // Deterministic tie-break: smaller bet is less risk
                .then(b.0.cmp(&a.0))
        })
        .map(|(bet, budget, stats, score)| RecommendedValue {
            value: bet,
            justification: format!(
                "risk-adjusted score {:.3} ({:.1}% win rate at {} per {} budget)",
                score, stats.win_rate, bet, budget
            ),
        })
}

fn recommend_price_range(records: &[RunRecord]) -> Option<RecommendedValue<(Decimal, Decimal)>> {
    best_group_by(records, |config| (config.min_price, config.max_price)).map(
        |((min_price, max_price), stats)| RecommendedValue {
            value: (min_price, max_price),
            justification: format!(
                "{:.1}% win rate over {} closed trades",
                stats.win_rate, stats.closed_trades
            ),
        },
    )
}

fn recommend_trigger(records: &[RunRecord]) -> Option<RecommendedValue<Decimal>> {
    best_group_by(records, |config| config.min_trigger_amount).map(|(trigger, stats)| {
        RecommendedValue {
            value: trigger,
            justification: format!(
                "{:.1}% win rate over {} closed trades",
                stats.win_rate, stats.closed_trades
            ),
        }
    })
}

/// Group records by a config projection and return the key with the
/// highest win rate among groups meeting the sample floor.
fn best_group_by<K>(
    records: &[RunRecord],
    key: impl Fn(&StrategyConfig) -> K,
) -> Option<(K, TradeStats)>
where
    K: std::hash::Hash + Eq + Clone,
{
    let mut by_key: HashMap<K, Vec<SimulatedTrade>> = HashMap::new();
    for record in records {
        by_key
            .entry(key(&record.config))
            .or_default()
            .extend(record.trades.iter().cloned());
    }

    by_key
        .into_iter()
        .map(|(k, trades)| (k, aggregate(&trades)))
        .filter(|(_, stats)| stats.closed_trades >= MIN_GROUP_TRADES)
        .max_by(|a, b| {
            a.1.win_rate
                .partial_cmp(&b.1.win_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NormalizedTrade, TradeOutcome};
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn simulated(status: TradeOutcome, balance_after: Decimal, ts: i64) -> SimulatedTrade {
        SimulatedTrade {
            source: NormalizedTrade {
                asset: String::new(),
                condition_id: String::new(),
                market_title: String::new(),
                outcome_label: "Yes".to_string(),
                slug: None,
                price: dec!(0.5),
                size: dec!(20),
                notional_amount: dec!(10),
                timestamp: DateTime::from_timestamp(ts, 0).unwrap_or_default(),
                transaction_hash: format!("0x{}", ts),
                outcome: status,
                roi: None,
            },
            entry_price: dec!(0.5),
            bet_amount: dec!(10),
            status,
            pnl: match status {
                TradeOutcome::Won => Some(dec!(4.8)),
                TradeOutcome::Lost => Some(dec!(-10)),
                TradeOutcome::Open => None,
            },
            balance_after,
        }
    }

    fn record(config: StrategyConfig, outcomes: &[TradeOutcome]) -> RunRecord {
        let mut balance = config.initial_budget;
        let trades = outcomes
            .iter()
            .enumerate()
            .map(|(i, status)| {
                match status {
                    TradeOutcome::Won => balance += dec!(4.8),
                    TradeOutcome::Lost => balance -= dec!(10),
                    TradeOutcome::Open => balance -= dec!(10),
                }
                simulated(*status, balance, i as i64)
            })
            .collect();
        RunRecord {
            name: None,
            config,
            trades,
        }
    }

    fn config_with(budget: Decimal, bet: Decimal) -> StrategyConfig {
        StrategyConfig {
            initial_budget: budget,
            fixed_bet_amount: bet,
            ..StrategyConfig::default()
        }
    }

    #[test]
    fn test_grouping_merges_identical_fingerprints() {
        let config = StrategyConfig::default();
        let a = record(config.clone(), &[TradeOutcome::Won, TradeOutcome::Lost]);
        let b = record(config.clone(), &[TradeOutcome::Won]);
        let mut other = config.clone();
        other.min_trigger_amount = dec!(50);
        let c = record(other, &[TradeOutcome::Lost]);

        let groups = group_by_fingerprint(&[a, b, c]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].runs, 2);
        assert_eq!(groups[0].trades.len(), 3);
        assert_eq!(groups[0].stats.wins, 2);
    }

    #[test]
    fn test_budget_recommendation_prefers_lowest_ruin() {
        // 100-budget run goes bankrupt, 1000-budget run survives
        let broke = record(
            config_with(dec!(100), dec!(10)),
            &[TradeOutcome::Lost; 10],
        );
        assert!(broke.went_bankrupt());

        let solvent = record(
            config_with(dec!(1000), dec!(10)),
            &[TradeOutcome::Lost; 10],
        );
        assert!(!solvent.went_bankrupt());

        let recommendation = cross_analyze(&[broke, solvent]);
        let budget = recommendation.budget.unwrap();
        assert_eq!(budget.value, dec!(1000));
        assert!(budget.justification.contains("bankruptcy"));
    }

    #[test]
    fn test_budget_tie_broken_by_higher_budget() {
        let small = record(config_with(dec!(500), dec!(10)), &[TradeOutcome::Won; 5]);
        let large = record(config_with(dec!(2000), dec!(10)), &[TradeOutcome::Won; 5]);

        let recommendation = cross_analyze(&[small, large]);
        assert_eq!(recommendation.budget.unwrap().value, dec!(2000));
    }

    #[test]
    fn test_bet_recommendation_is_risk_adjusted() {
        // Same win rate; the smaller bet relative to budget scores higher
        let aggressive = record(
            config_with(dec!(1000), dec!(200)),
            &[TradeOutcome::Won; 10],
        );
        let conservative = record(
            config_with(dec!(1000), dec!(10)),
            &[TradeOutcome::Won; 10],
        );

        let recommendation = cross_analyze(&[aggressive, conservative]);
        assert_eq!(recommendation.bet_amount.unwrap().value, dec!(10));
    }

    #[test]
    fn test_small_groups_excluded_from_range_and_trigger() {
        // 19 closed trades: below the 20-trade floor
        let config = StrategyConfig::default();
        let thin = record(config, &[TradeOutcome::Won; 19]);

        let recommendation = cross_analyze(&[thin]);
        assert!(recommendation.price_range.is_none());
        assert!(recommendation.trigger.is_none());
    }

    #[test]
    fn test_range_recommendation_picks_highest_win_rate() {
        let mut narrow = StrategyConfig::default();
        narrow.min_price = dec!(0.4);
        narrow.max_price = dec!(0.6);
        let mut wins = vec![TradeOutcome::Won; 18];
        wins.extend([TradeOutcome::Lost; 2]);
        let good = record(narrow.clone(), &wins);

        let wide = StrategyConfig::default();
        let mut losses = vec![TradeOutcome::Lost; 15];
        losses.extend([TradeOutcome::Won; 5]);
        let bad = record(wide, &losses);

        let recommendation = cross_analyze(&[good, bad]);
        let range = recommendation.price_range.unwrap();
        assert_eq!(range.value, (dec!(0.4), dec!(0.6)));
        assert!(range.justification.contains("win rate"));
    }
}
