//! Trade record normalizer.
//!
//! Reconciles raw activity records against closed positions to classify
//! each historical buy as won, lost, or still open. Pure over its inputs:
//! no fetching, no state.

use std::collections::{HashMap, HashSet};

use chrono::DateTime;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::{ClosedPosition, MarketStatus, NormalizedTrade, RawTrade, TradeOutcome};

/// Normalize raw activity into a chronologically ascending trade list.
///
/// - keeps BUY-side TRADE records only;
/// - deduplicates on `(transaction_hash, asset, outcome_index)`, first
///   occurrence wins (duplicates arise from overlapping paginated fetches);
/// - joins each buy against closed positions by exact `asset`, then
///   `condition_id`, then `slug` (first match wins, at most one position
///   attached);
/// - joined trades are won iff `realized_pnl > 0` (zero is a loss by
///   policy), with ROI from the position's cost basis;
/// - unjoined trades in a market the `market_status` map says is closed are
///   classified by whether the traded outcome label won; otherwise the
///   trade stays open.
pub fn normalize(
    activity: &[RawTrade],
    closed_positions: &[ClosedPosition],
    market_status: &HashMap<String, MarketStatus>,
) -> Vec<NormalizedTrade> {
    let mut seen: HashSet<(String, String, i32)> = HashSet::new();
    let mut trades: Vec<NormalizedTrade> = Vec::new();

    for raw in activity {
        if !raw.is_copyable_buy() {
            continue;
        }

        if !seen.insert(raw.dedup_key()) {
            debug!(
                tx = %raw.transaction_hash,
                asset = %raw.asset,
                "Dropping duplicate activity record"
            );
            continue;
        }

        if raw.price <= Decimal::ZERO {
            warn!(
                tx = %raw.transaction_hash,
                market = %raw.condition_id,
                "Skipping trade with missing or non-positive price"
            );
            continue;
        }

        let (outcome, roi) = classify(raw, closed_positions, market_status);

        trades.push(NormalizedTrade {
            asset: raw.asset.clone(),
            condition_id: raw.condition_id.clone(),
            market_title: raw.title.clone(),
            outcome_label: raw.outcome.clone(),
            slug: raw.slug.clone(),
            price: raw.price,
            size: raw.size,
            notional_amount: raw.notional(),
            timestamp: DateTime::from_timestamp(raw.timestamp, 0).unwrap_or_default(),
            transaction_hash: raw.transaction_hash.clone(),
            outcome,
            roi,
        });
    }

    trades.sort_by_key(|t| t.timestamp);
    trades
}

/// Resolve a buy against closed positions, falling back to market status.
fn classify(
    raw: &RawTrade,
    closed_positions: &[ClosedPosition],
    market_status: &HashMap<String, MarketStatus>,
) -> (TradeOutcome, Option<Decimal>) {
    if let Some(position) = find_closed_position(raw, closed_positions) {
        let outcome = if position.won() {
            TradeOutcome::Won
        } else {
            TradeOutcome::Lost
        };
        return (outcome, Some(position.roi()));
    }

    if let Some(status) = find_market_status(raw, market_status) {
        if status.closed {
            // Resolved without a sale: won iff the traded outcome label
            // is the market's winner.
            let won = status
                .winning_outcome()
                .map(|w| w.eq_ignore_ascii_case(&raw.outcome))
                .unwrap_or(false);
            return if won {
                // Held to resolution: each token pays out $1
                let roi = if raw.price.is_zero() {
                    Decimal::ZERO
                } else {
                    (Decimal::ONE - raw.price) / raw.price
                };
                (TradeOutcome::Won, Some(roi))
            } else {
                (TradeOutcome::Lost, Some(-Decimal::ONE))
            };
        }
    }

    // No join and no terminal market status: never defaulted to won or lost
    (TradeOutcome::Open, None)
}

/// Join order: exact asset match, then condition ID, then slug.
fn find_closed_position<'a>(
    raw: &RawTrade,
    closed_positions: &'a [ClosedPosition],
) -> Option<&'a ClosedPosition> {
    if !raw.asset.is_empty() {
        if let Some(p) = closed_positions.iter().find(|p| p.asset == raw.asset) {
            return Some(p);
        }
    }
    if let Some(p) = closed_positions
        .iter()
        .find(|p| p.condition_id == raw.condition_id)
    {
        return Some(p);
    }
    match &raw.slug {
        Some(slug) => closed_positions
            .iter()
            .find(|p| p.slug.as_deref() == Some(slug.as_str())),
        None => None,
    }
}

fn find_market_status<'a>(
    raw: &RawTrade,
    market_status: &'a HashMap<String, MarketStatus>,
) -> Option<&'a MarketStatus> {
    if let Some(status) = market_status.get(&raw.condition_id) {
        return Some(status);
    }
    raw.slug.as_ref().and_then(|slug| market_status.get(slug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketOutcome, TradeSide};
    use rust_decimal_macros::dec;

    fn buy(tx: &str, asset: &str, condition: &str, price: Decimal, ts: i64) -> RawTrade {
        RawTrade {
            activity_type: "TRADE".to_string(),
            side: TradeSide::Buy,
            asset: asset.to_string(),
            condition_id: condition.to_string(),
            price,
            size: dec!(100),
            usdc_size: None,
            timestamp: ts,
            transaction_hash: tx.to_string(),
            title: String::new(),
            outcome: "Yes".to_string(),
            outcome_index: 0,
            slug: None,
        }
    }

    fn closed(asset: &str, condition: &str, pnl: Decimal) -> ClosedPosition {
        ClosedPosition {
            asset: asset.to_string(),
            condition_id: condition.to_string(),
            avg_price: dec!(0.5),
            total_bought: dec!(100),
            realized_pnl: pnl,
            timestamp: 0,
            slug: None,
        }
    }

    #[test]
    fn test_filters_to_buy_trade_records() {
        let mut sell = buy("0x1", "a", "c1", dec!(0.5), 10);
        sell.side = TradeSide::Sell;
        let mut redeem = buy("0x2", "b", "c2", dec!(0.5), 20);
        redeem.activity_type = "REDEEM".to_string();
        let keep = buy("0x3", "d", "c3", dec!(0.5), 30);

        let result = normalize(&[sell, redeem, keep], &[], &HashMap::new());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].transaction_hash, "0x3");
    }

    #[test]
    fn test_deduplicates_first_occurrence_wins() {
        let first = buy("0x1", "a", "c1", dec!(0.40), 10);
        let mut dup = buy("0x1", "a", "c1", dec!(0.99), 20);
        dup.size = dec!(999);

        let result = normalize(&[first, dup], &[], &HashMap::new());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].price, dec!(0.40));
    }

    #[test]
    fn test_join_prefers_asset_over_condition_id() {
        let trade = buy("0x1", "token-a", "c1", dec!(0.5), 10);
        let by_asset = closed("token-a", "other", dec!(40));
        let by_condition = closed("other-token", "c1", dec!(-40));

        let result = normalize(&[trade], &[by_condition, by_asset], &HashMap::new());
        assert_eq!(result[0].outcome, TradeOutcome::Won);
        // roi = 40 / (100 * 0.5) = 0.8
        assert_eq!(result[0].roi, Some(dec!(0.8)));
    }

    #[test]
    fn test_join_falls_back_to_slug() {
        let mut trade = buy("0x1", "", "c-none", dec!(0.5), 10);
        trade.slug = Some("market-slug".to_string());
        let mut position = closed("", "c-other", dec!(-10));
        position.slug = Some("market-slug".to_string());

        let result = normalize(&[trade], &[position], &HashMap::new());
        assert_eq!(result[0].outcome, TradeOutcome::Lost);
    }

    #[test]
    fn test_zero_realized_pnl_is_a_loss() {
        let trade = buy("0x1", "a", "c1", dec!(0.5), 10);
        let position = closed("a", "c1", Decimal::ZERO);

        let result = normalize(&[trade], &[position], &HashMap::new());
        assert_eq!(result[0].outcome, TradeOutcome::Lost);
    }

    #[test]
    fn test_unjoined_closed_market_classified_by_winner() {
        let trade = buy("0x1", "a", "c1", dec!(0.25), 10);
        let mut status_map = HashMap::new();
        status_map.insert(
            "c1".to_string(),
            MarketStatus {
                condition_id: "c1".to_string(),
                slug: None,
                closed: true,
                active: false,
                outcomes: vec![
                    MarketOutcome {
                        outcome: "Yes".to_string(),
                        winner: true,
                    },
                    MarketOutcome {
                        outcome: "No".to_string(),
                        winner: false,
                    },
                ],
            },
        );

        let result = normalize(&[trade], &[], &status_map);
        assert_eq!(result[0].outcome, TradeOutcome::Won);
        // Held to resolution from 0.25: roi = 0.75 / 0.25 = 3
        assert_eq!(result[0].roi, Some(dec!(3)));
    }

    #[test]
    fn test_unjoined_open_market_stays_open() {
        let trade = buy("0x1", "a", "c1", dec!(0.5), 10);
        let result = normalize(&[trade], &[], &HashMap::new());
        assert_eq!(result[0].outcome, TradeOutcome::Open);
        assert_eq!(result[0].roi, None);
    }

    #[test]
    fn test_missing_price_skipped_not_fatal() {
        let bad = buy("0x1", "a", "c1", Decimal::ZERO, 10);
        let good = buy("0x2", "b", "c2", dec!(0.5), 20);

        let result = normalize(&[bad, good], &[], &HashMap::new());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].transaction_hash, "0x2");
    }

    #[test]
    fn test_output_sorted_chronologically() {
        let late = buy("0x1", "a", "c1", dec!(0.5), 300);
        let early = buy("0x2", "b", "c2", dec!(0.5), 100);
        let mid = buy("0x3", "c", "c3", dec!(0.5), 200);

        let result = normalize(&[late, early, mid], &[], &HashMap::new());
        let hashes: Vec<_> = result.iter().map(|t| t.transaction_hash.as_str()).collect();
        assert_eq!(hashes, vec!["0x2", "0x3", "0x1"]);
    }
}
