//! Copy-Trading Backtest Simulator
//!
//! Replays another trader's Polymarket activity against a fixed-bet
//! bankroll, scores the outcome, and sweeps strategy parameters to find
//! configurations worth running live.

mod history;
mod models;
mod normalize;
mod optimize;
mod sim;
mod stats;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::history::{JsonFileRepository, RunRepository};
use crate::models::{ClosedPosition, MarketStatus, NormalizedTrade, RawTrade, StrategyConfig};
use crate::normalize::normalize;
use crate::optimize::{cross_analyze, group_by_fingerprint, sweep, RunRecord, SweepAxis};
use crate::sim::{resolve, simulate, OutcomeSampler};
use crate::stats::{aggregate, pnl_trend, price_bucket_win_rates, test_significance};

/// Copy-trading backtest simulator CLI.
#[derive(Parser)]
#[command(name = "copysim")]
#[command(about = "Backtest copy-trading strategies on Polymarket trade history", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trader's activity with one strategy configuration
    Simulate {
        /// Activity feed JSON (array of raw trades)
        #[arg(short, long)]
        activity: String,

        /// Closed positions JSON (array)
        #[arg(short, long)]
        closed: String,

        /// Market status JSON (array), used for trades never sold back
        #[arg(short, long)]
        markets: Option<String>,

        /// Starting bankroll in USD
        #[arg(short, long, default_value = "1000")]
        budget: f64,

        /// Fixed bet per copied trade in USD
        #[arg(long, default_value = "10")]
        bet: f64,

        /// Minimum notional of the source trade to copy it
        #[arg(short, long, default_value = "0")]
        trigger: f64,

        /// Lower bound of the copyable price band
        #[arg(long, default_value = "0")]
        min_price: f64,

        /// Upper bound of the copyable price band
        #[arg(long, default_value = "1")]
        max_price: f64,

        /// Draw synthetic outcomes for still-open trades
        #[arg(long)]
        draw_open: bool,

        /// RNG seed for synthetic draws (random when omitted)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Re-resolve open trades from a newer closed-positions file
        #[arg(long)]
        resolve_with: Option<String>,

        /// Append the run to this history file
        #[arg(long)]
        save: Option<String>,

        /// Label for the saved run
        #[arg(long)]
        name: Option<String>,
    },

    /// Sweep one parameter axis and rank the candidates
    Optimize {
        /// Activity feed JSON (array of raw trades)
        #[arg(short, long)]
        activity: String,

        /// Closed positions JSON (array)
        #[arg(short, long)]
        closed: String,

        /// Axis to sweep: trigger, price-range, or budget-bet
        #[arg(short = 'x', long, default_value = "trigger")]
        axis: SweepAxis,

        /// Minimum qualifying trades for a candidate to count
        #[arg(long, default_value = "10")]
        min_sample: usize,

        /// RNG seed for the budget-bet axis (random when omitted)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Number of ranked candidates to show
        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Binomial z-test: is a win rate distinguishable from a coin flip?
    Significance {
        /// Number of winning trades
        wins: u32,

        /// Total closed trades
        total: u32,
    },

    /// Compare saved runs and recommend one configuration
    Cross {
        /// History file written by 'simulate --save'
        #[arg(long, default_value = "copysim-history.json")]
        history: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Simulate {
            activity,
            closed,
            markets,
            budget,
            bet,
            trigger,
            min_price,
            max_price,
            draw_open,
            seed,
            resolve_with,
            save,
            name,
        } => {
            let config = StrategyConfig {
                initial_budget: Decimal::try_from(budget)?,
                fixed_bet_amount: Decimal::try_from(bet)?,
                min_trigger_amount: Decimal::try_from(trigger)?,
                min_price: Decimal::try_from(min_price)?,
                max_price: Decimal::try_from(max_price)?,
            };

            let trades = load_normalized(&activity, &closed, markets.as_deref())?;
            info!(trades = trades.len(), "Normalized trade history loaded");

            let mut sampler = seed
                .map(OutcomeSampler::seeded)
                .unwrap_or_else(OutcomeSampler::from_entropy);
            let drawn = draw_open.then_some(&mut sampler);

            let mut run = simulate(&trades, &config, drawn)?;

            if let Some(path) = resolve_with {
                let newly_closed: Vec<ClosedPosition> = load_json(&path)?;
                run = resolve(run, &newly_closed);
            }

            println!("{}", run);

            let trade_stats = aggregate(&run.trades);
            println!("{}", trade_stats);

            println!("\n--- Win Rate by Entry Price ---");
            for bucket in price_bucket_win_rates(&run.trades, 5) {
                println!(
                    "  [{:.2}, {:.2})  {:>3} closed  {:>5.1}% won",
                    bucket.low, bucket.high, bucket.closed_trades, bucket.win_rate
                );
            }

            if let Some(trend) = pnl_trend(&run.trades) {
                println!("\n--- P&L Trend (per closed trade) ---");
                println!("  Slope:     {:+.4}", trend.slope);
                println!("  Next P&L:  {:+.2} (projected)", trend.project(trade_stats.closed_trades as f64));
            }

            println!(
                "\n{}",
                test_significance(trade_stats.wins as u32, trade_stats.closed_trades as u32)
            );

            if let Some(path) = save {
                let repo = JsonFileRepository::new(path);
                repo.append(RunRecord {
                    name,
                    config,
                    trades: run.trades,
                })?;
            }
        }

        Commands::Optimize {
            activity,
            closed,
            axis,
            min_sample,
            seed,
            top,
        } => {
            let trades = load_normalized(&activity, &closed, None)?;
            info!(trades = trades.len(), axis = ?axis, "Starting parameter sweep");

            let mut sampler = seed
                .map(OutcomeSampler::seeded)
                .unwrap_or_else(OutcomeSampler::from_entropy);

            let ranked = sweep(&trades, axis, min_sample, &mut sampler)?;
            if ranked.is_empty() {
                println!("No candidate reached {} qualifying trades.", min_sample);
                return Ok(());
            }

            println!(
                "\n{:<4} {:>8} {:>8} {:>7} {:>6} {:>7} {:>6} {:>9} {:>8} {:>10}",
                "#", "BUDGET", "BET", "TRIG", "MIN_P", "MAX_P", "N", "WIN%", "AVG_PNL", "FINAL_BAL"
            );
            println!("{}", "-".repeat(84));

            for (i, c) in ranked.iter().take(top).enumerate() {
                println!(
                    "{:<4} {:>8} {:>8} {:>7} {:>6} {:>7} {:>6} {:>8.1}% {:>8.2} {:>10.2}",
                    i + 1,
                    c.config.initial_budget,
                    c.config.fixed_bet_amount,
                    c.config.min_trigger_amount,
                    c.config.min_price,
                    c.config.max_price,
                    c.trade_count,
                    c.win_rate,
                    c.avg_pnl,
                    c.avg_final_balance
                );
            }
        }

        Commands::Significance { wins, total } => {
            println!("{}", test_significance(wins, total));
        }

        Commands::Cross { history } => {
            let repo = JsonFileRepository::new(&history);
            let records = repo.load()?;
            if records.is_empty() {
                println!("No saved runs in {}. Use 'copysim simulate --save' first.", history);
                return Ok(());
            }

            let groups = group_by_fingerprint(&records);
            println!(
                "\n{:>4} runs across {} distinct configurations\n",
                records.len(),
                groups.len()
            );

            println!(
                "{:<8} {:>8} {:>7} {:>6} {:>7} {:>5} {:>7} {:>9} {:>10}",
                "BUDGET", "BET", "TRIG", "MIN_P", "MAX_P", "RUNS", "TRADES", "WIN%", "TOTAL_PNL"
            );
            println!("{}", "-".repeat(74));
            for group in &groups {
                println!(
                    "{:<8} {:>8} {:>7} {:>6} {:>7} {:>5} {:>7} {:>8.1}% {:>10.2}",
                    group.config.initial_budget,
                    group.config.fixed_bet_amount,
                    group.config.min_trigger_amount,
                    group.config.min_price,
                    group.config.max_price,
                    group.runs,
                    group.trades.len(),
                    group.stats.win_rate,
                    group.stats.total_pnl
                );
            }

            println!("\n{}", cross_analyze(&records));
        }
    }

    Ok(())
}

/// Load the three input feeds and produce the normalized trade list.
fn load_normalized(
    activity_path: &str,
    closed_path: &str,
    markets_path: Option<&str>,
) -> Result<Vec<NormalizedTrade>> {
    let activity: Vec<RawTrade> = load_json(activity_path)?;
    let closed: Vec<ClosedPosition> = load_json(closed_path)?;

    let market_status: HashMap<String, MarketStatus> = match markets_path {
        Some(path) => {
            let markets: Vec<MarketStatus> = load_json(path)?;
            markets
                .into_iter()
                .map(|m| (m.condition_id.clone(), m))
                .collect()
        }
        None => HashMap::new(),
    };

    Ok(normalize(&activity, &closed, &market_status))
}

fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}
