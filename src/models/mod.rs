//! Data models for raw activity, normalized trades, and strategy configs.

mod config;
mod normalized;
mod raw;

pub use config::StrategyConfig;
pub use normalized::{NormalizedTrade, TradeOutcome};
pub use raw::{ClosedPosition, MarketOutcome, MarketStatus, RawTrade, TradeSide};
