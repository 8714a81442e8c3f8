//! Statistics: ledger aggregation, price-bucket win rates, trend fitting,
//! and binomial significance testing.

mod aggregate;
mod significance;

pub use aggregate::{
    aggregate, pnl_trend, price_bucket_win_rates, PriceBucket, StreakKind, TradeStats, TrendLine,
};
pub use significance::{
    test_significance, Significance, MIN_SAMPLE_SIZE, SIGNIFICANCE_LEVEL,
};
