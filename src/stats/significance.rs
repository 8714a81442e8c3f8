//! Binomial significance test for observed win rates.
//!
//! Judges whether a win rate is distinguishable from a 50/50 coin via a
//! two-tailed binomial proportion z-test against p0 = 0.5.

use statrs::distribution::{ContinuousCDF, Normal};

/// Minimum closed-trade sample for the z-approximation to be meaningful.
pub const MIN_SAMPLE_SIZE: u32 = 50;

/// Two-tailed significance threshold.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Outcome of a significance test. An insufficient sample is a valid
/// terminal result, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Significance {
    InsufficientSample { total: u32, required: u32 },
    Tested { z_score: f64, p_value: f64, significant: bool },
}

impl Significance {
    pub fn is_significant(&self) -> bool {
        matches!(
            self,
            Significance::Tested {
                significant: true,
                ..
            }
        )
    }
}

impl std::fmt::Display for Significance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Significance::InsufficientSample { total, required } => {
                write!(
                    f,
                    "insufficient sample: {} trades, {} required",
                    total, required
                )
            }
            Significance::Tested {
                z_score,
                p_value,
                significant,
            } => write!(
                f,
                "z = {:.3}, p = {:.4} ({})",
                z_score,
                p_value,
                if *significant {
                    "significant"
                } else {
                    "not significant"
                }
            ),
        }
    }
}

/// Test `wins` out of `total` closed trades against the 50% null
/// hypothesis. Requires `total >= 50`; below that an explicit
/// insufficient-sample result is returned.
pub fn test_significance(wins: u32, total: u32) -> Significance {
    if total < MIN_SAMPLE_SIZE {
        return Significance::InsufficientSample {
            total,
            required: MIN_SAMPLE_SIZE,
        };
    }

    let observed_rate = wins.min(total) as f64 / total as f64;
    let standard_error = (0.5 * 0.5 / total as f64).sqrt();
    let z_score = (observed_rate - 0.5) / standard_error;

    let normal = Normal::new(0.0, 1.0).expect("standard normal parameters are valid");
    let p_value = 2.0 * (1.0 - normal.cdf(z_score.abs()));

    Significance::Tested {
        z_score,
        p_value,
        significant: p_value < SIGNIFICANCE_LEVEL,
    }
}
