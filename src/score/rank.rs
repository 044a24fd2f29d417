//! Discrete rank tiers and percentile-based assignment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::params::RankThresholds;

/// Rank tier. Declared from least to most exclusive so `Ord` follows
/// exclusivity: `Sovereign > Archon > Validator > Operator > Terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    Terminal,
    Operator,
    Validator,
    Archon,
    Sovereign,
}

impl Rank {
    pub const ALL: [Rank; 5] = [Rank::Sovereign, Rank::Archon, Rank::Validator, Rank::Operator, Rank::Terminal];
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rank::Sovereign => "Sovereign",
            Rank::Archon => "Archon",
            Rank::Validator => "Validator",
            Rank::Operator => "Operator",
            Rank::Terminal => "Terminal",
        };
        f.write_str(s)
    }
}

/// Fraction of `all` strictly greater than `score`.
///
/// `all` must be sorted in descending order; the count of higher scores is
/// found by binary search.
pub fn percentile(score: f64, all: &[f64]) -> f64 {
    if all.is_empty() {
        return 0.0;
    }
    let higher = all.partition_point(|&s| s > score);
    higher as f64 / all.len() as f64
}

/// Assign a tier from the percentile and the actor's auxiliary signals.
///
/// Tiers are tried from most to least exclusive. When a tier's extra
/// condition fails the actor is tested against the next tier, not sent
/// straight to `Terminal`.
pub fn assign_rank(
    percentile: f64,
    centrality: f64,
    exposure: f64,
    liquidity: f64,
    t: &RankThresholds,
) -> Rank {
    if percentile <= t.sovereign {
        Rank::Sovereign
    } else if percentile <= t.archon && centrality > t.archon_min_centrality {
        Rank::Archon
    } else if percentile <= t.validator && exposure < t.validator_max_exposure {
        Rank::Validator
    } else if percentile <= t.operator && liquidity > t.operator_min_liquidity {
        Rank::Operator
    } else {
        Rank::Terminal
    }
}
