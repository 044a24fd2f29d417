//! # Parameter Set
//!
//! Immutable configuration consumed by the score engine: Ψ weights, time
//! decay, the stabilizing ε, rank thresholds and the interference /
//! centrality / normalization constants.
//!
//! Loaded once per run (defaults, JSON string or JSON file) and shared by
//! `Arc` across every score computation. Partial JSON documents override
//! only the options they name:
//!
//! ```json
//! { "decay_rate": 0.1, "thresholds": { "archon": 0.02 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{Dimension, Psi};
use crate::{Error, Result};

// ============================================================================
// Weights
// ============================================================================

/// One weight per Ψ dimension. E is negative: exposure lowers the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub g: f64,
    pub r: f64,
    pub e: f64,
    pub t: f64,
    pub n: f64,
    pub l: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self { g: 0.25, r: 0.20, e: -0.15, t: 0.15, n: 0.15, l: 0.10 }
    }
}

impl Weights {
    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Governance => self.g,
            Dimension::Reputation => self.r,
            Dimension::Exposure => self.e,
            Dimension::Throughput => self.t,
            Dimension::Network => self.n,
            Dimension::Liquidity => self.l,
        }
    }

    /// `W_k · Ψ_k` for every dimension, in `Dimension::ALL` order.
    pub fn contributions(&self, psi: &Psi) -> [(Dimension, f64); 6] {
        Dimension::ALL.map(|d| (d, self.get(d) * psi.get(d)))
    }

    /// `Σ_k W_k · Ψ_k`.
    pub fn dot(&self, psi: &Psi) -> f64 {
        self.contributions(psi).iter().map(|(_, c)| c).sum()
    }

    fn all(&self) -> [f64; 6] {
        [self.g, self.r, self.e, self.t, self.n, self.l]
    }
}

// ============================================================================
// Rank thresholds
// ============================================================================

/// Percentile cutoffs (fraction of actors strictly above) plus the auxiliary
/// condition attached to each tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankThresholds {
    pub sovereign: f64,
    pub archon: f64,
    pub archon_min_centrality: f64,
    pub validator: f64,
    pub validator_max_exposure: f64,
    pub operator: f64,
    pub operator_min_liquidity: f64,
}

impl Default for RankThresholds {
    fn default() -> Self {
        Self {
            sovereign: 0.0001,
            archon: 0.01,
            archon_min_centrality: 0.001,
            validator: 0.10,
            validator_max_exposure: 0.7,
            operator: 0.50,
            operator_min_liquidity: 0.05,
        }
    }
}

// ============================================================================
// ParameterSet
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    pub weights: Weights,
    /// λ in `e^(−λt)`, per year.
    pub decay_rate: f64,
    /// ε added to the inertia denominator.
    pub epsilon: f64,
    pub thresholds: RankThresholds,
    /// Scales `Σ χ_ij · S_i · S_j` before it joins the Ψ term.
    pub interference_scale: f64,
    /// ν = 1 + centrality × centrality_boost.
    pub centrality_boost: f64,
    /// Raw score mapped to 100 on the normalized scale.
    pub max_score: f64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            decay_rate: 0.05,
            epsilon: 1e-6,
            thresholds: RankThresholds::default(),
            interference_scale: 0.1,
            centrality_boost: 1.0,
            max_score: 10.0,
        }
    }
}

impl ParameterSet {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: ParameterSet = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Read and parse a JSON parameter file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let params = Self::from_json_str(&raw)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded parameter set");
        Ok(params)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.weights.all().iter().any(|w| !w.is_finite()) {
            return Err(Error::Config("weights must be finite".into()));
        }
        if !(self.epsilon > 0.0) {
            return Err(Error::Config(format!("epsilon must be positive, got {}", self.epsilon)));
        }
        if !(self.max_score > 0.0) {
            return Err(Error::Config(format!("max_score must be positive, got {}", self.max_score)));
        }
        if !(self.decay_rate >= 0.0) {
            return Err(Error::Config(format!("decay_rate must be non-negative, got {}", self.decay_rate)));
        }
        if !self.interference_scale.is_finite() || !self.centrality_boost.is_finite() {
            return Err(Error::Config("interference_scale and centrality_boost must be finite".into()));
        }

        let t = &self.thresholds;
        let cutoffs = [t.sovereign, t.archon, t.validator, t.operator];
        if cutoffs.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(Error::Config("rank cutoffs must lie in [0, 1]".into()));
        }
        if cutoffs.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::Config(
                "rank cutoffs must be non-decreasing from sovereign to operator".into(),
            ));
        }
        Ok(())
    }
}
