//! # Score Engine
//!
//! Per-actor importance:
//!
//! ```text
//! S = [(Σ_k W_k·Ψ_k) + κ·(Σ_j χ_ij·S_i·S_j)] × ν × e^(−λt) / (I + ε)
//!
//!   ν = 1 + centrality × centrality_boost
//!   I = G / (L + 1)          liquidity inertia
//!   κ = interference_scale
//! ```
//!
//! The interference sum needs every neighbour's own score, so scoring runs
//! in two passes over immutable snapshots:
//!
//! 1. `pass1`: Ψ term only, interference treated as zero.
//! 2. `pass2`: every actor rescored with the complete pass-1 snapshot as
//!    `S_i`/`S_j`.
//!
//! This is one fixed-point update, not an iterated solver. χ is bounded in
//! `[-1, 1]` and κ scales the correction, which keeps the one-step
//! approximation close. Pass 2 must not start before pass 1 has finished
//! for every actor.

mod rank;

use std::collections::BTreeMap;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::{ActorId, Dimension};
use crate::params::ParameterSet;
use crate::registry::Registry;

pub use rank::{assign_rank, percentile, Rank};

/// Neighbours kept in a breakdown.
pub const TOP_NEIGHBORS: usize = 3;

// ============================================================================
// Result types
// ============================================================================

/// `W_k · Ψ_k` for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionContribution {
    pub dimension: Dimension,
    pub value: f64,
}

/// One neighbour's share of the interference term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborContribution {
    pub actor_id: ActorId,
    pub coupling: f64,
    /// `κ · χ_ij · S_i · S_j`.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub psi_term: f64,
    pub interference: f64,
    /// ν.
    pub centrality_factor: f64,
    pub decay_factor: f64,
    pub inertia: f64,
    pub contributions: Vec<DimensionContribution>,
    pub top_neighbors: Vec<NeighborContribution>,
}

/// Unranked score of a single actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub raw: f64,
    /// `raw / max_score` on a 0–100 scale, clamped.
    pub normalized: f64,
    pub breakdown: ScoreBreakdown,
}

/// Ranked score of an actor within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub actor_id: ActorId,
    pub raw_score: f64,
    pub normalized_score: f64,
    pub rank: Rank,
    /// Fraction of actors in the run with a strictly higher score.
    pub percentile: f64,
    pub breakdown: ScoreBreakdown,
}

/// Output of a full two-pass run.
#[derive(Debug, Clone, Default)]
pub struct ScoreBoard {
    /// Pass-1 scores (no interference).
    pub pass1: HashMap<ActorId, f64>,
    /// Final results ordered by descending score, ties by id.
    results: Vec<ScoreResult>,
    index: HashMap<ActorId, usize>,
}

impl ScoreBoard {
    pub fn get(&self, id: &str) -> Option<&ScoreResult> {
        self.index.get(id).map(|&i| &self.results[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoreResult> {
        self.results.iter()
    }

    pub fn top(&self, n: usize) -> &[ScoreResult] {
        &self.results[..n.min(self.results.len())]
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_results(self) -> Vec<ScoreResult> {
        self.results
    }

    /// Actors per tier.
    pub fn rank_counts(&self) -> BTreeMap<Rank, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.results {
            *counts.entry(r.rank).or_insert(0) += 1;
        }
        counts
    }
}

// ============================================================================
// ScoreEngine
// ============================================================================

/// Scores actors of one registry under one parameter set.
pub struct ScoreEngine<'a> {
    registry: &'a Registry,
    params: &'a ParameterSet,
}

impl<'a> ScoreEngine<'a> {
    pub fn new(registry: &'a Registry, params: &'a ParameterSet) -> Self {
        Self { registry, params }
    }

    /// Score one actor. `neighbor_scores` is the pass-1 snapshot; without it
    /// the interference term is zero. `None` if the actor is unknown.
    pub fn score(
        &self,
        actor_id: &str,
        time_years: f64,
        neighbor_scores: Option<&HashMap<ActorId, f64>>,
    ) -> Option<Score> {
        let actor = self.registry.get(actor_id)?;
        let p = self.params;

        let contributions: Vec<DimensionContribution> = p
            .weights
            .contributions(&actor.psi)
            .into_iter()
            .map(|(dimension, value)| DimensionContribution { dimension, value })
            .collect();
        let psi_term = p.weights.dot(&actor.psi);

        let centrality_factor = 1.0 + actor.centrality * p.centrality_boost;
        let decay_factor = (-p.decay_rate * time_years.max(0.0)).exp();
        let inertia = actor.psi.inertia();
        let scale = centrality_factor * decay_factor / (inertia + p.epsilon);

        let mut neighbors = Vec::new();
        let mut interference = 0.0;
        if let Some(snapshot) = neighbor_scores {
            // S_i comes from the same snapshot as S_j.
            let s_i = match snapshot.get(actor_id) {
                Some(&s) => s,
                None => psi_term * scale,
            };
            for (peer, chi) in self.registry.neighbors(actor_id) {
                let Some(&s_j) = snapshot.get(peer) else { continue };
                let contribution = p.interference_scale * chi * s_i * s_j;
                interference += contribution;
                neighbors.push(NeighborContribution {
                    actor_id: peer.clone(),
                    coupling: chi,
                    contribution,
                });
            }
            neighbors.sort_by(|a, b| {
                b.contribution
                    .abs()
                    .total_cmp(&a.contribution.abs())
                    .then_with(|| a.actor_id.cmp(&b.actor_id))
            });
            neighbors.truncate(TOP_NEIGHBORS);
        }

        let raw = (psi_term + interference) * scale;
        let normalized = if raw.is_finite() {
            (raw / p.max_score * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        Some(Score {
            raw,
            normalized,
            breakdown: ScoreBreakdown {
                psi_term,
                interference,
                centrality_factor,
                decay_factor,
                inertia,
                contributions,
                top_neighbors: neighbors,
            },
        })
    }

    /// Pass 1: every actor without interference.
    pub fn pass1(&self, time_years: f64) -> HashMap<ActorId, f64> {
        self.registry
            .ids()
            .into_iter()
            .filter_map(|id| {
                let s = self.score(id.as_str(), time_years, None)?;
                Some((id, s.raw))
            })
            .collect()
    }

    /// Both passes, then percentile and rank for every actor.
    pub fn score_all(&self, time_years: f64) -> ScoreBoard {
        let pass1 = self.pass1(time_years);

        // Barrier: the full pass-1 snapshot exists before any pass-2 score.
        let mut scored: Vec<(ActorId, Score)> = self
            .registry
            .ids()
            .into_iter()
            .filter_map(|id| {
                let s = self.score(id.as_str(), time_years, Some(&pass1))?;
                Some((id, s))
            })
            .collect();
        scored.sort_by(|(ia, a), (ib, b)| b.raw.total_cmp(&a.raw).then_with(|| ia.cmp(ib)));

        // Sorted descending, as `percentile` expects.
        let raws: Vec<f64> = scored.iter().map(|(_, s)| s.raw).collect();
        let n = raws.len();
        let t = &self.params.thresholds;

        let mut results = Vec::with_capacity(n);
        let mut index = HashMap::with_capacity(n);
        for (i, (id, score)) in scored.into_iter().enumerate() {
            let pct = percentile(score.raw, &raws);
            let rank = match self.registry.get(id.as_str()) {
                Some(actor) => assign_rank(pct, actor.centrality, actor.psi.e, actor.psi.l, t),
                None => Rank::Terminal,
            };
            index.insert(id.clone(), i);
            results.push(ScoreResult {
                actor_id: id,
                raw_score: score.raw,
                normalized_score: score.normalized,
                rank,
                percentile: pct,
                breakdown: score.breakdown,
            });
        }

        tracing::debug!(actors = n, time_years, "score passes complete");
        ScoreBoard { pass1, results, index }
    }
}

/// Two-pass scoring of every actor in `registry`.
pub fn score_all(registry: &Registry, params: &ParameterSet, time_years: f64) -> ScoreBoard {
    ScoreEngine::new(registry, params).score_all(time_years)
}
