//! # Keyman Engine
//!
//! Composite operational-importance index over actors:
//!
//! ```text
//! KI = C_norm × 0.30 + F_norm × 0.50 + RV_norm × 0.20
//! ```
//!
//! - C: distinct counterparts in the flow list
//! - F: inflow + outflow volume
//! - RV: the score engine's 0–100 normalized score
//!
//! Each component is divided by the largest value seen in the run, with
//! the divisor floored at 1.
//!
//! Role labels, network impact and removal reports are derived from the
//! same undirected counterpart graph built from the flow list. Bridge-node
//! queries run on the registry's entity graph instead.

mod bridge;

use std::collections::BTreeMap;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::{ActorId, FlowRecord, Role, RoleSet};
use crate::registry::Registry;
use crate::score::{ScoreBoard, ScoreResult};

pub use bridge::{bridge_nodes, BRIDGE_MAX_DEPTH, BRIDGE_MAX_PATHS};

pub const W_CONNECTIONS: f64 = 0.30;
pub const W_FLOW: f64 = 0.50;
pub const W_REAL_VALUE: f64 = 0.20;

/// Share of actors labelled per role.
pub const ROLE_PERCENTILE: f64 = 0.10;
/// Impact at or above which an actor is a `Bottleneck`.
pub const BOTTLENECK_IMPACT: f64 = 0.30;
/// Partners listed per actor.
pub const TOP_PARTNERS: usize = 5;

// ============================================================================
// Flow aggregation
// ============================================================================

/// Flow totals of one actor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowTotals {
    pub inflow: f64,
    pub outflow: f64,
    /// Volume exchanged with each counterpart, both directions.
    pub partners: HashMap<ActorId, f64>,
}

impl FlowTotals {
    pub fn volume(&self) -> f64 {
        self.inflow + self.outflow
    }

    pub fn connections(&self) -> usize {
        self.partners.len()
    }
}

/// Aggregate a flat flow list by endpoint. Non-finite amounts are skipped;
/// self-flows count towards volume but create no counterpart.
pub fn aggregate_flows(flows: &[FlowRecord]) -> HashMap<ActorId, FlowTotals> {
    let mut totals: HashMap<ActorId, FlowTotals> = HashMap::new();
    for flow in flows.iter().filter(|f| f.amount.is_finite()) {
        let out = totals.entry(flow.source.clone()).or_default();
        out.outflow += flow.amount;
        if flow.source != flow.target {
            *out.partners.entry(flow.target.clone()).or_insert(0.0) += flow.amount;
        }

        let inn = totals.entry(flow.target.clone()).or_default();
        inn.inflow += flow.amount;
        if flow.source != flow.target {
            *inn.partners.entry(flow.source.clone()).or_insert(0.0) += flow.amount;
        }
    }
    totals
}

// ============================================================================
// Result types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPartner {
    pub actor_id: ActorId,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeymanScore {
    pub actor_id: ActorId,
    pub connections: usize,
    pub total_volume: f64,
    pub inflow: f64,
    pub outflow: f64,
    pub score: Option<ScoreResult>,
    pub c_norm: f64,
    pub f_norm: f64,
    pub rv_norm: f64,
    pub ki: f64,
    /// 1-based position by descending KI.
    pub ki_rank: usize,
    pub roles: RoleSet,
    /// Share of the counterpart graph's edges lost on removal, ≤ 1.
    pub network_impact: f64,
    pub top_partners: Vec<TradingPartner>,
}

/// Read-only removal report for one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeymanRemoval {
    pub actor_id: ActorId,
    pub direct_connections: usize,
    /// Counterparts whose only counterpart is the removed actor.
    pub isolated_peers: Vec<ActorId>,
    pub flow_volume_lost: f64,
    pub network_impact: f64,
    pub roles: RoleSet,
}

/// Keyman scores of one run, ordered by KI rank.
#[derive(Debug, Clone, Default)]
pub struct KeymanTable {
    scores: Vec<KeymanScore>,
    index: HashMap<ActorId, usize>,
    totals: HashMap<ActorId, FlowTotals>,
    /// Sum of every endpoint's counterpart count.
    pub total_connections: usize,
}

impl KeymanTable {
    pub fn get(&self, id: &str) -> Option<&KeymanScore> {
        self.index.get(id).map(|&i| &self.scores[i])
    }

    pub fn ranked(&self) -> &[KeymanScore] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn with_role(&self, role: Role) -> Vec<&KeymanScore> {
        self.scores.iter().filter(|s| s.roles.contains(role)).collect()
    }

    /// Actors per role.
    pub fn role_counts(&self) -> BTreeMap<Role, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.scores {
            for role in s.roles.iter() {
                *counts.entry(role).or_insert(0) += 1;
            }
        }
        counts
    }

    /// What removing `actor_id` would cost. Never mutates anything.
    pub fn simulate_removal(&self, actor_id: &str) -> Option<KeymanRemoval> {
        let score = self.get(actor_id)?;
        let mut isolated_peers: Vec<ActorId> = self
            .totals
            .get(actor_id)
            .map(|t| {
                t.partners
                    .keys()
                    .filter(|peer| {
                        self.totals
                            .get(peer.as_str())
                            .is_some_and(|pt| pt.partners.len() == 1 && pt.partners.contains_key(actor_id))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        isolated_peers.sort();

        Some(KeymanRemoval {
            actor_id: score.actor_id.clone(),
            direct_connections: score.connections,
            isolated_peers,
            flow_volume_lost: score.total_volume,
            network_impact: score.network_impact,
            roles: score.roles.clone(),
        })
    }
}

// ============================================================================
// KeymanEngine
// ============================================================================

pub struct KeymanEngine<'a> {
    registry: &'a Registry,
    flows: &'a [FlowRecord],
    scores: &'a ScoreBoard,
}

impl<'a> KeymanEngine<'a> {
    pub fn new(registry: &'a Registry, flows: &'a [FlowRecord], scores: &'a ScoreBoard) -> Self {
        Self { registry, flows, scores }
    }

    /// KI, rank, roles and impact for every registry actor.
    pub fn compute_all(&self) -> KeymanTable {
        let totals = aggregate_flows(self.flows);
        let total_connections: usize = totals.values().map(FlowTotals::connections).sum();
        let empty = FlowTotals::default();

        let mut scores: Vec<KeymanScore> = self
            .registry
            .ids()
            .into_iter()
            .map(|id| {
                let t = totals.get(&id).unwrap_or(&empty);
                let mut partners: Vec<TradingPartner> = t
                    .partners
                    .iter()
                    .map(|(peer, &volume)| TradingPartner { actor_id: peer.clone(), volume })
                    .collect();
                partners.sort_by(|a, b| b.volume.total_cmp(&a.volume).then_with(|| a.actor_id.cmp(&b.actor_id)));
                partners.truncate(TOP_PARTNERS);

                let connections = t.connections();
                let network_impact = if total_connections == 0 {
                    0.0
                } else {
                    ((connections * 2) as f64 / total_connections as f64).min(1.0)
                };

                KeymanScore {
                    score: self.scores.get(id.as_str()).cloned(),
                    actor_id: id,
                    connections,
                    total_volume: t.volume(),
                    inflow: t.inflow,
                    outflow: t.outflow,
                    c_norm: 0.0,
                    f_norm: 0.0,
                    rv_norm: 0.0,
                    ki: 0.0,
                    ki_rank: 0,
                    roles: RoleSet::new(),
                    network_impact,
                    top_partners: partners,
                }
            })
            .collect();

        normalize(&mut scores);
        classify_roles(&mut scores);

        scores.sort_by(|a, b| b.ki.total_cmp(&a.ki).then_with(|| a.actor_id.cmp(&b.actor_id)));
        let mut index = HashMap::with_capacity(scores.len());
        for (i, s) in scores.iter_mut().enumerate() {
            s.ki_rank = i + 1;
            index.insert(s.actor_id.clone(), i);
        }

        tracing::debug!(actors = scores.len(), total_connections, "keyman table computed");
        KeymanTable { scores, index, totals, total_connections }
    }

    /// Actors on every path between `source` and `target` in the entity
    /// graph. See [`bridge_nodes`].
    pub fn bridge_nodes(&self, source: &str, target: &str) -> Vec<ActorId> {
        bridge_nodes(self.registry, source, target)
    }
}

fn real_value(s: &KeymanScore) -> f64 {
    s.score.as_ref().map_or(0.0, |r| r.normalized_score)
}

/// Divide by the run maximum, divisor floored at 1.
fn max_floor(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(1.0, f64::max)
}

fn normalize(scores: &mut [KeymanScore]) {
    let max_c = max_floor(scores.iter().map(|s| s.connections as f64));
    let max_f = max_floor(scores.iter().map(|s| s.total_volume));
    let max_rv = max_floor(scores.iter().map(real_value));

    for s in scores.iter_mut() {
        s.c_norm = (s.connections as f64 / max_c).clamp(0.0, 1.0);
        s.f_norm = (s.total_volume / max_f).clamp(0.0, 1.0);
        s.rv_norm = (real_value(s) / max_rv).clamp(0.0, 1.0);
        s.ki = s.c_norm * W_CONNECTIONS + s.f_norm * W_FLOW + s.rv_norm * W_REAL_VALUE;
    }
}

/// Indices of the top `k` by `key`, restricted to strictly positive keys.
fn top_k_by(scores: &[KeymanScore], k: usize, key: impl Fn(&KeymanScore) -> f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).filter(|&i| key(&scores[i]) > 0.0).collect();
    order.sort_by(|&a, &b| {
        key(&scores[b])
            .total_cmp(&key(&scores[a]))
            .then_with(|| scores[a].actor_id.cmp(&scores[b].actor_id))
    });
    order.truncate(k);
    order
}

fn classify_roles(scores: &mut [KeymanScore]) {
    let n = scores.len();
    if n == 0 {
        return;
    }
    let k = ((n as f64 * ROLE_PERCENTILE).ceil() as usize).max(1);

    let hubs = top_k_by(scores, k, |s| s.connections as f64);
    let sinks = top_k_by(scores, k, |s| s.inflow);
    let sources = top_k_by(scores, k, |s| s.outflow);

    for i in hubs {
        scores[i].roles.insert(Role::Hub);
    }
    for i in sinks {
        scores[i].roles.insert(Role::Sink);
    }
    for i in sources {
        scores[i].roles.insert(Role::Source);
    }
    for s in scores.iter_mut() {
        if s.roles.contains(Role::Hub) && (s.roles.contains(Role::Sink) || s.roles.contains(Role::Source)) {
            s.roles.insert(Role::Broker);
        }
        if s.network_impact >= BOTTLENECK_IMPACT {
            s.roles.insert(Role::Bottleneck);
        }
    }
}
