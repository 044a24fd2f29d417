//! # influence-rs: Influence Scoring and Flow Analytics
//!
//! Scores the influence of economic actors from a six-dimensional state
//! vector (Ψ), their position in a coupling graph and time decay; ranks
//! them into tiers; finds keymen and structural roles; traces money flows
//! through a directed multigraph; and rolls metrics up a geographic
//! World → Block hierarchy.
//!
//! ## Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`model`] | DTOs: actors, Ψ, flows, scale nodes, roles |
//! | [`params`] | Tunable weights and thresholds, JSON loadable |
//! | [`registry`] | Actor map, coupling graph, eigenvector centrality |
//! | [`score`] | Two-pass influence scoring, percentiles, ranks |
//! | [`keyman`] | Keyman index, role labels, removal what-ifs, bridges |
//! | [`flow`] | Flow multigraph, path search, bottlenecks |
//! | [`scale`] | Five-level hierarchy with bottom-up aggregation |
//!
//! ## Quick Start
//!
//! ```rust
//! use influence_rs::{EntityRecord, FlowRecord, FlowType, Network, ParameterSet};
//!
//! # fn example() -> influence_rs::Result<()> {
//! let network = Network::new(ParameterSet::default())?;
//! let stats = network.ingest(
//!     &[EntityRecord::new("a", "Alpha", 1e9), EntityRecord::new("b", "Beta", 1e6)],
//!     vec![FlowRecord::new("f1", "a", "b", 5e5, FlowType::Trade)],
//! );
//! assert_eq!(stats.flows_accepted, 1);
//!
//! let report = network.analyze(1.0);
//! for result in report.scores.iter() {
//!     println!("{} {:.2} {}", result.actor_id, result.normalized_score, result.rank);
//! }
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod params;
pub mod registry;
pub mod score;
pub mod keyman;
pub mod flow;
pub mod scale;

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    Actor, ActorId, BoundingBox, Dimension, EntityRecord, FlowId, FlowRecord, FlowType, GeoPoint, Psi, Role,
    RoleSet, ScaleLevel, ScaleNode, ScaleNodeId,
};
pub use params::{ParameterSet, RankThresholds, Weights};
pub use registry::{IngestOptions, Registry};
pub use score::{Rank, ScoreBoard, ScoreEngine, ScoreResult};
pub use keyman::{KeymanEngine, KeymanRemoval, KeymanScore, KeymanTable};
pub use flow::{FlowBottleneck, FlowEngine, FlowPath, FlowRemoval};
pub use scale::ScaleEngine;

// ============================================================================
// Network handle
// ============================================================================

/// Shared handle over the three engines.
///
/// Each engine sits behind its own lock. Mutations go through the
/// `with_*_mut` closures or [`Network::ingest`]; [`Network::analyze`] reads
/// a consistent snapshot. Cloning is cheap and shares state.
#[derive(Clone)]
pub struct Network {
    inner: Arc<NetworkInner>,
}

struct NetworkInner {
    params: ParameterSet,
    ingest: IngestOptions,
    registry: RwLock<Registry>,
    flows: RwLock<FlowEngine>,
    scale: RwLock<ScaleEngine>,
}

impl Network {
    /// Empty network. Fails when `params` do not validate.
    pub fn new(params: ParameterSet) -> Result<Self> {
        Self::with_options(params, IngestOptions::default())
    }

    pub fn with_options(params: ParameterSet, ingest: IngestOptions) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            inner: Arc::new(NetworkInner {
                params,
                ingest,
                registry: RwLock::new(Registry::new()),
                flows: RwLock::new(FlowEngine::new()),
                scale: RwLock::new(ScaleEngine::new()),
            }),
        })
    }

    pub fn params(&self) -> &ParameterSet {
        &self.inner.params
    }

    pub fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.registry.read()
    }

    pub fn flows(&self) -> RwLockReadGuard<'_, FlowEngine> {
        self.inner.flows.read()
    }

    pub fn scale(&self) -> RwLockReadGuard<'_, ScaleEngine> {
        self.inner.scale.read()
    }

    pub fn with_registry_mut<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        f(&mut self.inner.registry.write())
    }

    pub fn with_flows_mut<R>(&self, f: impl FnOnce(&mut FlowEngine) -> R) -> R {
        f(&mut self.inner.flows.write())
    }

    pub fn with_scale_mut<R>(&self, f: impl FnOnce(&mut ScaleEngine) -> R) -> R {
        f(&mut self.inner.scale.write())
    }

    /// Replace the registry and flow graph with a fresh batch.
    ///
    /// Flows failing validation (negative or non-finite amount, empty
    /// endpoint, duplicate id) are skipped with a warning and counted. The
    /// registry is built from the entities and the accepted flows, in input
    /// order. The scale hierarchy is left alone.
    pub fn ingest(&self, entities: &[EntityRecord], flows: Vec<FlowRecord>) -> IngestStats {
        let mut engine = FlowEngine::new();
        let mut accepted = Vec::with_capacity(flows.len());
        let mut rejected = 0;

        for flow in flows {
            match engine.add_flow(flow.clone()) {
                Ok(()) => accepted.push(flow),
                Err(e) => {
                    tracing::warn!(flow = %flow.id, error = %e, "flow rejected");
                    rejected += 1;
                }
            }
        }

        let registry = Registry::from_records(entities, &accepted, self.inner.ingest);
        let stats = IngestStats {
            actors: registry.len(),
            edges: registry.edge_count(),
            flows_accepted: accepted.len(),
            flows_rejected: rejected,
        };

        // Lock order: registry before flows, everywhere.
        let mut reg = self.inner.registry.write();
        let mut fl = self.inner.flows.write();
        *reg = registry;
        *fl = engine;

        tracing::debug!(%stats, "batch ingested");
        stats
    }

    /// Score, rank and keyman-index every actor `time_years` after the
    /// reference time, and list flow bottlenecks.
    pub fn analyze(&self, time_years: f64) -> AnalysisReport {
        let registry = self.inner.registry.read();
        let flows = self.inner.flows.read();

        let scores = ScoreEngine::new(&registry, &self.inner.params).score_all(time_years);

        let mut records: Vec<FlowRecord> = flows.flows().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        let keyman = KeymanEngine::new(&registry, &records, &scores).compute_all();

        let bottlenecks = flows.find_bottlenecks(flow::DEFAULT_BOTTLENECK_THRESHOLD);

        tracing::debug!(
            actors = scores.len(),
            keymen = keyman.len(),
            bottlenecks = bottlenecks.len(),
            time_years,
            "analysis complete"
        );
        AnalysisReport { scores, keyman, bottlenecks }
    }
}

/// Sizes of each engine. A lock held elsewhere (for example inside a
/// `with_*_mut` closure on a clone of this handle) prints as `<locked>`
/// instead of blocking.
impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("actors", &LockedCount(self.inner.registry.try_read().map(|r| r.len())))
            .field("flows", &LockedCount(self.inner.flows.try_read().map(|fl| fl.flow_count())))
            .field("scale_nodes", &LockedCount(self.inner.scale.try_read().map(|s| s.len())))
            .finish()
    }
}

struct LockedCount(Option<usize>);

impl fmt::Debug for LockedCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{n}"),
            None => f.write_str("<locked>"),
        }
    }
}

/// Outcome of [`Network::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStats {
    pub actors: usize,
    pub edges: usize,
    pub flows_accepted: usize,
    pub flows_rejected: usize,
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IngestStats {{ actors: {}, edges: {}, flows_accepted: {}, flows_rejected: {} }}",
            self.actors, self.edges, self.flows_accepted, self.flows_rejected,
        )
    }
}

/// Everything [`Network::analyze`] produces.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub scores: ScoreBoard,
    pub keyman: KeymanTable,
    pub bottlenecks: Vec<FlowBottleneck>,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_skips_invalid_flows() {
        let net = Network::new(ParameterSet::default()).unwrap();
        let stats = net.ingest(
            &[EntityRecord::new("a", "A", 100.0), EntityRecord::new("b", "B", 10.0)],
            vec![
                FlowRecord::new("f1", "a", "b", 10.0, FlowType::Trade),
                FlowRecord::new("f2", "a", "b", -1.0, FlowType::Trade),
                FlowRecord::new("f3", "a", "b", f64::NAN, FlowType::Trade),
                FlowRecord::new("f1", "b", "a", 1.0, FlowType::Trade),
            ],
        );
        assert_eq!(stats, IngestStats { actors: 2, edges: 1, flows_accepted: 1, flows_rejected: 3 });
        assert_eq!(net.flows().flow_count(), 1);
        assert_eq!(
            stats.to_string(),
            "IngestStats { actors: 2, edges: 1, flows_accepted: 1, flows_rejected: 3 }"
        );
    }

    #[test]
    fn test_clone_shares_state() {
        let net = Network::new(ParameterSet::default()).unwrap();
        let other = net.clone();
        net.with_registry_mut(|r| r.add(Actor::new("x", "X")));
        assert!(other.registry().contains("x"));
    }

    #[test]
    fn test_debug_does_not_block_on_held_lock() {
        let net = Network::new(ParameterSet::default()).unwrap();
        net.ingest(&[EntityRecord::new("a", "A", 1.0)], Vec::new());
        assert_eq!(format!("{net:?}"), "Network { actors: 1, flows: 0, scale_nodes: 0 }");

        let other = net.clone();
        let inside = net.with_registry_mut(|_| format!("{other:?}"));
        assert_eq!(inside, "Network { actors: <locked>, flows: 0, scale_nodes: 0 }");
    }

    #[test]
    fn test_rejects_invalid_params() {
        let params = ParameterSet { max_score: 0.0, ..ParameterSet::default() };
        assert!(matches!(Network::new(params), Err(Error::Config(_))));
    }
}
