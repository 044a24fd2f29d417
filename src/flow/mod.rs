//! # Flow Engine
//!
//! Directed multigraph of money-flow records, independent of the entity
//! registry but keyed by the same actor ids.
//!
//! ```text
//!   forward:  source → target → [flow ids]
//!   reverse:  target → source → [flow ids]
//!   nodes:    every actor touched by at least one flow
//! ```
//!
//! Both indices and the node set are maintained incrementally by
//! `add_flow` / `remove_flow`. Parallel flows between the same ordered
//! pair form one edge whose capacity is the sum of their amounts.
//!
//! Path search lives in [`path`], graph-wide analysis in [`analysis`].

pub mod path;
pub mod analysis;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::model::{ActorId, FlowId, FlowRecord};
use crate::{Error, Result};

pub use analysis::{FlowBottleneck, FlowMatrix, FlowRemoval, TypeTotal, DEFAULT_BOTTLENECK_THRESHOLD};
pub use path::{EdgeBottleneck, FlowPath, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PATHS, PATH_EPSILON};

type Adjacency = HashMap<ActorId, HashMap<ActorId, Vec<FlowId>>>;

/// Per-node flow totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub node: ActorId,
    pub inflow: f64,
    pub outflow: f64,
    /// Distinct nodes sending to this node.
    pub sources: usize,
    /// Distinct nodes this node sends to.
    pub targets: usize,
    pub flow_count: usize,
}

/// Flow multigraph with bidirectional adjacency.
#[derive(Debug, Clone, Default)]
pub struct FlowEngine {
    flows: HashMap<FlowId, FlowRecord>,
    forward: Adjacency,
    reverse: Adjacency,
    nodes: HashSet<ActorId>,
}

impl FlowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a batch; stops at the first invalid or duplicate record.
    pub fn from_flows(flows: impl IntoIterator<Item = FlowRecord>) -> Result<Self> {
        let mut engine = Self::new();
        for flow in flows {
            engine.add_flow(flow)?;
        }
        Ok(engine)
    }

    // ========================================================================
    // Flow CRUD
    // ========================================================================

    /// Index a flow. Rejects invalid amounts (see [`FlowRecord::validate`])
    /// and ids already present.
    pub fn add_flow(&mut self, flow: FlowRecord) -> Result<()> {
        flow.validate()?;
        if self.flows.contains_key(&flow.id) {
            return Err(Error::ConstraintViolation(format!("flow {} already exists", flow.id)));
        }

        self.forward
            .entry(flow.source.clone())
            .or_default()
            .entry(flow.target.clone())
            .or_default()
            .push(flow.id.clone());
        self.reverse
            .entry(flow.target.clone())
            .or_default()
            .entry(flow.source.clone())
            .or_default()
            .push(flow.id.clone());
        self.nodes.insert(flow.source.clone());
        self.nodes.insert(flow.target.clone());
        self.flows.insert(flow.id.clone(), flow);
        Ok(())
    }

    pub fn get_flow(&self, id: &str) -> Option<&FlowRecord> {
        self.flows.get(id)
    }

    /// Remove a flow from storage and both indices. Nodes left without any
    /// flow leave the node set.
    pub fn remove_flow(&mut self, id: &str) -> Option<FlowRecord> {
        let flow = self.flows.remove(id)?;
        unlink(&mut self.forward, &flow.source, &flow.target, id);
        unlink(&mut self.reverse, &flow.target, &flow.source, id);
        for node in [&flow.source, &flow.target] {
            if !self.forward.contains_key(node) && !self.reverse.contains_key(node) {
                self.nodes.remove(node);
            }
        }
        Some(flow)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> Vec<&ActorId> {
        let mut nodes: Vec<&ActorId> = self.nodes.iter().collect();
        nodes.sort();
        nodes
    }

    pub fn flows(&self) -> impl Iterator<Item = &FlowRecord> {
        self.flows.values()
    }

    /// Sum of every flow amount.
    pub fn total_flow(&self) -> f64 {
        self.flows.values().map(|f| f.amount).sum()
    }

    /// Flows from `source` to `target` (directed).
    pub fn flows_between(&self, source: &str, target: &str) -> Vec<&FlowRecord> {
        self.forward
            .get(source)
            .and_then(|targets| targets.get(target))
            .map(|ids| ids.iter().filter_map(|id| self.flows.get(id)).collect())
            .unwrap_or_default()
    }

    /// Capacity of the edge `source → target`: the sum of its flow amounts.
    pub fn capacity(&self, source: &str, target: &str) -> f64 {
        self.flows_between(source, target).iter().map(|f| f.amount).sum()
    }

    /// Outgoing edges of `node` with capacities, ordered by target id.
    pub fn out_edges(&self, node: &str) -> Vec<(&ActorId, f64)> {
        self.edges(&self.forward, node)
    }

    /// Incoming edges of `node` with capacities, ordered by source id.
    pub fn in_edges(&self, node: &str) -> Vec<(&ActorId, f64)> {
        self.edges(&self.reverse, node)
    }

    fn edges<'a>(&'a self, index: &'a Adjacency, node: &str) -> Vec<(&'a ActorId, f64)> {
        let Some(peers) = index.get(node) else {
            return Vec::new();
        };
        let mut edges: Vec<(&ActorId, f64)> = peers
            .iter()
            .map(|(peer, ids)| {
                let cap = ids.iter().filter_map(|id| self.flows.get(id)).map(|f| f.amount).sum();
                (peer, cap)
            })
            .collect();
        edges.sort_by(|a, b| a.0.cmp(b.0));
        edges
    }

    /// Inflow/outflow totals and distinct counterparts of one node.
    pub fn node_summary(&self, node: &str) -> Option<NodeSummary> {
        let id = self.nodes.get(node)?;
        let outs = self.out_edges(node);
        let ins = self.in_edges(node);
        let flow_count = self.forward.get(node).map_or(0, |t| t.values().map(Vec::len).sum::<usize>())
            + self.reverse.get(node).map_or(0, |s| s.values().map(Vec::len).sum::<usize>());
        Some(NodeSummary {
            node: id.clone(),
            inflow: ins.iter().map(|(_, c)| c).sum(),
            outflow: outs.iter().map(|(_, c)| c).sum(),
            sources: ins.len(),
            targets: outs.len(),
            flow_count,
        })
    }
}

fn unlink(index: &mut Adjacency, from: &ActorId, to: &ActorId, id: &str) {
    let Some(peers) = index.get_mut(from) else { return };
    if let Some(ids) = peers.get_mut(to) {
        ids.retain(|fid| fid.as_str() != id);
        if ids.is_empty() {
            peers.remove(to);
        }
    }
    if peers.is_empty() {
        index.remove(from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlowType;

    fn flow(id: &str, s: &str, t: &str, amount: f64) -> FlowRecord {
        FlowRecord::new(id, s, t, amount, FlowType::Transfer)
    }

    #[test]
    fn test_add_get_remove_roundtrip() {
        let mut engine = FlowEngine::new();
        let f = flow("f1", "a", "b", 10.0);
        engine.add_flow(f.clone()).unwrap();
        assert_eq!(engine.get_flow("f1"), Some(&f));
        assert_eq!(engine.node_count(), 2);

        assert_eq!(engine.remove_flow("f1"), Some(f));
        assert!(engine.get_flow("f1").is_none());
        assert_eq!(engine.node_count(), 0);
        assert!(engine.out_edges("a").is_empty());
        assert!(engine.in_edges("b").is_empty());
    }

    #[test]
    fn test_rejects_duplicate_and_negative() {
        let mut engine = FlowEngine::new();
        engine.add_flow(flow("f1", "a", "b", 10.0)).unwrap();
        assert!(matches!(engine.add_flow(flow("f1", "a", "c", 1.0)), Err(Error::ConstraintViolation(_))));
        assert!(matches!(engine.add_flow(flow("f2", "a", "c", -1.0)), Err(Error::InvalidInput(_))));
        assert_eq!(engine.flow_count(), 1);
    }

    #[test]
    fn test_parallel_flows_sum_capacity() {
        let engine = FlowEngine::from_flows([
            flow("f1", "a", "b", 10.0),
            flow("f2", "a", "b", 5.0),
            flow("f3", "b", "a", 1.0),
        ])
        .unwrap();
        assert_eq!(engine.capacity("a", "b"), 15.0);
        assert_eq!(engine.capacity("b", "a"), 1.0);
        assert_eq!(engine.flows_between("a", "b").len(), 2);
        assert_eq!(engine.total_flow(), 16.0);
    }

    #[test]
    fn test_remove_keeps_node_with_other_flows() {
        let mut engine = FlowEngine::from_flows([flow("f1", "a", "b", 1.0), flow("f2", "b", "c", 1.0)]).unwrap();
        engine.remove_flow("f1");
        assert!(!engine.contains_node("a"));
        assert!(engine.contains_node("b"));
        assert!(engine.remove_flow("f1").is_none());
    }

    #[test]
    fn test_node_summary() {
        let engine = FlowEngine::from_flows([
            flow("f1", "a", "hub", 10.0),
            flow("f2", "b", "hub", 20.0),
            flow("f3", "hub", "c", 5.0),
        ])
        .unwrap();
        let s = engine.node_summary("hub").unwrap();
        assert_eq!(s.inflow, 30.0);
        assert_eq!(s.outflow, 5.0);
        assert_eq!(s.sources, 2);
        assert_eq!(s.targets, 1);
        assert_eq!(s.flow_count, 3);
        assert!(engine.node_summary("nobody").is_none());
    }
}
