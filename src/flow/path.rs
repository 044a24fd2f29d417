//! Path search over the flow graph.
//!
//! | Query | Algorithm | Edge metric |
//! |-------|-----------|-------------|
//! | `shortest_path` | Dijkstra | cost `1 / (capacity + ε)` |
//! | `max_flow_path` | widest path (max-heap Dijkstra) | bottleneck capacity |
//! | `all_paths` | bounded DFS | total amount |
//!
//! All three return nothing when `source == target` or either endpoint is
//! not a node of the graph.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::FlowEngine;
use crate::model::{ActorId, FlowId};

/// ε in the Dijkstra edge cost.
pub const PATH_EPSILON: f64 = 1e-6;
pub const DEFAULT_MAX_DEPTH: usize = 5;
pub const DEFAULT_MAX_PATHS: usize = 10;

/// Lowest-capacity edge of a path, identified by its tail node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeBottleneck {
    pub from: ActorId,
    pub to: ActorId,
    pub capacity: f64,
}

/// A route through the flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowPath {
    /// Node sequence, source first.
    pub nodes: Vec<ActorId>,
    /// Every flow on every hop, in hop order.
    pub flows: Vec<FlowId>,
    /// Sum of hop capacities.
    pub total_amount: f64,
    /// Sum of `1 / (capacity + ε)` over hops.
    pub cost: f64,
    pub bottleneck: Option<EdgeBottleneck>,
}

impl FlowPath {
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// Capacity of the narrowest hop.
    pub fn capacity(&self) -> f64 {
        self.bottleneck.as_ref().map_or(0.0, |b| b.capacity)
    }
}

// ----------------------------------------------------------------------------
// Heap entries
// ----------------------------------------------------------------------------

/// Min-heap entry on cost.
struct CostState {
    cost: f64,
    node: ActorId,
}

impl Eq for CostState {}
impl PartialEq for CostState {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.node == other.node
    }
}
impl Ord for CostState {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost).then_with(|| other.node.cmp(&self.node))
    }
}
impl PartialOrd for CostState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap entry on width.
struct WidthState {
    width: f64,
    node: ActorId,
}

impl Eq for WidthState {}
impl PartialEq for WidthState {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.node == other.node
    }
}
impl Ord for WidthState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.width.total_cmp(&other.width).then_with(|| other.node.cmp(&self.node))
    }
}
impl PartialOrd for WidthState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn walk_back(prev: &HashMap<ActorId, ActorId>, source: &str, target: &str) -> Vec<ActorId> {
    let mut nodes = vec![ActorId::from(target)];
    let mut current = ActorId::from(target);
    while let Some(p) = prev.get(&current) {
        nodes.push(p.clone());
        if p.as_str() == source {
            break;
        }
        current = p.clone();
    }
    nodes.reverse();
    nodes
}

impl FlowEngine {
    fn endpoints_ok(&self, source: &str, target: &str) -> bool {
        source != target && self.contains_node(source) && self.contains_node(target)
    }

    /// Materialize a node sequence into a [`FlowPath`].
    pub fn build_path(&self, nodes: Vec<ActorId>) -> FlowPath {
        let mut flows = Vec::new();
        let mut total_amount = 0.0;
        let mut cost = 0.0;
        let mut bottleneck: Option<EdgeBottleneck> = None;

        for hop in nodes.windows(2) {
            let (from, to) = (&hop[0], &hop[1]);
            let hop_flows = self.flows_between(from.as_str(), to.as_str());
            let capacity: f64 = hop_flows.iter().map(|f| f.amount).sum();
            flows.extend(hop_flows.iter().map(|f| f.id.clone()));
            total_amount += capacity;
            cost += 1.0 / (capacity + PATH_EPSILON);

            if bottleneck.as_ref().is_none_or(|b| capacity < b.capacity) {
                bottleneck = Some(EdgeBottleneck { from: from.clone(), to: to.clone(), capacity });
            }
        }

        FlowPath { nodes, flows, total_amount, cost, bottleneck }
    }

    /// Cheapest route where an edge costs `1 / (capacity + ε)`, so heavier
    /// channels are preferred.
    pub fn shortest_path(&self, source: &str, target: &str) -> Option<FlowPath> {
        if !self.endpoints_ok(source, target) {
            return None;
        }

        let mut dist: HashMap<ActorId, f64> = HashMap::new();
        let mut prev: HashMap<ActorId, ActorId> = HashMap::new();
        let mut heap = BinaryHeap::new();

        dist.insert(ActorId::from(source), 0.0);
        heap.push(CostState { cost: 0.0, node: ActorId::from(source) });

        while let Some(CostState { cost, node }) = heap.pop() {
            if node.as_str() == target {
                break;
            }
            if dist.get(&node).is_some_and(|&best| cost > best) {
                continue;
            }
            for (next, capacity) in self.out_edges(node.as_str()) {
                let next_cost = cost + 1.0 / (capacity + PATH_EPSILON);
                if next_cost < dist.get(next).copied().unwrap_or(f64::INFINITY) {
                    dist.insert(next.clone(), next_cost);
                    prev.insert(next.clone(), node.clone());
                    heap.push(CostState { cost: next_cost, node: next.clone() });
                }
            }
        }

        if !dist.contains_key(target) {
            tracing::trace!(source, target, "no route");
            return None;
        }
        Some(self.build_path(walk_back(&prev, source, target)))
    }

    /// Route maximizing the smallest hop capacity (widest path).
    pub fn max_flow_path(&self, source: &str, target: &str) -> Option<FlowPath> {
        if !self.endpoints_ok(source, target) {
            return None;
        }

        let mut best: HashMap<ActorId, f64> = HashMap::new();
        let mut prev: HashMap<ActorId, ActorId> = HashMap::new();
        let mut heap = BinaryHeap::new();

        best.insert(ActorId::from(source), f64::INFINITY);
        heap.push(WidthState { width: f64::INFINITY, node: ActorId::from(source) });

        while let Some(WidthState { width, node }) = heap.pop() {
            if node.as_str() == target {
                break;
            }
            if best.get(&node).is_some_and(|&w| width < w) {
                continue;
            }
            for (next, capacity) in self.out_edges(node.as_str()) {
                let through = width.min(capacity);
                if through > best.get(next).copied().unwrap_or(f64::NEG_INFINITY) {
                    best.insert(next.clone(), through);
                    prev.insert(next.clone(), node.clone());
                    heap.push(WidthState { width: through, node: next.clone() });
                }
            }
        }

        if !best.contains_key(target) {
            return None;
        }
        Some(self.build_path(walk_back(&prev, source, target)))
    }

    /// Simple paths of at most `max_depth` hops, at most `max_paths` of
    /// them, sorted by descending total amount.
    pub fn all_paths(&self, source: &str, target: &str, max_depth: usize, max_paths: usize) -> Vec<FlowPath> {
        if !self.endpoints_ok(source, target) || max_depth == 0 || max_paths == 0 {
            return Vec::new();
        }

        let mut found: Vec<Vec<ActorId>> = Vec::new();
        let mut stack = vec![ActorId::from(source)];
        self.dfs(&mut stack, target, max_depth, max_paths, &mut found);

        let mut paths: Vec<FlowPath> = found.into_iter().map(|nodes| self.build_path(nodes)).collect();
        paths.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
        paths
    }

    fn dfs(
        &self,
        stack: &mut Vec<ActorId>,
        target: &str,
        max_depth: usize,
        max_paths: usize,
        found: &mut Vec<Vec<ActorId>>,
    ) {
        let Some(tip) = stack.last().cloned() else { return };
        for (next, _) in self.out_edges(tip.as_str()) {
            if found.len() >= max_paths {
                return;
            }
            if stack.contains(next) {
                continue;
            }
            stack.push(next.clone());
            if next.as_str() == target {
                found.push(stack.clone());
            } else if stack.len() <= max_depth {
                self.dfs(stack, target, max_depth, max_paths, found);
            }
            stack.pop();
        }
    }
}
