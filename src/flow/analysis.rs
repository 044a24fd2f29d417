//! Graph-wide flow analysis: bottlenecks, flow matrices, node removal and
//! reporting aggregates.

use std::collections::{BTreeMap, VecDeque};

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use super::FlowEngine;
use crate::model::{ActorId, FlowRecord, FlowType};

pub const DEFAULT_BOTTLENECK_THRESHOLD: f64 = 0.30;

/// A node that concentrates volume or bridges many counterparts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowBottleneck {
    pub node: ActorId,
    pub inflow: f64,
    pub outflow: f64,
    /// `(inflow + outflow) / (2 × total flow)`.
    pub impact: f64,
    /// Distinct nodes sending to it.
    pub sources: usize,
    /// Distinct nodes it sends to.
    pub targets: usize,
    /// More than two distinct sources and more than two distinct targets.
    pub structural: bool,
}

/// Dense source × target amounts over a node subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMatrix {
    pub nodes: Vec<ActorId>,
    /// `amounts[i][j]` is the total flow from `nodes[i]` to `nodes[j]`.
    pub amounts: Vec<Vec<f64>>,
}

impl FlowMatrix {
    pub fn get(&self, source: &str, target: &str) -> Option<f64> {
        let i = self.nodes.iter().position(|n| n.as_str() == source)?;
        let j = self.nodes.iter().position(|n| n.as_str() == target)?;
        Some(self.amounts[i][j])
    }
}

/// What-if report for removing one node. Produced without touching the
/// engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRemoval {
    pub node: ActorId,
    pub flows_lost: usize,
    pub amount_lost: f64,
    /// Counterparts that exchanged flows with the node.
    pub affected_nodes: Vec<ActorId>,
    /// Remaining graph splits into more than one component.
    pub disconnects: bool,
    pub components: usize,
    pub largest_component: usize,
}

/// Count and volume of one flow type.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeTotal {
    pub count: usize,
    pub total: f64,
}

impl FlowEngine {
    /// Nodes whose share of all volume reaches `threshold`, plus structural
    /// bridges (more than two distinct sources and targets) whatever their
    /// volume. Ordered by descending impact.
    pub fn find_bottlenecks(&self, threshold: f64) -> Vec<FlowBottleneck> {
        if self.is_empty() {
            return Vec::new();
        }
        let total = self.total_flow();

        let mut found: Vec<FlowBottleneck> = self
            .nodes()
            .into_iter()
            .filter_map(|node| {
                let summary = self.node_summary(node.as_str())?;
                let impact = if total > 0.0 {
                    (summary.inflow + summary.outflow) / (2.0 * total)
                } else {
                    0.0
                };
                let structural = summary.sources > 2 && summary.targets > 2;
                (impact >= threshold || structural).then(|| FlowBottleneck {
                    node: summary.node,
                    inflow: summary.inflow,
                    outflow: summary.outflow,
                    impact,
                    sources: summary.sources,
                    targets: summary.targets,
                    structural,
                })
            })
            .collect();
        found.sort_by(|a, b| b.impact.total_cmp(&a.impact).then_with(|| a.node.cmp(&b.node)));
        found
    }

    /// Amount matrix restricted to `node_ids`, in the given order.
    pub fn flow_matrix<S: AsRef<str>>(&self, node_ids: &[S]) -> FlowMatrix {
        let nodes: Vec<ActorId> = node_ids.iter().map(|n| ActorId::from(n.as_ref())).collect();
        let amounts = nodes
            .iter()
            .map(|s| nodes.iter().map(|t| self.capacity(s.as_str(), t.as_str())).collect())
            .collect();
        FlowMatrix { nodes, amounts }
    }

    /// Drop every flow touching `node` on a scratch view and report what is
    /// lost and whether the remaining undirected graph falls apart.
    pub fn simulate_removal(&self, node: &str) -> Option<FlowRemoval> {
        let removed = self.nodes.get(node)?;

        let lost: Vec<&FlowRecord> = self.flows().filter(|f| f.touches(node)).collect();
        let mut affected: Vec<ActorId> = lost
            .iter()
            .filter_map(|f| f.counterpart(node))
            .filter(|c| c.as_str() != node)
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        affected.sort();

        // Undirected adjacency of what is left.
        let mut adjacency: HashMap<&ActorId, Vec<&ActorId>> =
            self.nodes.iter().filter(|n| n.as_str() != node).map(|n| (n, Vec::new())).collect();
        for f in self.flows().filter(|f| !f.touches(node) && f.source != f.target) {
            if let Some(list) = adjacency.get_mut(&f.source) {
                list.push(&f.target);
            }
            if let Some(list) = adjacency.get_mut(&f.target) {
                list.push(&f.source);
            }
        }

        let sizes = component_sizes(&adjacency);
        Some(FlowRemoval {
            node: removed.clone(),
            flows_lost: lost.len(),
            amount_lost: lost.iter().map(|f| f.amount).sum(),
            affected_nodes: affected,
            disconnects: sizes.len() > 1,
            components: sizes.len(),
            largest_component: sizes.iter().copied().max().unwrap_or(0),
        })
    }

    /// Count and total per flow type.
    pub fn aggregate_by_type(&self) -> BTreeMap<FlowType, TypeTotal> {
        let mut totals: BTreeMap<FlowType, TypeTotal> = BTreeMap::new();
        for f in self.flows() {
            let entry = totals.entry(f.flow_type).or_default();
            entry.count += 1;
            entry.total += f.amount;
        }
        totals
    }

    /// The `n` largest flows, ties by id.
    pub fn top_flows(&self, n: usize) -> Vec<&FlowRecord> {
        let mut flows: Vec<&FlowRecord> = self.flows().collect();
        flows.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.id.cmp(&b.id)));
        flows.truncate(n);
        flows
    }
}

/// Sizes of connected components, found by BFS.
fn component_sizes(adjacency: &HashMap<&ActorId, Vec<&ActorId>>) -> Vec<usize> {
    let mut seen: HashSet<&ActorId> = HashSet::with_capacity(adjacency.len());
    let mut sizes = Vec::new();

    for &start in adjacency.keys() {
        if !seen.insert(start) {
            continue;
        }
        let mut size = 0;
        let mut queue = VecDeque::from([start]);
        while let Some(n) = queue.pop_front() {
            size += 1;
            for &next in adjacency.get(n).into_iter().flatten() {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        sizes.push(size);
    }
    sizes
}
