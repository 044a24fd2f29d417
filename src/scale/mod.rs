//! # Scale Engine
//!
//! Strict five-level hierarchy with bottom-up aggregation:
//!
//! ```text
//! World ─┬─ Country ─┬─ City ─┬─ District ─┬─ Block
//!        │           │        │            └─ Block
//!        │           │        └─ District ...
//! ```
//!
//! Every non-World node has exactly one parent sitting one level above it.
//! Children are listed on the node and in a parent → children index so
//! zooming in is a single lookup.
//!
//! Aggregated totals are only valid after `aggregate_to_parent` (or
//! `aggregate_all`) has run over the subtree.

use hashbrown::HashMap;

use crate::model::{BoundingBox, GeoPoint, Role, ScaleLevel, ScaleNode, ScaleNodeId};
use crate::{Error, Result};

/// Cap on the breadth bonus added to an aggregated index.
pub const MAX_SCALE_BONUS: f64 = 0.20;
/// Bonus per direct child.
pub const SCALE_BONUS_PER_CHILD: f64 = 0.01;

pub const W_MASS: f64 = 0.30;
pub const W_FLOW: f64 = 0.50;
pub const W_COUNT: f64 = 0.20;

/// Share of a level labelled `Hub` by `calculate_ki_at_level`.
pub const LEVEL_HUB_PERCENTILE: f64 = 0.10;

/// Breadth bonus for a parent with `children` direct children.
pub fn scale_bonus(children: usize) -> f64 {
    (children as f64 * SCALE_BONUS_PER_CHILD).min(MAX_SCALE_BONUS)
}

#[derive(Debug, Clone, Default)]
pub struct ScaleEngine {
    nodes: HashMap<ScaleNodeId, ScaleNode>,
    children: HashMap<ScaleNodeId, Vec<ScaleNodeId>>,
}

impl ScaleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Tree maintenance
    // ========================================================================

    /// Insert a node under its parent.
    ///
    /// World nodes must have no parent; every other node needs an existing
    /// parent exactly one level above. Ids must be unique.
    pub fn add_node(&mut self, mut node: ScaleNode) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(Error::ConstraintViolation(format!("scale node {} already exists", node.id)));
        }

        match (node.level.parent(), &node.parent) {
            (None, None) => {}
            (None, Some(p)) => {
                return Err(Error::InvalidHierarchy(format!(
                    "world node {} cannot have parent {p}",
                    node.id
                )));
            }
            (Some(_), None) => {
                return Err(Error::InvalidHierarchy(format!(
                    "{} node {} needs a parent",
                    node.level, node.id
                )));
            }
            (Some(expected), Some(p)) => {
                let parent = self
                    .nodes
                    .get(p)
                    .ok_or_else(|| Error::InvalidHierarchy(format!("parent {p} of {} not found", node.id)))?;
                if parent.level != expected {
                    return Err(Error::InvalidHierarchy(format!(
                        "{} node {} cannot sit under {} node {p}",
                        node.level, node.id, parent.level
                    )));
                }
            }
        }

        node.children.clear();
        if let Some(p) = node.parent.clone() {
            if let Some(parent) = self.nodes.get_mut(&p) {
                parent.children.push(node.id.clone());
            }
            self.children.entry(p).or_default().push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Remove a node and its whole subtree. Returns the removed nodes.
    pub fn remove_node(&mut self, id: &str) -> Vec<ScaleNode> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        if let Some(p) = node.parent.clone() {
            if let Some(parent) = self.nodes.get_mut(&p) {
                parent.children.retain(|c| c.as_str() != id);
            }
            if let Some(list) = self.children.get_mut(&p) {
                list.retain(|c| c.as_str() != id);
            }
        }

        let mut removed = Vec::new();
        let mut stack = vec![ScaleNodeId::from(id)];
        while let Some(current) = stack.pop() {
            if let Some(kids) = self.children.remove(&current) {
                stack.extend(kids);
            }
            if let Some(n) = self.nodes.remove(&current) {
                removed.push(n);
            }
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&ScaleNode> {
        self.nodes.get(id)
    }

    /// Set leaf totals. Aggregation overwrites these on parent nodes.
    pub fn set_totals(&mut self, id: &str, mass: f64, flow: f64, count: u64) -> Result<()> {
        let node = self.node_mut(id)?;
        node.mass = mass;
        node.flow = flow;
        node.count = count;
        Ok(())
    }

    pub fn set_ki(&mut self, id: &str, ki: f64) -> Result<()> {
        self.node_mut(id)?.ki = ki;
        Ok(())
    }

    pub fn set_position(&mut self, id: &str, position: GeoPoint) -> Result<()> {
        self.node_mut(id)?.position = position;
        Ok(())
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut ScaleNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("scale node {id}")))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Direct children.
    pub fn zoom_in(&self, id: &str) -> Vec<&ScaleNode> {
        self.children
            .get(id)
            .map(|kids| kids.iter().filter_map(|k| self.nodes.get(k)).collect())
            .unwrap_or_default()
    }

    /// Direct parent.
    pub fn zoom_out(&self, id: &str) -> Option<&ScaleNode> {
        let parent = self.nodes.get(id)?.parent.as_ref()?;
        self.nodes.get(parent)
    }

    /// The node itself followed by each ancestor up to World. Never longer
    /// than the number of levels.
    pub fn path_to_root(&self, id: &str) -> Vec<&ScaleNode> {
        let mut path = Vec::with_capacity(ScaleLevel::ALL.len());
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            if path.len() == ScaleLevel::ALL.len() {
                tracing::warn!(node = %id, "scale path exceeds level count");
                break;
            }
            path.push(node);
            current = node.parent.as_ref().and_then(|p| self.nodes.get(p));
        }
        path
    }

    /// Nodes of one level, ordered by id.
    pub fn nodes_at_level(&self, level: ScaleLevel) -> Vec<&ScaleNode> {
        let mut nodes: Vec<&ScaleNode> = self.nodes.values().filter(|n| n.level == level).collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Nodes at the level for a map zoom whose position falls inside `bounds`.
    pub fn nodes_in_bounds(&self, zoom: u8, bounds: &BoundingBox) -> Vec<&ScaleNode> {
        self.nodes_at_level(ScaleLevel::from_zoom(zoom))
            .into_iter()
            .filter(|n| bounds.contains(&n.position))
            .collect()
    }

    // ========================================================================
    // Aggregation
    // ========================================================================

    /// Roll direct children up into `parent_id`.
    ///
    /// mass and flow are summed, count is summed with childless children
    /// counted as 1, `top_keyman_id` is the child with the highest index,
    /// and the parent's index becomes the mean child index plus
    /// [`scale_bonus`]. A parent without children is left untouched.
    pub fn aggregate_to_parent(&mut self, parent_id: &str) -> Result<()> {
        if !self.nodes.contains_key(parent_id) {
            return Err(Error::NotFound(format!("scale node {parent_id}")));
        }
        self.roll_up(parent_id);
        Ok(())
    }

    /// Aggregate every parent bottom-up, District level first, World last.
    pub fn aggregate_all(&mut self) {
        let parents = ScaleLevel::ALL.into_iter().rev().filter(|l| l.child().is_some());
        for level in parents {
            let ids: Vec<ScaleNodeId> = self.nodes_at_level(level).iter().map(|n| n.id.clone()).collect();
            for id in &ids {
                self.roll_up(id.as_str());
            }
            tracing::debug!(%level, nodes = ids.len(), "scale level aggregated");
        }
    }

    /// Aggregation body; a missing or childless node is a no-op.
    fn roll_up(&mut self, parent_id: &str) {
        let kids = self.zoom_in(parent_id);
        if kids.is_empty() {
            return;
        }

        let n = kids.len();
        let mass: f64 = kids.iter().map(|k| k.mass).sum();
        let flow: f64 = kids.iter().map(|k| k.flow).sum();
        let count: u64 = kids
            .iter()
            .map(|k| if k.children.is_empty() { k.count.max(1) } else { k.count })
            .sum();
        let mean_ki = kids.iter().map(|k| k.ki).sum::<f64>() / n as f64;
        let top = kids
            .iter()
            .max_by(|a, b| a.ki.total_cmp(&b.ki).then_with(|| b.id.cmp(&a.id)))
            .map(|k| k.id.clone());

        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.mass = mass;
            parent.flow = flow;
            parent.count = count;
            parent.ki = mean_ki + scale_bonus(n);
            parent.top_keyman_id = top;
        }
    }

    /// Level-wide index from aggregated quantities:
    /// `mass_norm×0.30 + flow_norm×0.50 + count_norm×0.20`, each divided by
    /// the level maximum (divisor floored at 1).
    ///
    /// Stores the result in each node's `ki`, labels the top tenth of the
    /// level by flow as `Hub`, and returns `(id, ki)` ordered by descending
    /// index.
    pub fn calculate_ki_at_level(&mut self, level: ScaleLevel) -> Vec<(ScaleNodeId, f64)> {
        let ids: Vec<ScaleNodeId> = self.nodes_at_level(level).iter().map(|n| n.id.clone()).collect();
        if ids.is_empty() {
            return Vec::new();
        }

        let nodes: Vec<&ScaleNode> = ids.iter().filter_map(|id| self.nodes.get(id)).collect();
        let max_mass = nodes.iter().map(|n| n.mass).fold(1.0, f64::max);
        let max_flow = nodes.iter().map(|n| n.flow).fold(1.0, f64::max);
        let max_count = nodes.iter().map(|n| n.count as f64).fold(1.0, f64::max);

        let mut scored: Vec<(ScaleNodeId, f64, f64)> = nodes
            .iter()
            .map(|n| {
                let ki = (n.mass / max_mass).clamp(0.0, 1.0) * W_MASS
                    + (n.flow / max_flow).clamp(0.0, 1.0) * W_FLOW
                    + (n.count as f64 / max_count).clamp(0.0, 1.0) * W_COUNT;
                (n.id.clone(), ki, n.flow)
            })
            .collect();

        let k = ((scored.len() as f64 * LEVEL_HUB_PERCENTILE).ceil() as usize).max(1);
        let mut by_flow: Vec<&(ScaleNodeId, f64, f64)> = scored.iter().filter(|s| s.2 > 0.0).collect();
        by_flow.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
        let hubs: Vec<ScaleNodeId> = by_flow.into_iter().take(k).map(|s| s.0.clone()).collect();

        for (id, ki, _) in &scored {
            if let Some(node) = self.nodes.get_mut(id) {
                node.ki = *ki;
                node.roles.clear();
                if hubs.contains(id) {
                    node.roles.insert(Role::Hub);
                }
            }
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        tracing::debug!(%level, nodes = scored.len(), "level index computed");
        scored.into_iter().map(|(id, ki, _)| (id, ki)).collect()
    }
}
