//! # Entity Registry
//!
//! Holds every actor and the weighted, signed connection graph between
//! them. Actors live in a map keyed by id; adjacency is stored as id sets
//! on each actor and mirrored in a coupling table keyed by ordered pair.
//!
//! ## Invariants
//!
//! - Adjacency is symmetric: `b ∈ a.connections ⇔ a ∈ b.connections`.
//! - A coupling entry `(a, b)` exists iff the edge `a - b` exists, and
//!   `(b, a)` carries the same χ.
//!
//! ## Centrality
//!
//! Eigenvector centrality by power iteration with a fixed round count.
//! Convergence is not checked; twenty rounds on registries in the low
//! thousands are treated as close enough (a known approximation).

mod ingest;

use hashbrown::HashMap;

use crate::model::{Actor, ActorId, Dimension, GeoPoint, Psi};

pub use ingest::IngestOptions;

/// Power-iteration rounds for centrality.
pub const CENTRALITY_ROUNDS: usize = 20;

/// Edge weight used by centrality for a coupling χ.
pub fn edge_weight(chi: f64) -> f64 {
    1.0 + chi * 0.5
}

/// Actor registry with a symmetric coupling graph.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    actors: HashMap<ActorId, Actor>,
    coupling: HashMap<(ActorId, ActorId), f64>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Actor CRUD
    // ========================================================================

    /// Insert an actor, replacing any actor with the same id.
    ///
    /// Connections listed on the incoming actor that don't resolve to a
    /// known peer are dropped; the rest are mirrored onto the peers with
    /// χ = 0 unless a coupling already exists.
    pub fn add(&mut self, mut actor: Actor) {
        if self.actors.contains_key(&actor.id) {
            self.remove(actor.id.as_str());
        }
        let id = actor.id.clone();
        let wanted = std::mem::take(&mut actor.connections);
        self.actors.insert(id.clone(), actor);

        for peer in wanted {
            if peer != id && self.actors.contains_key(&peer) {
                self.connect(id.as_str(), peer.as_str(), 0.0);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actors.contains_key(id)
    }

    /// Remove an actor, stripping it from every peer and from the coupling
    /// table. O(actors) in the worst case.
    pub fn remove(&mut self, id: &str) -> Option<Actor> {
        let actor = self.actors.remove(id)?;
        for peer in &actor.connections {
            if let Some(p) = self.actors.get_mut(peer) {
                p.connections.remove(id);
            }
            self.coupling.remove(&(actor.id.clone(), peer.clone()));
            self.coupling.remove(&(peer.clone(), actor.id.clone()));
        }
        Some(actor)
    }

    // ========================================================================
    // Attribute updates
    //
    // Adjacency is only reachable through `connect`/`disconnect`, so these
    // touch scalar fields only.
    // ========================================================================

    /// Replace an actor's Ψ, clamping every dimension to `[0, 1]`. Returns
    /// false if the actor is unknown.
    pub fn set_psi(&mut self, id: &str, psi: Psi) -> bool {
        let Some(actor) = self.actors.get_mut(id) else {
            return false;
        };
        actor.psi = Psi::new(psi.g, psi.r, psi.e, psi.t, psi.n, psi.l);
        true
    }

    /// Set a single Ψ dimension, clamped to `[0, 1]`.
    pub fn set_dimension(&mut self, id: &str, dim: Dimension, value: f64) -> bool {
        let Some(actor) = self.actors.get_mut(id) else {
            return false;
        };
        actor.psi.set(dim, value);
        true
    }

    /// Set the raw magnitude. Negative and non-finite values are rejected.
    pub fn set_magnitude(&mut self, id: &str, magnitude: f64) -> bool {
        if !magnitude.is_finite() || magnitude < 0.0 {
            return false;
        }
        let Some(actor) = self.actors.get_mut(id) else {
            return false;
        };
        actor.magnitude = magnitude;
        true
    }

    pub fn set_position(&mut self, id: &str, position: Option<GeoPoint>) -> bool {
        let Some(actor) = self.actors.get_mut(id) else {
            return false;
        };
        actor.position = position;
        true
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// All actor ids in ascending order.
    pub fn ids(&self) -> Vec<ActorId> {
        let mut ids: Vec<ActorId> = self.actors.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All actors ordered by id.
    pub fn actors(&self) -> Vec<&Actor> {
        let mut actors: Vec<&Actor> = self.actors.values().collect();
        actors.sort_by(|a, b| a.id.cmp(&b.id));
        actors
    }

    // ========================================================================
    // Connections
    // ========================================================================

    /// Add (or update) a symmetric edge with coupling χ, clamped to
    /// `[-1, 1]`. Returns false if either actor is unknown, the ids are
    /// equal, or χ is NaN.
    pub fn connect(&mut self, a: &str, b: &str, chi: f64) -> bool {
        if a == b || chi.is_nan() || !self.contains(a) || !self.contains(b) {
            return false;
        }
        let chi = chi.clamp(-1.0, 1.0);
        let (ida, idb) = (ActorId::from(a), ActorId::from(b));

        if let Some(actor) = self.actors.get_mut(a) {
            actor.connections.insert(idb.clone());
        }
        if let Some(actor) = self.actors.get_mut(b) {
            actor.connections.insert(ida.clone());
        }
        self.coupling.insert((ida.clone(), idb.clone()), chi);
        self.coupling.insert((idb, ida), chi);
        true
    }

    /// Remove the edge between `a` and `b`. Returns false if there was none.
    pub fn disconnect(&mut self, a: &str, b: &str) -> bool {
        let existed = self
            .coupling
            .remove(&(ActorId::from(a), ActorId::from(b)))
            .is_some();
        self.coupling.remove(&(ActorId::from(b), ActorId::from(a)));
        if let Some(actor) = self.actors.get_mut(a) {
            actor.connections.remove(b);
        }
        if let Some(actor) = self.actors.get_mut(b) {
            actor.connections.remove(a);
        }
        existed
    }

    /// χ for the edge `a - b`, if connected.
    pub fn coupling(&self, a: &str, b: &str) -> Option<f64> {
        self.coupling.get(&(ActorId::from(a), ActorId::from(b))).copied()
    }

    /// Peers of `id` with their coupling, in id order.
    pub fn neighbors(&self, id: &str) -> Vec<(&ActorId, f64)> {
        let Some(actor) = self.actors.get(id) else {
            return Vec::new();
        };
        actor
            .connections
            .iter()
            .map(|peer| (peer, self.coupling(id, peer.as_str()).unwrap_or(0.0)))
            .collect()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.coupling.len() / 2
    }

    // ========================================================================
    // Centrality
    // ========================================================================

    /// Eigenvector centrality over the weighted adjacency
    /// (`w = 1 + χ·0.5`), renormalized to sum to 1 after every round.
    ///
    /// Each round adds the node's own previous value to the neighbour sum
    /// (iteration on `A + I`) so bipartite shapes like lines and stars do
    /// not flip between two states; the dominant eigenvector is the same.
    ///
    /// Writes the result to `Actor::centrality` and to Ψ.N (×10, clamped
    /// to 1). Returns the centrality per actor.
    pub fn centrality(&mut self) -> HashMap<ActorId, f64> {
        let ids = self.ids();
        let n = ids.len();
        if n == 0 {
            return HashMap::new();
        }

        let adjacency: Vec<Vec<(usize, f64)>> = {
            let index: HashMap<&ActorId, usize> = ids.iter().enumerate().map(|(i, id)| (id, i)).collect();
            ids.iter()
                .map(|id| {
                    self.neighbors(id.as_str())
                        .into_iter()
                        .filter_map(|(peer, chi)| index.get(peer).map(|&j| (j, edge_weight(chi))))
                        .collect()
                })
                .collect()
        };

        let mut values = vec![1.0 / n as f64; n];
        for _ in 0..CENTRALITY_ROUNDS {
            let mut next: Vec<f64> = adjacency
                .iter()
                .enumerate()
                .map(|(i, edges)| values[i] + edges.iter().map(|&(j, w)| w * values[j]).sum::<f64>())
                .collect();
            let total: f64 = next.iter().sum();
            if total > 0.0 {
                for v in &mut next {
                    *v /= total;
                }
            }
            values = next;
        }

        let mut result = HashMap::with_capacity(n);
        for (id, value) in ids.into_iter().zip(values) {
            if let Some(actor) = self.actors.get_mut(&id) {
                actor.centrality = value;
                actor.psi.set(Dimension::Network, (value * 10.0).min(1.0));
            }
            result.insert(id, value);
        }
        tracing::debug!(actors = n, rounds = CENTRALITY_ROUNDS, "centrality recomputed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_of(ids: &[&str]) -> Registry {
        let mut reg = Registry::new();
        for id in ids {
            reg.add(Actor::new(*id, id.to_uppercase()).with_psi(Psi::uniform(0.5)));
        }
        reg
    }

    #[test]
    fn test_connect_is_symmetric() {
        let mut reg = registry_of(&["a", "b"]);
        assert!(reg.connect("a", "b", 0.4));
        assert!(reg.get("a").unwrap().is_connected_to("b"));
        assert!(reg.get("b").unwrap().is_connected_to("a"));
        assert_eq!(reg.coupling("a", "b"), Some(0.4));
        assert_eq!(reg.coupling("b", "a"), Some(0.4));
        assert_eq!(reg.edge_count(), 1);
    }

    #[test]
    fn test_connect_unknown_actor_fails() {
        let mut reg = registry_of(&["a"]);
        assert!(!reg.connect("a", "ghost", 0.5));
        assert!(!reg.connect("a", "a", 0.5));
        assert!(reg.get("a").unwrap().connections.is_empty());
    }

    #[test]
    fn test_connect_clamps_chi() {
        let mut reg = registry_of(&["a", "b"]);
        assert!(reg.connect("a", "b", 3.0));
        assert_eq!(reg.coupling("a", "b"), Some(1.0));
        assert!(!reg.connect("a", "b", f64::NAN));
    }

    #[test]
    fn test_remove_cascades() {
        let mut reg = registry_of(&["a", "b", "c"]);
        reg.connect("a", "b", 0.5);
        reg.connect("b", "c", -0.5);
        let removed = reg.remove("b").unwrap();
        assert_eq!(removed.id.as_str(), "b");
        assert!(reg.get("a").unwrap().connections.is_empty());
        assert!(reg.get("c").unwrap().connections.is_empty());
        assert_eq!(reg.coupling("a", "b"), None);
        assert_eq!(reg.coupling("c", "b"), None);
        assert_eq!(reg.edge_count(), 0);
        assert!(reg.remove("b").is_none());
    }

    #[test]
    fn test_disconnect() {
        let mut reg = registry_of(&["a", "b"]);
        reg.connect("a", "b", 0.1);
        assert!(reg.disconnect("b", "a"));
        assert!(!reg.disconnect("a", "b"));
        assert_eq!(reg.coupling("a", "b"), None);
    }

    #[test]
    fn test_add_mirrors_listed_connections() {
        let mut reg = registry_of(&["a"]);
        let mut b = Actor::new("b", "B");
        b.connections.insert(ActorId::from("a"));
        b.connections.insert(ActorId::from("ghost"));
        reg.add(b);
        assert!(reg.get("a").unwrap().is_connected_to("b"));
        assert_eq!(reg.get("b").unwrap().degree(), 1);
        assert_eq!(reg.coupling("a", "b"), Some(0.0));
    }

    #[test]
    fn test_centrality_sums_to_one() {
        let mut reg = registry_of(&["a", "b", "c", "d"]);
        reg.connect("a", "b", 0.5);
        reg.connect("b", "c", -0.3);
        reg.connect("c", "a", 0.9);
        let c = reg.centrality();
        let sum: f64 = c.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        // Isolated actor decays towards zero
        assert!(c["d"] < c["a"]);
    }

    #[test]
    fn test_centrality_line_middle_dominates() {
        let mut reg = registry_of(&["a", "b", "c"]);
        reg.connect("a", "b", 0.5);
        reg.connect("b", "c", 0.5);
        let c = reg.centrality();
        assert!(c["b"] > c["a"]);
        assert!(c["b"] > c["c"]);
        assert!((c["a"] - c["c"]).abs() < 1e-12);
    }

    #[test]
    fn test_centrality_writes_network_dimension() {
        let mut reg = registry_of(&["a", "b"]);
        reg.connect("a", "b", 0.0);
        reg.centrality();
        let a = reg.get("a").unwrap();
        assert!((a.centrality - 0.5).abs() < 1e-12);
        assert_eq!(a.psi.n, 1.0);
    }

    #[test]
    fn test_attribute_updates_leave_adjacency_alone() {
        let mut reg = registry_of(&["a", "b", "c"]);
        reg.connect("a", "b", 0.2);

        assert!(reg.set_psi("a", Psi::new(2.0, 0.5, -1.0, 0.5, 0.5, 0.5)));
        assert!(reg.set_dimension("c", Dimension::Liquidity, 0.9));
        assert!(reg.set_magnitude("b", 1e6));
        assert!(reg.set_position("b", Some(GeoPoint::new(37.5, 127.0))));

        let a = reg.get("a").unwrap();
        assert_eq!(a.psi.g, 1.0);
        assert_eq!(a.psi.e, 0.0);
        assert_eq!(reg.get("c").unwrap().psi.l, 0.9);
        assert_eq!(reg.get("b").unwrap().magnitude, 1e6);

        // Edges are unchanged and still mirrored on both sides.
        assert_eq!(reg.edge_count(), 1);
        assert!(reg.get("b").unwrap().is_connected_to("a"));
        assert!(!reg.get("a").unwrap().is_connected_to("c"));
        assert_eq!(reg.coupling("b", "a"), Some(0.2));
    }

    #[test]
    fn test_attribute_updates_reject_unknown_or_bad_input() {
        let mut reg = registry_of(&["a"]);
        assert!(!reg.set_psi("ghost", Psi::uniform(0.5)));
        assert!(!reg.set_dimension("ghost", Dimension::Governance, 0.5));
        assert!(!reg.set_position("ghost", None));
        assert!(!reg.set_magnitude("a", -1.0));
        assert!(!reg.set_magnitude("a", f64::NAN));
        assert_eq!(reg.get("a").unwrap().magnitude, 0.0);
    }

    #[test]
    fn test_centrality_repeatable() {
        let mut reg = registry_of(&["a", "b", "c"]);
        reg.connect("a", "b", 0.5);
        reg.connect("b", "c", 0.5);
        let first = reg.centrality();
        let second = reg.centrality();
        for id in reg.ids() {
            assert_eq!(first[&id], second[&id]);
        }
    }

    #[test]
    fn test_centrality_empty() {
        let mut reg = Registry::new();
        assert!(reg.centrality().is_empty());
    }
}
