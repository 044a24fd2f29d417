//! Actor (person, institution, city, country) in the entity graph.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{ActorId, GeoPoint, Psi};

/// An economic actor.
///
/// `connections` is the undirected adjacency set; the registry keeps it
/// symmetric and in sync with the coupling table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub psi: Psi,
    /// Raw magnitude (e.g. net worth) G is derived from.
    pub magnitude: f64,
    pub position: Option<GeoPoint>,
    pub connections: BTreeSet<ActorId>,
    /// Eigenvector centrality, rewritten whenever centrality runs.
    pub centrality: f64,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sector: None,
            region: None,
            psi: Psi::default(),
            magnitude: 0.0,
            position: None,
            connections: BTreeSet::new(),
            centrality: 0.0,
        }
    }

    pub fn with_psi(mut self, psi: Psi) -> Self {
        self.psi = psi;
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = magnitude;
        self
    }

    pub fn with_position(mut self, position: GeoPoint) -> Self {
        self.position = Some(position);
        self
    }

    pub fn degree(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected_to(&self, other: &str) -> bool {
        self.connections.contains(other)
    }
}
