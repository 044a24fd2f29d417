//! Nodes of the World → Country → City → District → Block hierarchy.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ActorId, RoleSet, ScaleNodeId};

/// Hierarchical level. Ordered from the root (`World`) down to `Block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScaleLevel {
    World,
    Country,
    City,
    District,
    Block,
}

impl ScaleLevel {
    pub const ALL: [ScaleLevel; 5] = [
        ScaleLevel::World,
        ScaleLevel::Country,
        ScaleLevel::City,
        ScaleLevel::District,
        ScaleLevel::Block,
    ];

    /// Level shown at a given map zoom.
    ///
    /// ```text
    /// 0..=3 World | 4..=6 Country | 7..=10 City | 11..=14 District | 15+ Block
    /// ```
    pub fn from_zoom(zoom: u8) -> Self {
        match zoom {
            0..=3 => ScaleLevel::World,
            4..=6 => ScaleLevel::Country,
            7..=10 => ScaleLevel::City,
            11..=14 => ScaleLevel::District,
            _ => ScaleLevel::Block,
        }
    }

    /// The level directly above, `None` for `World`.
    pub fn parent(self) -> Option<Self> {
        match self {
            ScaleLevel::World => None,
            ScaleLevel::Country => Some(ScaleLevel::World),
            ScaleLevel::City => Some(ScaleLevel::Country),
            ScaleLevel::District => Some(ScaleLevel::City),
            ScaleLevel::Block => Some(ScaleLevel::District),
        }
    }

    /// The level directly below, `None` for `Block`.
    pub fn child(self) -> Option<Self> {
        match self {
            ScaleLevel::World => Some(ScaleLevel::Country),
            ScaleLevel::Country => Some(ScaleLevel::City),
            ScaleLevel::City => Some(ScaleLevel::District),
            ScaleLevel::District => Some(ScaleLevel::Block),
            ScaleLevel::Block => None,
        }
    }
}

impl fmt::Display for ScaleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScaleLevel::World => "world",
            ScaleLevel::Country => "country",
            ScaleLevel::City => "city",
            ScaleLevel::District => "district",
            ScaleLevel::Block => "block",
        };
        f.write_str(s)
    }
}

/// WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Axis-aligned lat/lon box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: GeoPoint,
    pub max: GeoPoint,
}

impl BoundingBox {
    pub fn new(min: GeoPoint, max: GeoPoint) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.lat >= self.min.lat && p.lat <= self.max.lat && p.lon >= self.min.lon && p.lon <= self.max.lon
    }
}

/// A node in the scale hierarchy.
///
/// `mass`, `flow`, `count`, `ki` and `top_keyman_id` are inputs on leaf
/// nodes and outputs of aggregation on every other node; they are only
/// meaningful once the aggregation pass has run over the subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleNode {
    pub id: ScaleNodeId,
    pub name: String,
    pub level: ScaleLevel,
    pub position: GeoPoint,
    pub bounds: Option<BoundingBox>,
    pub parent: Option<ScaleNodeId>,
    pub children: Vec<ScaleNodeId>,
    pub mass: f64,
    pub flow: f64,
    pub count: u64,
    pub ki: f64,
    pub top_keyman_id: Option<ScaleNodeId>,
    /// Actor this node stands for, when a leaf maps onto the entity graph.
    pub actor_id: Option<ActorId>,
    pub roles: RoleSet,
}

impl ScaleNode {
    pub fn new(id: impl Into<ScaleNodeId>, name: impl Into<String>, level: ScaleLevel) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            level,
            position: GeoPoint::default(),
            bounds: None,
            parent: None,
            children: Vec::new(),
            mass: 0.0,
            flow: 0.0,
            count: 0,
            ki: 0.0,
            top_keyman_id: None,
            actor_id: None,
            roles: RoleSet::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<ScaleNodeId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_position(mut self, position: GeoPoint) -> Self {
        self.position = position;
        self
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Supply leaf-level totals directly.
    pub fn with_totals(mut self, mass: f64, flow: f64, count: u64) -> Self {
        self.mass = mass;
        self.flow = flow;
        self.count = count;
        self
    }

    pub fn with_ki(mut self, ki: f64) -> Self {
        self.ki = ki;
        self
    }

    pub fn with_actor(mut self, actor: impl Into<ActorId>) -> Self {
        self.actor_id = Some(actor.into());
        self
    }
}
