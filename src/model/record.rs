//! Inbound entity records handed over by the ingestion layer.

use serde::{Deserialize, Serialize};

use super::{ActorId, GeoPoint};

/// Flat actor record as delivered by ingestion.
///
/// Only `magnitude` is mandatory for scoring; the optional Ψ overrides let
/// callers supply reputation, exposure, throughput or liquidity when they
/// have them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: ActorId,
    pub name: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    pub magnitude: f64,
    #[serde(default)]
    pub position: Option<GeoPoint>,
    #[serde(default)]
    pub reputation: Option<f64>,
    #[serde(default)]
    pub exposure: Option<f64>,
    #[serde(default)]
    pub throughput: Option<f64>,
    #[serde(default)]
    pub liquidity: Option<f64>,
}

impl EntityRecord {
    pub fn new(id: impl Into<ActorId>, name: impl Into<String>, magnitude: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sector: None,
            region: None,
            magnitude,
            position: None,
            reputation: None,
            exposure: None,
            throughput: None,
            liquidity: None,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_position(mut self, position: GeoPoint) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_exposure(mut self, exposure: f64) -> Self {
        self.exposure = Some(exposure);
        self
    }

    pub fn with_liquidity(mut self, liquidity: f64) -> Self {
        self.liquidity = Some(liquidity);
        self
    }

    pub fn with_reputation(mut self, reputation: f64) -> Self {
        self.reputation = Some(reputation);
        self
    }

    pub fn with_throughput(mut self, throughput: f64) -> Self {
        self.throughput = Some(throughput);
        self
    }
}
