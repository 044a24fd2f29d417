//! # Network Model
//!
//! Plain DTOs shared by every engine: actors and their Ψ vectors, flow
//! records, scale nodes, and the inbound ingestion records.
//!
//! Design rule: this module is pure data: no engine state, no locking,
//! no iteration over the whole network.

pub mod id;
pub mod psi;
pub mod actor;
pub mod flow;
pub mod scale;
pub mod role;
pub mod record;

pub use id::{ActorId, FlowId, ScaleNodeId};
pub use psi::{Dimension, Psi};
pub use actor::Actor;
pub use flow::{FlowRecord, FlowType};
pub use scale::{BoundingBox, GeoPoint, ScaleLevel, ScaleNode};
pub use role::{Role, RoleSet};
pub use record::EntityRecord;
