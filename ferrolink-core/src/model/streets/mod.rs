//! Street network model

pub mod components;
pub mod network;
pub mod permission;

#[cfg(test)]
pub(crate) mod fixtures;

pub use components::{Area, AreaId, EdgeKind, EdgeSerial, StreetEdge, StreetVertex, VertexKind};
pub use network::{IndexedEdge, IndexedPoint, StreetGraph};
pub use permission::{Permission, TraverseMode, TraverseModeSet};
