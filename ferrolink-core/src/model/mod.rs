//! Data model for street network linking
//!
//! The permanent [`StreetGraph`] is owned by the service and frozen once it
//! is served. Everything created for a single request or a single dynamic
//! entity lives in a [`TemporaryGraph`] arena that is never registered with
//! the spatial index.

pub mod streets;
pub mod temporary;
pub mod view;

use petgraph::stable_graph::{EdgeIndex, NodeIndex};

pub use streets::{
    Area, AreaId, EdgeKind, EdgeSerial, Permission, StreetEdge, StreetGraph, StreetVertex,
    TraverseMode, TraverseModeSet, VertexKind,
};
pub use temporary::{
    TempEdgeId, TempVertexId, TemporaryEdge, TemporaryEdgeKind, TemporaryGraph, TemporaryVertex,
    TemporaryVertexKind, VertexRef,
};
pub use view::{EdgeView, GraphView};

/// Vertex of the permanent street graph
pub type VertexId = NodeIndex;

/// Edge of the permanent street graph
pub type EdgeId = EdgeIndex;
