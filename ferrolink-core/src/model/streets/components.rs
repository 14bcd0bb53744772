//! Street network components - vertices, edges and areas

use geo::{LineString, Point};

use super::permission::{Permission, TraverseModeSet};
use crate::{
    EdgeId, Meters, Millimeters, VertexId,
    linking::geometry::{line_length, to_millimeters},
    linking::link_edges::{LinkEdgeKind, LinkKind},
};

/// Identity of a logical edge, stable across petgraph slot reuse
pub type EdgeSerial = u64;

/// Index of an area (platform or plaza polygon) in the street graph
pub type AreaId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum VertexKind {
    /// Street intersection or shape point, optionally carrying its OSM id
    Intersection { osm_id: Option<i64> },
    /// Vertex created by a permanent split of the edge with this serial
    Split { parent: EdgeSerial },
    TransitStop {
        stop_id: String,
        wheelchair_entrance: bool,
    },
    BikeRental { station_id: String },
    BikePark { park_id: String },
}

/// Street graph vertex
#[derive(Debug, Clone)]
pub struct StreetVertex {
    pub kind: VertexKind,
    pub label: String,
    /// Vertex coordinates, x is longitude
    pub geometry: Point<f64>,
}

impl StreetVertex {
    pub fn new(kind: VertexKind, label: impl Into<String>, geometry: Point<f64>) -> Self {
        Self {
            kind,
            label: label.into(),
            geometry,
        }
    }

    /// Vertices that street edges and connectors may attach to
    pub fn is_street(&self) -> bool {
        matches!(
            self.kind,
            VertexKind::Intersection { .. } | VertexKind::Split { .. }
        )
    }

    /// The entity kind this vertex is linked as, `None` for street vertices
    pub fn link_kind(&self) -> Option<LinkKind> {
        match self.kind {
            VertexKind::TransitStop { .. } => Some(LinkKind::TransitStop),
            VertexKind::BikeRental { .. } => Some(LinkKind::BikeRental),
            VertexKind::BikePark { .. } => Some(LinkKind::BikePark),
            VertexKind::Intersection { .. } | VertexKind::Split { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Street,
    /// Edge crossing a walkable area
    Area(AreaId),
    /// Connector between an entity and the street network
    Link(LinkEdgeKind),
}

/// Street graph edge (street segment or connector)
#[derive(Debug, Clone)]
pub struct StreetEdge {
    /// Assigned by the graph on insertion
    pub serial: EdgeSerial,
    pub kind: EdgeKind,
    pub name: String,
    pub permission: Permission,
    pub length_mm: Millimeters,
    /// Reverse twin of a two-way way
    pub back: bool,
    pub geometry: LineString<f64>,
}

impl StreetEdge {
    /// Creates an edge whose length is measured from its geometry
    pub fn new(
        kind: EdgeKind,
        geometry: LineString<f64>,
        permission: Permission,
        name: impl Into<String>,
        back: bool,
    ) -> Self {
        Self {
            serial: 0,
            kind,
            name: name.into(),
            permission,
            length_mm: to_millimeters(line_length(&geometry)),
            back,
            geometry,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn length(&self) -> Meters {
        self.length_mm as f64 / 1000.0
    }

    pub fn can_traverse(&self, modes: TraverseModeSet) -> bool {
        self.permission.allows_any(modes)
    }

    /// Street and area edges are eligible link targets, connectors are not
    pub fn is_linkable(&self) -> bool {
        matches!(self.kind, EdgeKind::Street | EdgeKind::Area(_))
    }

    pub fn area(&self) -> Option<AreaId> {
        match self.kind {
            EdgeKind::Area(area) => Some(area),
            _ => None,
        }
    }
}

/// Walkable area bounded by street vertices
#[derive(Debug, Clone, Default)]
pub struct Area {
    pub name: String,
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
}
