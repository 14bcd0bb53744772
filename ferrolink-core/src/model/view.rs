//! Read-only adjacency over the permanent graph plus temporary overlays.
//!
//! This is what an external path search walks: the shared street graph,
//! the request's own arena and the arenas of currently linked dynamic
//! entities, without any of them being merged.

use geo::{LineString, Point};

use super::streets::{Permission, StreetEdge, StreetGraph};
use super::temporary::{TemporaryEdge, TemporaryGraph, VertexRef};
use crate::{EdgeId, Millimeters};

#[derive(Debug, Clone, Copy)]
pub enum EdgeView<'a> {
    Permanent {
        id: EdgeId,
        from: VertexRef,
        to: VertexRef,
        edge: &'a StreetEdge,
    },
    Temporary(&'a TemporaryEdge),
}

impl<'a> EdgeView<'a> {
    pub fn from(&self) -> VertexRef {
        match self {
            EdgeView::Permanent { from, .. } => *from,
            EdgeView::Temporary(edge) => edge.from,
        }
    }

    pub fn to(&self) -> VertexRef {
        match self {
            EdgeView::Permanent { to, .. } => *to,
            EdgeView::Temporary(edge) => edge.to,
        }
    }

    pub fn length_mm(&self) -> Millimeters {
        match self {
            EdgeView::Permanent { edge, .. } => edge.length_mm,
            EdgeView::Temporary(edge) => edge.length_mm,
        }
    }

    pub fn permission(&self) -> Permission {
        match self {
            EdgeView::Permanent { edge, .. } => edge.permission,
            EdgeView::Temporary(edge) => edge.permission,
        }
    }

    pub fn geometry(&self) -> &'a LineString<f64> {
        match self {
            EdgeView::Permanent { edge, .. } => &edge.geometry,
            EdgeView::Temporary(edge) => &edge.geometry,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, EdgeView::Temporary(_))
    }
}

#[derive(Debug, Clone)]
pub struct GraphView<'a> {
    streets: &'a StreetGraph,
    overlays: Vec<&'a TemporaryGraph>,
}

impl<'a> GraphView<'a> {
    pub fn new(streets: &'a StreetGraph) -> Self {
        Self {
            streets,
            overlays: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_overlay(mut self, overlay: &'a TemporaryGraph) -> Self {
        self.overlays.push(overlay);
        self
    }

    #[must_use]
    pub fn with_overlays(mut self, overlays: impl IntoIterator<Item = &'a TemporaryGraph>) -> Self {
        self.overlays.extend(overlays);
        self
    }

    pub fn streets(&self) -> &'a StreetGraph {
        self.streets
    }

    pub fn location(&self, vertex: VertexRef) -> Option<Point<f64>> {
        match vertex {
            VertexRef::Permanent(v) => self.streets.vertex(v).map(|v| v.geometry),
            VertexRef::Temporary(v) => self
                .overlays
                .iter()
                .find_map(|overlay| overlay.vertex(v))
                .map(|v| v.geometry),
        }
    }

    pub fn outgoing(&self, vertex: VertexRef) -> Vec<EdgeView<'a>> {
        let mut edges = Vec::new();
        if let VertexRef::Permanent(v) = vertex {
            edges.extend(self.streets.outgoing(v).map(|(id, to, edge)| EdgeView::Permanent {
                id,
                from: vertex,
                to: VertexRef::Permanent(to),
                edge,
            }));
        }
        for overlay in self.overlays.iter().copied() {
            edges.extend(overlay.outgoing(vertex).map(EdgeView::Temporary));
        }
        edges
    }

    pub fn incoming(&self, vertex: VertexRef) -> Vec<EdgeView<'a>> {
        let mut edges = Vec::new();
        if let VertexRef::Permanent(v) = vertex {
            edges.extend(self.streets.incoming(v).map(|(id, from, edge)| EdgeView::Permanent {
                id,
                from: VertexRef::Permanent(from),
                to: vertex,
                edge,
            }));
        }
        for overlay in self.overlays.iter().copied() {
            edges.extend(overlay.incoming(vertex).map(EdgeView::Temporary));
        }
        edges
    }
}
