//! Arena for request-scoped vertices and edges.
//!
//! A [`TemporaryGraph`] owns everything created while linking one search
//! endpoint pair or one dynamic entity. Edges that touch permanent vertices
//! are recorded in the arena's own overlay lists, so the permanent graph and
//! its spatial index are never modified. Dropping the arena releases the
//! whole temporary subgraph.

use std::sync::atomic::{AtomicU64, Ordering};

use geo::{LineString, Point};
use hashbrown::HashMap;
use petgraph::Direction;

use super::streets::{EdgeSerial, Permission};
use crate::{
    EdgeId, Millimeters, VertexId,
    dynamic::EntityKey,
    linking::link_edges::{LinkEdgeKind, LinkKind},
    linking::split::SplitSide,
};

static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(u64);

/// Handle to a temporary vertex; only resolves against the arena that created it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempVertexId {
    arena: ArenaId,
    index: u32,
}

impl TempVertexId {
    pub fn arena(&self) -> ArenaId {
        self.arena
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempEdgeId {
    arena: ArenaId,
    index: u32,
}

/// Either a vertex of the permanent graph or one owned by an arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexRef {
    Permanent(VertexId),
    Temporary(TempVertexId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemporaryVertexKind {
    /// Ad-hoc origin (`end_vertex == false`) or destination of a search
    StreetLocation { end_vertex: bool },
    /// Split point of a permanent edge that was left untouched
    Split { parent: EdgeSerial, side: SplitSide },
    /// Dynamically appearing entity such as a shared vehicle
    Entity { key: EntityKey, kind: LinkKind },
}

#[derive(Debug, Clone)]
pub struct TemporaryVertex {
    pub kind: TemporaryVertexKind,
    pub label: String,
    pub geometry: Point<f64>,
    outgoing: Vec<TempEdgeId>,
    incoming: Vec<TempEdgeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporaryEdgeKind {
    /// Part of the permanent edge `parent` between an endpoint and a split point
    PartialStreet { parent: EdgeId },
    Link(LinkEdgeKind),
}

#[derive(Debug, Clone)]
pub struct TemporaryEdge {
    pub from: VertexRef,
    pub to: VertexRef,
    pub kind: TemporaryEdgeKind,
    pub permission: Permission,
    pub length_mm: Millimeters,
    pub geometry: LineString<f64>,
}

#[derive(Debug)]
pub struct TemporaryGraph {
    id: ArenaId,
    vertices: Vec<TemporaryVertex>,
    edges: Vec<TemporaryEdge>,
    permanent_outgoing: HashMap<VertexId, Vec<TempEdgeId>>,
    permanent_incoming: HashMap<VertexId, Vec<TempEdgeId>>,
}

impl Default for TemporaryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporaryGraph {
    pub fn new() -> Self {
        Self {
            id: ArenaId(NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed)),
            vertices: Vec::new(),
            edges: Vec::new(),
            permanent_outgoing: HashMap::new(),
            permanent_incoming: HashMap::new(),
        }
    }

    pub fn id(&self) -> ArenaId {
        self.id
    }

    pub(crate) fn add_vertex(
        &mut self,
        kind: TemporaryVertexKind,
        label: impl Into<String>,
        geometry: Point<f64>,
    ) -> TempVertexId {
        let id = TempVertexId {
            arena: self.id,
            index: u32::try_from(self.vertices.len()).unwrap_or(u32::MAX),
        };
        self.vertices.push(TemporaryVertex {
            kind,
            label: label.into(),
            geometry,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        });
        id
    }

    /// Adds an edge and registers it with both endpoints.
    ///
    /// Permanent endpoints are tracked in the arena's overlay only.
    pub(crate) fn add_edge(&mut self, edge: TemporaryEdge) -> TempEdgeId {
        let id = TempEdgeId {
            arena: self.id,
            index: u32::try_from(self.edges.len()).unwrap_or(u32::MAX),
        };
        match edge.from {
            VertexRef::Permanent(v) => self.permanent_outgoing.entry(v).or_default().push(id),
            VertexRef::Temporary(v) => {
                if let Some(vertex) = self.vertex_mut(v) {
                    vertex.outgoing.push(id);
                }
            }
        }
        match edge.to {
            VertexRef::Permanent(v) => self.permanent_incoming.entry(v).or_default().push(id),
            VertexRef::Temporary(v) => {
                if let Some(vertex) = self.vertex_mut(v) {
                    vertex.incoming.push(id);
                }
            }
        }
        self.edges.push(edge);
        id
    }

    pub fn owns(&self, vertex: TempVertexId) -> bool {
        vertex.arena == self.id && (vertex.index as usize) < self.vertices.len()
    }

    pub fn vertex(&self, vertex: TempVertexId) -> Option<&TemporaryVertex> {
        if vertex.arena != self.id {
            return None;
        }
        self.vertices.get(vertex.index as usize)
    }

    fn vertex_mut(&mut self, vertex: TempVertexId) -> Option<&mut TemporaryVertex> {
        if vertex.arena != self.id {
            return None;
        }
        self.vertices.get_mut(vertex.index as usize)
    }

    pub fn edge(&self, edge: TempEdgeId) -> Option<&TemporaryEdge> {
        if edge.arena != self.id {
            return None;
        }
        self.edges.get(edge.index as usize)
    }

    fn incident(&self, vertex: VertexRef, direction: Direction) -> &[TempEdgeId] {
        let list = match (vertex, direction) {
            (VertexRef::Permanent(v), Direction::Outgoing) => self.permanent_outgoing.get(&v),
            (VertexRef::Permanent(v), Direction::Incoming) => self.permanent_incoming.get(&v),
            (VertexRef::Temporary(v), Direction::Outgoing) => self.vertex(v).map(|t| &t.outgoing),
            (VertexRef::Temporary(v), Direction::Incoming) => self.vertex(v).map(|t| &t.incoming),
        };
        list.map(Vec::as_slice).unwrap_or_default()
    }

    /// Temporary edges leaving `vertex` that this arena knows about
    pub fn outgoing(&self, vertex: VertexRef) -> impl Iterator<Item = &TemporaryEdge> + '_ {
        self.incident(vertex, Direction::Outgoing)
            .iter()
            .filter_map(move |&id| self.edge(id))
    }

    /// Temporary edges entering `vertex` that this arena knows about
    pub fn incoming(&self, vertex: VertexRef) -> impl Iterator<Item = &TemporaryEdge> + '_ {
        self.incident(vertex, Direction::Incoming)
            .iter()
            .filter_map(move |&id| self.edge(id))
    }

    /// Whether a link edge of `kind` already connects `from` to `to`
    pub fn has_link(&self, from: VertexRef, to: VertexRef, kind: LinkEdgeKind) -> bool {
        self.outgoing(from)
            .any(|e| e.to == to && e.kind == TemporaryEdgeKind::Link(kind))
    }

    /// Permanent vertices touched by at least one temporary edge, sorted
    pub fn permanent_vertices(&self) -> Vec<VertexId> {
        let mut vertices: Vec<VertexId> = self
            .permanent_outgoing
            .keys()
            .chain(self.permanent_incoming.keys())
            .copied()
            .collect();
        vertices.sort_unstable();
        vertices.dedup();
        vertices
    }

    pub fn vertices(&self) -> impl Iterator<Item = (TempVertexId, &TemporaryVertex)> + '_ {
        self.vertices.iter().enumerate().map(move |(index, vertex)| {
            (
                TempVertexId {
                    arena: self.id,
                    index: u32::try_from(index).unwrap_or(u32::MAX),
                },
                vertex,
            )
        })
    }

    pub fn edges(&self) -> impl Iterator<Item = &TemporaryEdge> + '_ {
        self.edges.iter()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }

    /// Releases the arena and everything it owns
    pub fn dispose(self) {
        log::trace!(
            "Disposing temporary graph {:?} with {} vertices and {} edges",
            self.id,
            self.vertices.len(),
            self.edges.len()
        );
    }
}
