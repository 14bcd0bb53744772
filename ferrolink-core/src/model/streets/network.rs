//! Street graph with spatial indices over linkable edges and transit stops

use geo::{BoundingRect, LineString, Point};
use petgraph::{Direction, stable_graph::StableDiGraph, visit::EdgeRef};
use rstar::{AABB, RTree, RTreeObject};

use super::components::{Area, AreaId, EdgeKind, EdgeSerial, StreetEdge, StreetVertex, VertexKind};
use super::permission::Permission;
use crate::{EdgeId, Error, VertexId, loading::BuildAnnotation};

/// R-tree entry for a street edge.
///
/// Entries are never removed when an edge is split permanently, so lookups
/// must confirm the edge is still attached with [`StreetGraph::is_attached`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEdge {
    pub edge: EdgeId,
    pub serial: EdgeSerial,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEdge {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree entry for a transit stop
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    pub vertex: VertexId,
    position: [f64; 2],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Permanent street network.
///
/// Mutated only while the graph is being built; once served it is shared
/// read-only and request-scoped structures live in a
/// [`TemporaryGraph`](crate::model::TemporaryGraph).
#[derive(Clone)]
pub struct StreetGraph {
    pub(crate) graph: StableDiGraph<StreetVertex, StreetEdge>,
    pub(crate) edge_tree: RTree<IndexedEdge>,
    pub(crate) stop_tree: RTree<IndexedPoint>,
    pub(crate) areas: Vec<Area>,
    pub(crate) annotations: Vec<BuildAnnotation>,
    next_serial: EdgeSerial,
}

impl std::fmt::Debug for StreetGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreetGraph")
            .field("vertices", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("indexed_edges", &self.edge_tree.size())
            .field("stops", &self.stop_tree.size())
            .field("areas", &self.areas.len())
            .finish_non_exhaustive()
    }
}

impl Default for StreetGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl StreetGraph {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            edge_tree: RTree::new(),
            stop_tree: RTree::new(),
            areas: Vec::new(),
            annotations: Vec::new(),
            next_serial: 1,
        }
    }

    pub fn add_intersection(&mut self, geometry: Point<f64>, osm_id: Option<i64>) -> VertexId {
        let label = osm_id.map_or_else(|| "intersection".to_string(), |id| format!("osm:{id}"));
        self.add_vertex(StreetVertex::new(
            VertexKind::Intersection { osm_id },
            label,
            geometry,
        ))
    }

    /// Adds a transit stop and registers it in the stop index
    pub fn add_transit_stop(
        &mut self,
        stop_id: impl Into<String>,
        name: impl Into<String>,
        geometry: Point<f64>,
        wheelchair_entrance: bool,
    ) -> VertexId {
        let vertex = self.add_vertex(StreetVertex::new(
            VertexKind::TransitStop {
                stop_id: stop_id.into(),
                wheelchair_entrance,
            },
            name,
            geometry,
        ));
        self.stop_tree.insert(IndexedPoint {
            vertex,
            position: [geometry.x(), geometry.y()],
        });
        vertex
    }

    pub fn add_bike_rental_station(
        &mut self,
        station_id: impl Into<String>,
        name: impl Into<String>,
        geometry: Point<f64>,
    ) -> VertexId {
        self.add_vertex(StreetVertex::new(
            VertexKind::BikeRental {
                station_id: station_id.into(),
            },
            name,
            geometry,
        ))
    }

    pub fn add_bike_park(
        &mut self,
        park_id: impl Into<String>,
        name: impl Into<String>,
        geometry: Point<f64>,
    ) -> VertexId {
        self.add_vertex(StreetVertex::new(
            VertexKind::BikePark {
                park_id: park_id.into(),
            },
            name,
            geometry,
        ))
    }

    pub(crate) fn add_vertex(&mut self, vertex: StreetVertex) -> VertexId {
        self.graph.add_node(vertex)
    }

    /// Adds a one-way street and indexes it.
    ///
    /// Without an explicit geometry the street is a straight line between
    /// the two vertices.
    ///
    /// # Errors
    ///
    /// Returns an error if either vertex does not exist or the geometry has
    /// fewer than two points.
    pub fn add_street(
        &mut self,
        from: VertexId,
        to: VertexId,
        geometry: Option<LineString<f64>>,
        permission: Permission,
        name: &str,
    ) -> Result<EdgeId, Error> {
        let geometry = self.street_geometry(from, to, geometry)?;
        let edge = self.insert_edge(
            from,
            to,
            StreetEdge::new(EdgeKind::Street, geometry, permission, name, false),
        );
        self.index_edge(edge);
        Ok(edge)
    }

    /// Adds both directions of a two-way street; the second edge is the back edge
    ///
    /// # Errors
    ///
    /// See [`StreetGraph::add_street`].
    pub fn add_two_way_street(
        &mut self,
        from: VertexId,
        to: VertexId,
        geometry: Option<LineString<f64>>,
        permission: Permission,
        name: &str,
    ) -> Result<(EdgeId, EdgeId), Error> {
        let forward_geometry = self.street_geometry(from, to, geometry)?;
        let mut backward_geometry = forward_geometry.clone();
        backward_geometry.0.reverse();

        let forward = self.insert_edge(
            from,
            to,
            StreetEdge::new(EdgeKind::Street, forward_geometry, permission, name, false),
        );
        let backward = self.insert_edge(
            to,
            from,
            StreetEdge::new(EdgeKind::Street, backward_geometry, permission, name, true),
        );
        self.index_edge(forward);
        self.index_edge(backward);
        Ok((forward, backward))
    }

    /// Adds a walkable area bounded by `ring`, with edges in both directions
    /// between consecutive ring vertices.
    ///
    /// # Errors
    ///
    /// Returns an error if the ring has fewer than three vertices or refers
    /// to a missing vertex.
    pub fn add_area(
        &mut self,
        name: &str,
        ring: &[VertexId],
        permission: Permission,
    ) -> Result<AreaId, Error> {
        if ring.len() < 3 {
            return Err(Error::InvalidGeometry(format!(
                "area '{name}' needs at least three vertices, got {}",
                ring.len()
            )));
        }
        if ring.iter().any(|&v| self.vertex(v).is_none()) {
            return Err(Error::InvalidVertexIndex);
        }
        let area_id = self.areas.len();
        let mut edges = Vec::with_capacity(ring.len() * 2);

        for (i, &from) in ring.iter().enumerate() {
            let to = ring[(i + 1) % ring.len()];
            let geometry = self.street_geometry(from, to, None)?;
            let mut reversed = geometry.clone();
            reversed.0.reverse();

            let kind = EdgeKind::Area(area_id);
            edges.push(self.insert_edge(
                from,
                to,
                StreetEdge::new(kind, geometry, permission, name, false),
            ));
            edges.push(self.insert_edge(
                to,
                from,
                StreetEdge::new(kind, reversed, permission, name, true),
            ));
        }
        for &edge in &edges {
            self.index_edge(edge);
        }

        self.areas.push(Area {
            name: name.to_string(),
            vertices: ring.to_vec(),
            edges,
        });
        Ok(area_id)
    }

    fn street_geometry(
        &self,
        from: VertexId,
        to: VertexId,
        geometry: Option<LineString<f64>>,
    ) -> Result<LineString<f64>, Error> {
        let start = self.vertex(from).ok_or(Error::InvalidVertexIndex)?.geometry;
        let end = self.vertex(to).ok_or(Error::InvalidVertexIndex)?.geometry;
        match geometry {
            Some(line) if line.0.len() < 2 => Err(Error::InvalidGeometry(format!(
                "street geometry must have at least two points, got {}",
                line.0.len()
            ))),
            Some(line) => Ok(line),
            None => Ok(LineString::from(vec![start.0, end.0])),
        }
    }

    /// Inserts an edge, assigning it a fresh serial. The edge is not indexed.
    pub(crate) fn insert_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        mut edge: StreetEdge,
    ) -> EdgeId {
        edge.serial = self.next_serial;
        self.next_serial += 1;
        self.graph.add_edge(from, to, edge)
    }

    pub(crate) fn index_edge(&mut self, edge: EdgeId) {
        let Some(weight) = self.graph.edge_weight(edge) else {
            return;
        };
        let Some(rect) = weight.geometry.bounding_rect() else {
            return;
        };
        self.edge_tree.insert(IndexedEdge {
            edge,
            serial: weight.serial,
            envelope: AABB::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
        });
    }

    /// Removes an edge from both endpoints' incident lists.
    ///
    /// The spatial index keeps its stale entry.
    pub(crate) fn detach_edge(&mut self, edge: EdgeId) -> Option<StreetEdge> {
        self.graph.remove_edge(edge)
    }

    pub(crate) fn area_mut(&mut self, area: AreaId) -> Option<&mut Area> {
        self.areas.get_mut(area)
    }

    pub(crate) fn add_annotation(&mut self, annotation: BuildAnnotation) {
        self.annotations.push(annotation);
    }

    pub fn vertex(&self, vertex: VertexId) -> Option<&StreetVertex> {
        self.graph.node_weight(vertex)
    }

    pub fn edge(&self, edge: EdgeId) -> Option<&StreetEdge> {
        self.graph.edge_weight(edge)
    }

    pub fn edge_endpoints(&self, edge: EdgeId) -> Option<(VertexId, VertexId)> {
        self.graph.edge_endpoints(edge)
    }

    /// Outgoing edges as `(edge, target, weight)`
    pub fn outgoing(
        &self,
        vertex: VertexId,
    ) -> impl Iterator<Item = (EdgeId, VertexId, &StreetEdge)> + '_ {
        self.graph
            .edges_directed(vertex, Direction::Outgoing)
            .map(|e| (e.id(), e.target(), e.weight()))
    }

    /// Incoming edges as `(edge, source, weight)`
    pub fn incoming(
        &self,
        vertex: VertexId,
    ) -> impl Iterator<Item = (EdgeId, VertexId, &StreetEdge)> + '_ {
        self.graph
            .edges_directed(vertex, Direction::Incoming)
            .map(|e| (e.id(), e.source(), e.weight()))
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &StreetVertex)> + '_ {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx).map(|v| (idx, v)))
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of entries in the edge index, including stale ones
    pub fn indexed_edge_count(&self) -> usize {
        self.edge_tree.size()
    }

    pub fn area(&self, area: AreaId) -> Option<&Area> {
        self.areas.get(area)
    }

    pub fn annotations(&self) -> &[BuildAnnotation] {
        &self.annotations
    }

    /// Index entries whose bounding box intersects `envelope`
    pub fn indexed_edges_in<'a>(
        &'a self,
        envelope: &AABB<[f64; 2]>,
    ) -> impl Iterator<Item = &'a IndexedEdge> + 'a {
        self.edge_tree.locate_in_envelope_intersecting(envelope)
    }

    /// Transit stops inside `envelope`
    pub fn stops_in<'a>(
        &'a self,
        envelope: &AABB<[f64; 2]>,
    ) -> impl Iterator<Item = VertexId> + 'a {
        self.stop_tree
            .locate_in_envelope_intersecting(envelope)
            .map(|point| point.vertex)
    }

    /// Whether the edge with `serial` still occupies slot `edge` and is
    /// listed among its destination's incoming edges
    pub fn is_attached(&self, edge: EdgeId, serial: EdgeSerial) -> bool {
        self.graph.edge_endpoints(edge).is_some_and(|(_, to)| {
            self.graph
                .edges_directed(to, Direction::Incoming)
                .any(|e| e.id() == edge && e.weight().serial == serial)
        })
    }

    /// Whether an edge `from -> to` matching `predicate` exists
    pub fn has_edge_between(
        &self,
        from: VertexId,
        to: VertexId,
        predicate: impl Fn(&StreetEdge) -> bool,
    ) -> bool {
        self.outgoing(from)
            .any(|(_, target, edge)| target == to && predicate(edge))
    }
}
