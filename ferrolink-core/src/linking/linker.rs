//! Linking orchestration.
//!
//! [`PermanentLinker`] mutates the street graph while it is being built.
//! [`TemporaryLinker`] only reads it and records everything it creates in a
//! [`TemporaryGraph`], so any number of requests may link concurrently
//! against the same shared graph.

use geo::Point;

use super::candidates::{CandidateSearch, find_closest_edges, find_closest_stops};
use super::config::LinkerConfig;
use super::geometry::degrees_to_meters;
use super::link_edges::{
    LinkKind, link_to_area_vertices, make_permanent_links, make_temporary_links,
};
use super::request::{RequestContext, SplitGate, TemporaryLocation};
use super::split::{Attachment, plan_attachment, split_permanent, split_temporary};
use crate::{
    Error, VertexId,
    loading::BuildAnnotation,
    model::{
        StreetGraph, TempVertexId, TemporaryGraph, TemporaryVertexKind, TraverseMode, VertexKind,
        VertexRef,
    },
};

/// Counts of entities linked by [`PermanentLinker::link_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub stops_linked: usize,
    pub stops_unlinked: usize,
    pub bike_rentals_linked: usize,
    pub bike_rentals_unlinked: usize,
    pub bike_parks_linked: usize,
    pub bike_parks_unlinked: usize,
}

/// Destructive linker used while the graph is built
pub struct PermanentLinker<'g> {
    graph: &'g mut StreetGraph,
    config: &'g LinkerConfig,
}

impl<'g> PermanentLinker<'g> {
    pub fn new(graph: &'g mut StreetGraph, config: &'g LinkerConfig) -> Self {
        Self { graph, config }
    }

    pub fn graph(&self) -> &StreetGraph {
        self.graph
    }

    /// Links an entity vertex to the closest edges usable by `mode`.
    ///
    /// Returns `false` if no edge lies within the search radius; the graph
    /// is then left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if `vertex` does not exist or is a street vertex
    pub fn link(&mut self, vertex: VertexId, mode: TraverseMode) -> Result<bool, Error> {
        let entity = self.graph.vertex(vertex).ok_or(Error::InvalidVertexIndex)?;
        let kind = entity.link_kind().ok_or(Error::NotLinkable(vertex))?;
        let point = entity.geometry;
        let label = entity.label.clone();

        let search = CandidateSearch::new(point, self.config);
        let closest = find_closest_edges(
            self.graph,
            &search,
            mode,
            self.config.duplicate_way_epsilon_degrees(),
        );
        let Some(nearest) = closest.first() else {
            return Ok(false);
        };

        let distance_m = degrees_to_meters(nearest.distance);
        if kind == LinkKind::TransitStop && distance_m > self.config.warning_distance_m {
            let annotation = BuildAnnotation::StopLinkedTooFar {
                stop: vertex,
                label,
                distance_m,
            };
            log::warn!("{annotation}");
            self.graph.add_annotation(annotation);
        }

        for candidate in closest {
            let edge = candidate.item.edge;
            let street = match plan_attachment(
                self.graph,
                edge,
                point,
                &search.projection,
                self.config.endpoint_snap_epsilon,
            )? {
                Attachment::Endpoint(street) => street,
                Attachment::Split(location) => {
                    let area = self.graph.edge(edge).and_then(|e| e.area());
                    let split = split_permanent(self.graph, edge, location)?;
                    if let Some(area) = area {
                        if kind == LinkKind::TransitStop && self.config.add_extra_edges_to_areas {
                            link_to_area_vertices(self.graph, split, area);
                        }
                    }
                    split
                }
            };
            make_permanent_links(self.graph, vertex, street, kind);
        }
        Ok(true)
    }

    /// Links every transit stop, bike rental station and bike park.
    ///
    /// Stops and stations are linked for walking, bike parks for cycling.
    /// Entities that cannot be linked are annotated on the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if a split meets a degenerate edge geometry
    pub fn link_all(&mut self) -> Result<LinkReport, Error> {
        let entities: Vec<(VertexId, LinkKind)> = self
            .graph
            .vertices()
            .filter_map(|(id, vertex)| vertex.link_kind().map(|kind| (id, kind)))
            .collect();
        log::info!("Linking {} entities to the street network", entities.len());

        let mut report = LinkReport::default();
        for (vertex, kind) in entities {
            let mode = match kind {
                LinkKind::BikePark => TraverseMode::Bicycle,
                _ => TraverseMode::Walk,
            };
            let linked = self.link(vertex, mode)?;
            let (linked_count, unlinked_count) = match kind {
                LinkKind::TransitStop => (&mut report.stops_linked, &mut report.stops_unlinked),
                LinkKind::BikeRental => (
                    &mut report.bike_rentals_linked,
                    &mut report.bike_rentals_unlinked,
                ),
                _ => (
                    &mut report.bike_parks_linked,
                    &mut report.bike_parks_unlinked,
                ),
            };
            if linked {
                *linked_count += 1;
            } else {
                *unlinked_count += 1;
                if let Some(annotation) = self.unlinked_annotation(vertex) {
                    log::warn!("{annotation}");
                    self.graph.add_annotation(annotation);
                }
            }
        }
        log::info!(
            "Linked {} of {} stops",
            report.stops_linked,
            report.stops_linked + report.stops_unlinked
        );
        Ok(report)
    }

    fn unlinked_annotation(&self, vertex: VertexId) -> Option<BuildAnnotation> {
        let entity = self.graph.vertex(vertex)?;
        let label = entity.label.clone();
        match &entity.kind {
            VertexKind::TransitStop { stop_id, .. } => Some(BuildAnnotation::StopUnlinked {
                stop: vertex,
                stop_id: stop_id.clone(),
                label,
            }),
            VertexKind::BikeRental { station_id } => {
                Some(BuildAnnotation::BikeRentalStationUnlinked {
                    station: vertex,
                    station_id: station_id.clone(),
                    label,
                })
            }
            VertexKind::BikePark { park_id } => Some(BuildAnnotation::BikeParkUnlinked {
                park: vertex,
                park_id: park_id.clone(),
                label,
            }),
            VertexKind::Intersection { .. } | VertexKind::Split { .. } => None,
        }
    }
}

/// Non-destructive linker used while the graph is served
#[derive(Debug, Clone, Copy)]
pub struct TemporaryLinker<'g> {
    graph: &'g StreetGraph,
    config: &'g LinkerConfig,
}

impl<'g> TemporaryLinker<'g> {
    pub fn new(graph: &'g StreetGraph, config: &'g LinkerConfig) -> Self {
        Self { graph, config }
    }

    pub fn graph(&self) -> &'g StreetGraph {
        self.graph
    }

    /// Creates the origin (`end_vertex == false`) or destination of a search
    /// at `point` and links it into the request's temporary subgraph.
    ///
    /// An unlinkable point still gets a vertex, reported with `linked == false`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrivialPath`] if the point would split an edge that
    /// the other endpoint of the request already split
    pub fn link_location(
        &self,
        ctx: &mut RequestContext,
        point: Point<f64>,
        end_vertex: bool,
    ) -> Result<TemporaryLocation, Error> {
        let (kind, label) = if end_vertex {
            (LinkKind::Destination, "destination")
        } else {
            (LinkKind::Origin, "origin")
        };
        let mode = ctx.modes().linking_mode(end_vertex);
        let (arena, gate) = ctx.parts_mut();
        let vertex = arena.add_vertex(
            TemporaryVertexKind::StreetLocation { end_vertex },
            label,
            point,
        );

        let linked = self.link_vertex(arena, vertex, kind, mode, Some(gate))?;
        if !linked {
            log::warn!(
                "Couldn't link {label} at ({}, {}) to the street network",
                point.x(),
                point.y()
            );
        }
        Ok(TemporaryLocation { vertex, linked })
    }

    /// Links a temporary vertex to the closest edges usable by `mode`.
    ///
    /// Splits are recorded with `gate` when given. Search endpoints that find
    /// no edge fall back to the nearest transit stops.
    pub(crate) fn link_vertex(
        &self,
        arena: &mut TemporaryGraph,
        vertex: TempVertexId,
        kind: LinkKind,
        mode: TraverseMode,
        mut gate: Option<&mut SplitGate>,
    ) -> Result<bool, Error> {
        let point = arena.vertex(vertex).ok_or(Error::InvalidVertexIndex)?.geometry;
        let search = CandidateSearch::new(point, self.config);
        let epsilon = self.config.duplicate_way_epsilon_degrees();
        let closest = find_closest_edges(self.graph, &search, mode, epsilon);

        if closest.is_empty() {
            return Ok(kind.is_ad_hoc() && self.link_to_stops(arena, vertex, &search, kind));
        }

        for candidate in closest {
            let edge = candidate.item.edge;
            let street = match plan_attachment(
                self.graph,
                edge,
                point,
                &search.projection,
                self.config.endpoint_snap_epsilon,
            )? {
                Attachment::Endpoint(street) => VertexRef::Permanent(street),
                Attachment::Split(location) => {
                    if let Some(gate) = gate.as_deref_mut() {
                        gate.record(edge)?;
                    }
                    let split =
                        split_temporary(self.graph, arena, edge, location, kind.split_side())?;
                    VertexRef::Temporary(split)
                }
            };
            let street_point = self.location(arena, street)?;
            make_temporary_links(
                arena,
                (VertexRef::Temporary(vertex), point),
                (street, street_point),
                kind,
            );
        }
        Ok(true)
    }

    fn link_to_stops(
        &self,
        arena: &mut TemporaryGraph,
        vertex: TempVertexId,
        search: &CandidateSearch,
        kind: LinkKind,
    ) -> bool {
        let stops = find_closest_stops(
            self.graph,
            search,
            self.config.duplicate_way_epsilon_degrees(),
        );
        let mut linked = false;
        for stop in stops {
            let Some(stop_point) = self.graph.vertex(stop.item).map(|v| v.geometry) else {
                continue;
            };
            log::debug!("Linking {vertex:?} directly to stop {:?}", stop.item);
            make_temporary_links(
                arena,
                (VertexRef::Temporary(vertex), search.point),
                (VertexRef::Permanent(stop.item), stop_point),
                kind,
            );
            linked = true;
        }
        linked
    }

    fn location(&self, arena: &TemporaryGraph, vertex: VertexRef) -> Result<Point<f64>, Error> {
        let point = match vertex {
            VertexRef::Permanent(v) => self.graph.vertex(v).map(|v| v.geometry),
            VertexRef::Temporary(v) => arena.vertex(v).map(|v| v.geometry),
        };
        point.ok_or(Error::InvalidVertexIndex)
    }
}

#[cfg(test)]
mod tests {
    use geo::point;

    use super::*;
    use crate::linking::request::RequestModes;
    use crate::model::streets::fixtures::simple_street;
    use crate::model::{EdgeKind, TemporaryEdgeKind};

    #[test]
    fn stop_near_the_middle_splits_both_twins() {
        let mut street = simple_street();
        let stop = street
            .graph
            .add_transit_stop("s", "Stop", point!(x: 30.001, y: 60.0001), false);
        let config = LinkerConfig::default();
        let forward_serial = street.graph.edge(street.forward).unwrap().serial;
        let backward_serial = street.graph.edge(street.backward).unwrap().serial;

        let linked = PermanentLinker::new(&mut street.graph, &config)
            .link(stop, TraverseMode::Walk)
            .unwrap();

        assert!(linked);
        // Freed slots may be reused by connectors, so check by serial
        assert!(!street.graph.is_attached(street.forward, forward_serial));
        assert!(!street.graph.is_attached(street.backward, backward_serial));
        assert!(!street.graph.outgoing(street.a).any(|(_, to, _)| to == street.b));
        assert!(!street.graph.outgoing(street.b).any(|(_, to, _)| to == street.a));
        // Two split vertices, each linked both ways
        assert_eq!(street.graph.outgoing(stop).count(), 2);
        assert_eq!(street.graph.incoming(stop).count(), 2);
        assert!(street.graph.annotations().is_empty());
    }

    #[test]
    fn stop_at_an_intersection_snaps_to_it() {
        let mut street = simple_street();
        let stop = street
            .graph
            .add_transit_stop("s", "Stop", point!(x: 29.9999, y: 60.0), false);
        let config = LinkerConfig::default();
        let vertices_before = street.graph.vertex_count();

        PermanentLinker::new(&mut street.graph, &config)
            .link(stop, TraverseMode::Walk)
            .unwrap();

        assert_eq!(street.graph.vertex_count(), vertices_before);
        let targets: Vec<VertexId> = street.graph.outgoing(stop).map(|(_, to, _)| to).collect();
        assert_eq!(targets, vec![street.a]);
    }

    #[test]
    fn far_stop_is_annotated() {
        let mut street = simple_street();
        // About 55 m north of the street
        let stop = street
            .graph
            .add_transit_stop("s", "Stop", point!(x: 30.001, y: 60.0005), false);
        let config = LinkerConfig::default();

        PermanentLinker::new(&mut street.graph, &config)
            .link(stop, TraverseMode::Walk)
            .unwrap();

        assert!(matches!(
            street.graph.annotations(),
            [BuildAnnotation::StopLinkedTooFar { distance_m, .. }]
                if (*distance_m - 55.6).abs() < 1.0
        ));
    }

    #[test]
    fn street_vertices_are_not_linkable() {
        let mut street = simple_street();
        let config = LinkerConfig::default();
        let result =
            PermanentLinker::new(&mut street.graph, &config).link(street.a, TraverseMode::Walk);
        assert!(matches!(result, Err(Error::NotLinkable(v)) if v == street.a));
    }

    #[test]
    fn transit_stop_on_area_edge_connects_to_area_vertices() {
        let mut graph = StreetGraph::new();
        let a = graph.add_intersection(point!(x: 30.0, y: 60.0), None);
        let b = graph.add_intersection(point!(x: 30.002, y: 60.0), None);
        let c = graph.add_intersection(point!(x: 30.002, y: 60.002), None);
        let d = graph.add_intersection(point!(x: 30.0, y: 60.002), None);
        let area = graph
            .add_area("platform", &[a, b, c, d], crate::model::Permission::PEDESTRIAN)
            .unwrap();
        let stop = graph.add_transit_stop("s", "Stop", point!(x: 30.001, y: 59.9999), false);
        let config = LinkerConfig::default();

        PermanentLinker::new(&mut graph, &config)
            .link(stop, TraverseMode::Walk)
            .unwrap();

        let splits: Vec<VertexId> = graph.outgoing(stop).map(|(_, to, _)| to).collect();
        assert_eq!(splits.len(), 2);
        for split in splits {
            assert!(graph.area(area).unwrap().vertices.contains(&split));
            assert!(graph.has_edge_between(split, c, |e| e.kind == EdgeKind::Street));
            assert!(graph.has_edge_between(d, split, |e| e.kind == EdgeKind::Street));
        }
    }

    #[test]
    fn origin_links_without_touching_the_graph() {
        let street = simple_street();
        let config = LinkerConfig::default();
        let linker = TemporaryLinker::new(&street.graph, &config);
        let mut ctx = RequestContext::new(RequestModes::walk());

        let origin = linker
            .link_location(&mut ctx, point!(x: 30.0005, y: 60.0001), false)
            .unwrap();

        assert!(origin.linked);
        assert_eq!(street.graph.edge_count(), 2);
        assert_eq!(street.graph.indexed_edge_count(), 2);
        // Origin vertex, one split per twin
        assert_eq!(ctx.temporary().vertex_count(), 3);
        let view = ctx.view(&street.graph);
        let first_hop = view.outgoing(VertexRef::Temporary(origin.vertex));
        assert_eq!(first_hop.len(), 2);
        for edge in first_hop {
            let partial = view.outgoing(edge.to());
            assert_eq!(partial.len(), 1);
            assert!(matches!(
                partial[0],
                crate::model::EdgeView::Temporary(e)
                    if matches!(e.kind, TemporaryEdgeKind::PartialStreet { .. })
            ));
        }
        ctx.dispose();
        assert_eq!(street.graph.edge_count(), 2);
    }

    #[test]
    fn origin_and_destination_on_one_edge_is_a_trivial_path() {
        let mut graph = StreetGraph::new();
        let a = graph.add_intersection(point!(x: 30.0, y: 60.0), None);
        let b = graph.add_intersection(point!(x: 30.002, y: 60.0), None);
        let edge = graph
            .add_street(a, b, None, crate::model::Permission::ALL, "one way")
            .unwrap();
        let config = LinkerConfig::default();
        let linker = TemporaryLinker::new(&graph, &config);
        let mut ctx = RequestContext::new(RequestModes::walk());

        linker
            .link_location(&mut ctx, point!(x: 30.0005, y: 60.0001), false)
            .unwrap();
        let result = linker.link_location(&mut ctx, point!(x: 30.0015, y: 60.0001), true);

        assert!(matches!(result, Err(Error::TrivialPath(e)) if e == edge));
    }

    #[test]
    fn origin_without_streets_falls_back_to_stops() {
        let mut graph = StreetGraph::new();
        let stop = graph.add_transit_stop("s", "Stop", point!(x: 30.0, y: 60.0), false);
        let config = LinkerConfig::default();
        let linker = TemporaryLinker::new(&graph, &config);
        let mut ctx = RequestContext::new(RequestModes::walk());

        let origin = linker
            .link_location(&mut ctx, point!(x: 30.0001, y: 60.0), false)
            .unwrap();

        assert!(origin.linked);
        let edges: Vec<_> = ctx
            .temporary()
            .outgoing(VertexRef::Temporary(origin.vertex))
            .collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to, VertexRef::Permanent(stop));
    }

    #[test]
    fn unlinkable_point_is_reported_not_failed() {
        let street = simple_street();
        let config = LinkerConfig::default();
        let linker = TemporaryLinker::new(&street.graph, &config);
        let mut ctx = RequestContext::new(RequestModes::walk());

        let destination = linker
            .link_location(&mut ctx, point!(x: 31.0, y: 61.0), true)
            .unwrap();

        assert!(!destination.linked);
        assert_eq!(ctx.temporary().edge_count(), 0);
    }
}
