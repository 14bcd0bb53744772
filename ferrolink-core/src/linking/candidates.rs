//! Edge and stop candidates around a point

use geo::Point;
use rstar::AABB;

use super::config::LinkerConfig;
use super::geometry::LocalProjection;
use super::selection::{Ranked, select_closest};
use crate::{
    EdgeId, VertexId,
    model::{EdgeSerial, StreetGraph, TraverseMode, TraverseModeSet},
};

/// A street edge found in the index that is still part of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeCandidate {
    pub edge: EdgeId,
    pub serial: EdgeSerial,
}

/// Search parameters fixed for one linking call
#[derive(Debug, Clone, Copy)]
pub struct CandidateSearch {
    pub point: Point<f64>,
    pub projection: LocalProjection,
    pub radius_deg: f64,
    pub envelope: AABB<[f64; 2]>,
}

impl CandidateSearch {
    pub fn new(point: Point<f64>, config: &LinkerConfig) -> Self {
        let projection = LocalProjection::around(point);
        let radius_deg = config.search_radius_degrees();
        Self {
            point,
            projection,
            radius_deg,
            envelope: projection.search_envelope(point, radius_deg),
        }
    }
}

/// Linkable edges inside the search envelope that `mode` may use.
///
/// Index entries left behind by permanent splits are skipped. The order is
/// whatever the index returns.
pub fn find_candidate_edges(
    graph: &StreetGraph,
    search: &CandidateSearch,
    mode: TraverseMode,
) -> Vec<EdgeCandidate> {
    let modes = TraverseModeSet::for_linking(mode);
    graph
        .indexed_edges_in(&search.envelope)
        .filter(|entry| graph.is_attached(entry.edge, entry.serial))
        .filter(|entry| {
            graph
                .edge(entry.edge)
                .is_some_and(|edge| edge.is_linkable() && edge.can_traverse(modes))
        })
        .map(|entry| EdgeCandidate {
            edge: entry.edge,
            serial: entry.serial,
        })
        .collect()
}

/// Tied-nearest edges, closest first.
///
/// Empty when there is no candidate or the closest one lies beyond the
/// search radius.
pub fn find_closest_edges(
    graph: &StreetGraph,
    search: &CandidateSearch,
    mode: TraverseMode,
    epsilon_deg: f64,
) -> Vec<Ranked<EdgeCandidate>> {
    let candidates = find_candidate_edges(graph, search, mode);
    let closest = select_closest(
        candidates,
        |candidate| {
            graph.edge(candidate.edge).map_or(f64::INFINITY, |edge| {
                search.projection.distance_to_line(search.point, &edge.geometry)
            })
        },
        |candidate| candidate.serial,
        epsilon_deg,
    );
    within_radius(closest, search.radius_deg)
}

/// Tied-nearest transit stops, closest first
pub fn find_closest_stops(
    graph: &StreetGraph,
    search: &CandidateSearch,
    epsilon_deg: f64,
) -> Vec<Ranked<VertexId>> {
    let closest = select_closest(
        graph.stops_in(&search.envelope),
        |&stop| {
            graph.vertex(stop).map_or(f64::INFINITY, |vertex| {
                search.projection.distance_to_point(search.point, vertex.geometry)
            })
        },
        |&stop| stop,
        epsilon_deg,
    );
    within_radius(closest, search.radius_deg)
}

fn within_radius<T>(closest: Vec<Ranked<T>>, radius_deg: f64) -> Vec<Ranked<T>> {
    match closest.first() {
        Some(first) if first.distance <= radius_deg => closest,
        _ => Vec::new(),
    }
}
