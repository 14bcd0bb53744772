use geo::{ConvexHull, Intersects, MultiPoint, Point};
use log::info;
use rayon::prelude::*;

use super::annotations::BuildAnnotation;
use crate::{
    Error,
    linking::{LinkReport, LinkerConfig, PermanentLinker},
    model::{StreetGraph, VertexKind},
};

/// Links every transit stop, bike rental station and bike park of `graph`
/// to the street network.
///
/// Runs once before the graph is served. Problems that do not prevent the
/// graph from being used are recorded as [`BuildAnnotation`]s.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a street edge has a
/// degenerate geometry
pub fn link_street_graph(
    graph: &mut StreetGraph,
    config: &LinkerConfig,
) -> Result<LinkReport, Error> {
    config.validate()?;
    info!(
        "Linking street graph with {} vertices and {} edges",
        graph.vertex_count(),
        graph.edge_count()
    );

    if let Some(annotation) = validate_stop_coverage(graph) {
        log::warn!("{annotation}");
        graph.add_annotation(annotation);
    }

    let report = PermanentLinker::new(graph, config).link_all()?;
    info!(
        "Street graph linked: {} edges, {} index entries, {} annotations",
        graph.edge_count(),
        graph.indexed_edge_count(),
        graph.annotations().len()
    );
    Ok(report)
}

/// Counts transit stops outside the convex hull of the street vertices
fn validate_stop_coverage(graph: &StreetGraph) -> Option<BuildAnnotation> {
    let street_points: MultiPoint = graph
        .vertices()
        .filter(|(_, vertex)| vertex.is_street())
        .map(|(_, vertex)| vertex.geometry)
        .collect();
    if street_points.0.is_empty() {
        return None;
    }
    let hull = street_points.convex_hull();

    let stops: Vec<Point<f64>> = graph
        .vertices()
        .filter(|(_, vertex)| matches!(vertex.kind, VertexKind::TransitStop { .. }))
        .map(|(_, vertex)| vertex.geometry)
        .collect();
    let outside = stops
        .par_iter()
        .filter(|stop| !stop.intersects(&hull))
        .count();

    (outside > 0).then_some(BuildAnnotation::StopsOutsideStreetCoverage {
        count: outside,
        total: stops.len(),
    })
}
