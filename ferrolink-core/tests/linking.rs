mod common;

use ferrolink_core::linking::{CandidateSearch, find_closest_edges};
use ferrolink_core::model::{EdgeView, TemporaryEdgeKind, TemporaryVertexKind};
use ferrolink_core::prelude::*;
use geo::point;

use common::{Grid, grid};

fn street_length_mm(graph: &StreetGraph) -> Millimeters {
    graph
        .vertices()
        .flat_map(|(v, _)| graph.outgoing(v))
        .filter(|(_, _, edge)| edge.kind == EdgeKind::Street)
        .map(|(_, _, edge)| edge.length_mm)
        .sum()
}

#[test]
fn candidate_search_is_repeatable() {
    let Grid { graph, .. } = grid(5, Permission::ALL);
    let config = LinkerConfig::default();
    let search = CandidateSearch::new(point!(x: 30.00153, y: 60.00201), &config);
    let epsilon = config.duplicate_way_epsilon_degrees();

    let first = find_closest_edges(&graph, &search, TraverseMode::Walk, epsilon);
    for _ in 0..10 {
        assert_eq!(find_closest_edges(&graph, &search, TraverseMode::Walk, epsilon), first);
    }
    assert_eq!(first.len(), 2);
    assert!(first.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn build_time_linking_conserves_street_length() {
    let Grid { mut graph, .. } = grid(4, Permission::ALL);
    graph.add_transit_stop("1", "First", point!(x: 30.0004, y: 60.00005), false);
    graph.add_transit_stop("2", "Second", point!(x: 30.00205, y: 60.0017), true);
    graph.add_bike_rental_station("r", "Rental", point!(x: 30.0011, y: 60.0029));
    let before = street_length_mm(&graph);
    let edges_before = graph.edge_count();

    let report = link_street_graph(&mut graph, &LinkerConfig::default()).unwrap();

    assert_eq!(report.stops_linked, 2);
    assert_eq!(report.bike_rentals_linked, 1);
    assert_eq!(street_length_mm(&graph), before);
    // Each entity split two twins: +2 street edges per entity, +4 connectors
    assert_eq!(graph.edge_count(), edges_before + 3 * (2 + 4));
    assert!(graph.annotations().is_empty());
}

#[test]
fn request_linking_leaves_the_shared_graph_alone() {
    let Grid { mut graph, .. } = grid(4, Permission::ALL);
    graph.add_transit_stop("1", "Stop", point!(x: 30.0012, y: 60.0001), false);
    link_street_graph(&mut graph, &LinkerConfig::default()).unwrap();
    let vertices = graph.vertex_count();
    let edges = graph.edge_count();
    let indexed = graph.indexed_edge_count();

    let config = LinkerConfig::default();
    let linker = TemporaryLinker::new(&graph, &config);
    let mut ctx = RequestContext::new(RequestModes::walk());
    let origin = linker
        .link_location(&mut ctx, point!(x: 30.0005, y: 60.0011), false)
        .unwrap();
    let destination = linker
        .link_location(&mut ctx, point!(x: 30.0025, y: 60.0021), true)
        .unwrap();
    assert!(origin.linked && destination.linked);
    assert!(ctx.temporary().edge_count() > 0);
    ctx.dispose();

    assert_eq!(graph.vertex_count(), vertices);
    assert_eq!(graph.edge_count(), edges);
    assert_eq!(graph.indexed_edge_count(), indexed);
}

#[test]
fn point_on_an_intersection_links_to_it_without_splitting() {
    let grid = grid(3, Permission::ALL);
    let center = grid.vertex(1, 1);
    let at = grid.graph.vertex(center).unwrap().geometry;
    let config = LinkerConfig::default();
    let linker = TemporaryLinker::new(&grid.graph, &config);
    let mut ctx = RequestContext::new(RequestModes::walk());

    let origin = linker.link_location(&mut ctx, at, false).unwrap();

    assert!(origin.linked);
    assert!(
        ctx.temporary()
            .vertices()
            .all(|(_, v)| matches!(v.kind, TemporaryVertexKind::StreetLocation { .. }))
    );
    let view = ctx.view(&grid.graph);
    let links = view.outgoing(VertexRef::Temporary(origin.vertex));
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].to(), VertexRef::Permanent(center));
}

#[test]
fn destination_reaches_split_only_from_the_edge_start() {
    let mut graph = StreetGraph::new();
    let a = graph.add_intersection(point!(x: 30.0, y: 60.0), None);
    let b = graph.add_intersection(point!(x: 30.002, y: 60.0), None);
    graph
        .add_street(a, b, None, Permission::ALL, "one way")
        .unwrap();
    let config = LinkerConfig::default();
    let linker = TemporaryLinker::new(&graph, &config);
    let mut ctx = RequestContext::new(RequestModes::walk());

    let destination = linker
        .link_location(&mut ctx, point!(x: 30.001, y: 60.0001), true)
        .unwrap();

    let view = ctx.view(&graph);
    let into: Vec<EdgeView> = view.incoming(VertexRef::Temporary(destination.vertex));
    assert_eq!(into.len(), 1);
    let split = into[0].from();
    let partial = view.incoming(split);
    assert_eq!(partial.len(), 1);
    assert_eq!(partial[0].from(), VertexRef::Permanent(a));
    assert!(view.outgoing(split).iter().all(|e| e.to() != VertexRef::Permanent(b)));
    assert_eq!(
        view.outgoing(VertexRef::Permanent(a))
            .iter()
            .filter(|e| e.is_temporary())
            .count(),
        1
    );
    let (length, parent_length) = match partial[0] {
        EdgeView::Temporary(edge) => {
            assert!(matches!(edge.kind, TemporaryEdgeKind::PartialStreet { .. }));
            (edge.length_mm, graph.outgoing(a).next().unwrap().2.length_mm)
        }
        EdgeView::Permanent { .. } => panic!("expected a partial street edge"),
    };
    assert!(length.abs_diff(parent_length / 2) <= 1);
}

#[test]
fn origin_and_destination_splitting_one_edge_is_a_trivial_path() {
    let mut graph = StreetGraph::new();
    let a = graph.add_intersection(point!(x: 30.0, y: 60.0), None);
    let b = graph.add_intersection(point!(x: 30.002, y: 60.0), None);
    graph.add_two_way_street(a, b, None, Permission::ALL, "street").unwrap();
    let config = LinkerConfig::default();
    let linker = TemporaryLinker::new(&graph, &config);
    let mut ctx = RequestContext::new(RequestModes::walk());

    linker
        .link_location(&mut ctx, point!(x: 30.0004, y: 60.0001), false)
        .unwrap();
    let result = linker.link_location(&mut ctx, point!(x: 30.0016, y: 60.0001), true);

    assert!(matches!(result, Err(Error::TrivialPath(_))));
}

#[test]
fn driving_origin_ignores_footways() {
    let mut graph = StreetGraph::new();
    let a = graph.add_intersection(point!(x: 30.0, y: 60.0), None);
    let b = graph.add_intersection(point!(x: 30.002, y: 60.0), None);
    let c = graph.add_intersection(point!(x: 30.0, y: 60.001), None);
    let d = graph.add_intersection(point!(x: 30.002, y: 60.001), None);
    graph.add_two_way_street(a, b, None, Permission::PEDESTRIAN, "footway").unwrap();
    let (road, _) = graph.add_two_way_street(c, d, None, Permission::CAR, "road").unwrap();
    let config = LinkerConfig::default();
    let linker = TemporaryLinker::new(&graph, &config);
    let at = point!(x: 30.001, y: 60.0002);

    let mut walking = RequestContext::new(RequestModes::walk());
    linker.link_location(&mut walking, at, false).unwrap();
    let mut driving = RequestContext::new(RequestModes::car());
    linker.link_location(&mut driving, at, false).unwrap();

    let parents = |ctx: &RequestContext| -> Vec<EdgeId> {
        ctx.temporary()
            .edges()
            .filter_map(|e| match e.kind {
                TemporaryEdgeKind::PartialStreet { parent } => Some(parent),
                TemporaryEdgeKind::Link(_) => None,
            })
            .collect()
    };
    assert!(!parents(&walking).contains(&road));
    assert!(parents(&driving).contains(&road));
    assert_eq!(parents(&driving).len(), 2);
}

#[test]
fn config_from_toml_drives_linking() {
    let config = LinkerConfig::from_toml_str(
        r#"
        search_radius_m = 50.0
        add_extra_edges_to_areas = false
        "#,
    )
    .unwrap();
    let Grid { graph, .. } = grid(2, Permission::ALL);
    let linker = TemporaryLinker::new(&graph, &config);
    let mut ctx = RequestContext::new(RequestModes::walk());

    // About 100 m south of the grid
    let far = linker
        .link_location(&mut ctx, point!(x: 30.0005, y: 59.9991), false)
        .unwrap();
    assert!(!far.linked);
}
