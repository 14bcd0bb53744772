//! Small street graphs shared by unit tests

use geo::point;

use super::{Permission, StreetGraph};
use crate::{EdgeId, VertexId};

pub(crate) struct SimpleStreet {
    pub graph: StreetGraph,
    pub a: VertexId,
    pub b: VertexId,
    pub forward: EdgeId,
    pub backward: EdgeId,
}

/// One two-way street of about 111 m running east from (30.0, 60.0)
pub(crate) fn simple_street() -> SimpleStreet {
    let mut graph = StreetGraph::new();
    let a = graph.add_intersection(point!(x: 30.0, y: 60.0), Some(1));
    let b = graph.add_intersection(point!(x: 30.002, y: 60.0), Some(2));
    let (forward, backward) = graph
        .add_two_way_street(a, b, None, Permission::ALL, "Main street")
        .unwrap();
    SimpleStreet {
        graph,
        a,
        b,
        forward,
        backward,
    }
}

/// Parallel one-way streets with distinct permissions, north to south:
/// walk-only at 60.0003, car-only at 60.0, bicycle-only at 59.9995.
pub(crate) fn mixed_permissions() -> (StreetGraph, EdgeId, EdgeId, EdgeId) {
    let mut graph = StreetGraph::new();
    let mut street = |lat: f64, permission: Permission, name: &str| {
        let from = graph.add_intersection(point!(x: 30.0, y: lat), None);
        let to = graph.add_intersection(point!(x: 30.002, y: lat), None);
        graph.add_street(from, to, None, permission, name).unwrap()
    };
    let walk = street(60.0003, Permission::PEDESTRIAN, "footway");
    let car = street(60.0, Permission::CAR, "motorway");
    let bike = street(59.9995, Permission::BICYCLE, "cycleway");
    (graph, walk, car, bike)
}
