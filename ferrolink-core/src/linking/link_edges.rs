//! Connector edges between linked entities and the street network.
//!
//! Each [`LinkKind`] maps to a [`ConnectorRule`] naming the connector edge
//! kind, its direction and who may traverse it. Adding an entity kind means
//! adding a row to [`LinkKind::connector`].

use geo::{LineString, Point};

use super::geometry::{geodesic_distance, to_millimeters};
use super::split::SplitSide;
use crate::{
    VertexId,
    model::{
        AreaId, EdgeKind, Permission, StreetEdge, StreetGraph, TemporaryEdge, TemporaryEdgeKind,
        TemporaryGraph, VertexRef,
    },
};

/// What is being linked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    TransitStop,
    BikeRental,
    BikePark,
    /// Dynamically appearing rentable vehicle
    RentVehicle,
    /// Dynamically reported bike station
    BikeStation,
    /// Ad-hoc search origin
    Origin,
    /// Ad-hoc search destination
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkEdgeKind {
    StreetTransit,
    BikeRental,
    BikePark,
    RentVehicle,
    /// Plain connector used by search endpoints
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    Both,
    FromEntity,
    ToEntity,
}

impl LinkDirection {
    fn from_entity(self) -> bool {
        matches!(self, LinkDirection::Both | LinkDirection::FromEntity)
    }

    fn to_entity(self) -> bool {
        matches!(self, LinkDirection::Both | LinkDirection::ToEntity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorRule {
    pub edge_kind: LinkEdgeKind,
    pub direction: LinkDirection,
    pub permission: Permission,
}

impl LinkKind {
    pub const fn connector(self) -> ConnectorRule {
        let (edge_kind, direction, permission) = match self {
            LinkKind::TransitStop => (
                LinkEdgeKind::StreetTransit,
                LinkDirection::Both,
                Permission::PEDESTRIAN_AND_BICYCLE,
            ),
            LinkKind::BikeRental | LinkKind::BikeStation => (
                LinkEdgeKind::BikeRental,
                LinkDirection::Both,
                Permission::PEDESTRIAN_AND_BICYCLE,
            ),
            LinkKind::BikePark => (
                LinkEdgeKind::BikePark,
                LinkDirection::Both,
                Permission::PEDESTRIAN_AND_BICYCLE,
            ),
            LinkKind::RentVehicle => (
                LinkEdgeKind::RentVehicle,
                LinkDirection::Both,
                Permission::ALL,
            ),
            LinkKind::Origin => (LinkEdgeKind::Free, LinkDirection::FromEntity, Permission::ALL),
            LinkKind::Destination => (LinkEdgeKind::Free, LinkDirection::ToEntity, Permission::ALL),
        };
        ConnectorRule {
            edge_kind,
            direction,
            permission,
        }
    }

    /// Halves kept when an edge is split temporarily for this kind
    pub const fn split_side(self) -> SplitSide {
        match self {
            LinkKind::Origin => SplitSide::Outbound,
            LinkKind::Destination => SplitSide::Inbound,
            _ => SplitSide::Both,
        }
    }

    /// Search endpoints, which may fall back to linking straight to a stop
    pub const fn is_ad_hoc(self) -> bool {
        matches!(self, LinkKind::Origin | LinkKind::Destination)
    }
}

fn connector_geometry(from: Point<f64>, to: Point<f64>) -> LineString<f64> {
    LineString::from(vec![from.0, to.0])
}

/// Adds the connectors between a permanent entity vertex and a street vertex.
///
/// Returns the number of edges added; zero if the pair is already linked.
pub fn make_permanent_links(
    graph: &mut StreetGraph,
    entity: VertexId,
    street: VertexId,
    kind: LinkKind,
) -> usize {
    let rule = kind.connector();
    let edge_kind = EdgeKind::Link(rule.edge_kind);
    let (Some(entity_vertex), Some(street_vertex)) = (graph.vertex(entity), graph.vertex(street))
    else {
        return 0;
    };
    let (entity_point, street_point) = (entity_vertex.geometry, street_vertex.geometry);
    let name = entity_vertex.label.clone();
    let length_mm = to_millimeters(geodesic_distance(entity_point, street_point));

    let mut added = 0;
    let mut connect = |graph: &mut StreetGraph, from, to, geometry, back| {
        if graph.has_edge_between(from, to, |e| e.kind == edge_kind) {
            return;
        }
        let mut edge = StreetEdge::new(edge_kind, geometry, rule.permission, name.as_str(), back);
        edge.length_mm = length_mm;
        graph.insert_edge(from, to, edge);
        added += 1;
    };
    if rule.direction.from_entity() {
        connect(
            graph,
            entity,
            street,
            connector_geometry(entity_point, street_point),
            false,
        );
    }
    if rule.direction.to_entity() {
        connect(
            graph,
            street,
            entity,
            connector_geometry(street_point, entity_point),
            rule.direction == LinkDirection::Both,
        );
    }
    added
}

/// Adds the connectors between an entity and a street vertex inside `arena`.
///
/// Either side may be permanent or temporary. Returns the number of edges
/// added; zero if the pair is already linked.
pub fn make_temporary_links(
    arena: &mut TemporaryGraph,
    (entity, entity_point): (VertexRef, Point<f64>),
    (street, street_point): (VertexRef, Point<f64>),
    kind: LinkKind,
) -> usize {
    let rule = kind.connector();
    let length_mm = to_millimeters(geodesic_distance(entity_point, street_point));
    let mut added = 0;

    let mut connect = |arena: &mut TemporaryGraph, from, to, geometry| {
        if arena.has_link(from, to, rule.edge_kind) {
            return;
        }
        arena.add_edge(TemporaryEdge {
            from,
            to,
            kind: TemporaryEdgeKind::Link(rule.edge_kind),
            permission: rule.permission,
            length_mm,
            geometry,
        });
        added += 1;
    };
    if rule.direction.from_entity() {
        connect(arena, entity, street, connector_geometry(entity_point, street_point));
    }
    if rule.direction.to_entity() {
        connect(arena, street, entity, connector_geometry(street_point, entity_point));
    }
    added
}

/// Connects `split` to every other vertex of `area` in both directions.
///
/// Pairs that already have an edge between them are skipped. The new edges
/// are not indexed. Returns the number of edges added.
pub fn link_to_area_vertices(graph: &mut StreetGraph, split: VertexId, area: AreaId) -> usize {
    let Some(area) = graph.area(area) else {
        return 0;
    };
    let name = area.name.clone();
    let others: Vec<VertexId> = area.vertices.iter().copied().filter(|&v| v != split).collect();
    let Some(split_point) = graph.vertex(split).map(|v| v.geometry) else {
        return 0;
    };

    let mut added = 0;
    for other in others {
        let Some(other_point) = graph.vertex(other).map(|v| v.geometry) else {
            continue;
        };
        for (from, to, line, back) in [
            (split, other, connector_geometry(split_point, other_point), false),
            (other, split, connector_geometry(other_point, split_point), true),
        ] {
            if graph.has_edge_between(from, to, |_| true) {
                continue;
            }
            graph.insert_edge(
                from,
                to,
                StreetEdge::new(
                    EdgeKind::Street,
                    line,
                    Permission::PEDESTRIAN_AND_BICYCLE,
                    name.as_str(),
                    back,
                ),
            );
            added += 1;
        }
    }
    added
}
