//! Splitting a street edge at the projection of a point.
//!
//! Both variants cut the geometry the same way. A permanent split replaces
//! the edge in the street graph and its index. A temporary split leaves the
//! street graph untouched and builds partial edges in an arena.

use geo::{LineString, Point};

use super::geometry::{LinearLocation, LocalProjection, line_length, split_line};
use crate::{
    EdgeId, Error, Millimeters, VertexId,
    model::{
        StreetEdge, StreetGraph, StreetVertex, TempVertexId, TemporaryEdge, TemporaryEdgeKind,
        TemporaryGraph, TemporaryVertexKind, VertexKind, VertexRef,
    },
};

/// Which halves of a temporarily split edge are usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitSide {
    /// Leaving the split point towards the edge's end, used by origins
    Outbound,
    /// Arriving at the split point from the edge's start, used by destinations
    Inbound,
    Both,
}

impl SplitSide {
    pub fn has_inbound(self) -> bool {
        matches!(self, SplitSide::Inbound | SplitSide::Both)
    }

    pub fn has_outbound(self) -> bool {
        matches!(self, SplitSide::Outbound | SplitSide::Both)
    }
}

/// Where a point attaches to a candidate edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attachment {
    /// The projection snaps to an existing endpoint, no split is needed
    Endpoint(VertexId),
    Split(LinearLocation),
}

/// Decides whether `point` snaps to an endpoint of `edge` or splits it
///
/// # Errors
///
/// Returns an error if the edge is not in the graph
pub fn plan_attachment(
    graph: &StreetGraph,
    edge: EdgeId,
    point: Point<f64>,
    projection: &LocalProjection,
    epsilon: f64,
) -> Result<Attachment, Error> {
    let (from, to) = graph.edge_endpoints(edge).ok_or(Error::InvalidEdgeIndex)?;
    let geometry = &graph.edge(edge).ok_or(Error::InvalidEdgeIndex)?.geometry;
    let location = projection.locate(point, geometry);

    if location.is_at_start(epsilon) {
        Ok(Attachment::Endpoint(from))
    } else if location.is_at_end(geometry.0.len(), epsilon) {
        Ok(Attachment::Endpoint(to))
    } else {
        Ok(Attachment::Split(location))
    }
}

/// Apportions `total` between two halves by their geometric lengths.
///
/// The halves always sum to `total`. A back edge rounds its second half,
/// which is the forward twin's first half, so both twins split identically.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn split_lengths(
    total: Millimeters,
    first_meters: f64,
    second_meters: f64,
    back: bool,
) -> (Millimeters, Millimeters) {
    let sum = first_meters + second_meters;
    if sum.is_nan() || sum <= 0.0 {
        return (0, total);
    }
    let portion = |meters: f64| ((total as f64 * meters / sum).floor() as Millimeters).min(total);
    if back {
        let second = portion(second_meters);
        (total - second, second)
    } else {
        let first = portion(first_meters);
        (first, total - first)
    }
}

struct Halves {
    parent: StreetEdge,
    from: VertexId,
    to: VertexId,
    point: Point<f64>,
    first: (LineString<f64>, Millimeters),
    second: (LineString<f64>, Millimeters),
}

fn cut(graph: &StreetGraph, edge: EdgeId, location: LinearLocation) -> Result<Halves, Error> {
    let (from, to) = graph.edge_endpoints(edge).ok_or(Error::InvalidEdgeIndex)?;
    let parent = graph.edge(edge).ok_or(Error::InvalidEdgeIndex)?.clone();
    let (first, second) = split_line(&parent.geometry, location).ok_or_else(|| {
        Error::InvalidGeometry(format!("edge {edge:?} has fewer than two points"))
    })?;
    let point = location
        .coordinate(&parent.geometry)
        .map(Point::from)
        .ok_or_else(|| Error::InvalidGeometry(format!("edge {edge:?} has no coordinates")))?;
    let (first_mm, second_mm) = split_lengths(
        parent.length_mm,
        line_length(&first),
        line_length(&second),
        parent.back,
    );
    Ok(Halves {
        parent,
        from,
        to,
        point,
        first: (first, first_mm),
        second: (second, second_mm),
    })
}

fn half_edge(
    parent: &StreetEdge,
    (geometry, length_mm): (LineString<f64>, Millimeters),
) -> StreetEdge {
    StreetEdge {
        serial: 0,
        kind: parent.kind,
        name: parent.name.clone(),
        permission: parent.permission,
        length_mm,
        back: parent.back,
        geometry,
    }
}

/// Replaces `edge` by a new split vertex and two edges through it.
///
/// The halves are indexed; the original is detached from both endpoints and
/// its index entry goes stale. Area edges register the new vertex and edges
/// with their area.
///
/// # Errors
///
/// Returns an error if the edge is not in the graph or its geometry is degenerate
pub fn split_permanent(
    graph: &mut StreetGraph,
    edge: EdgeId,
    location: LinearLocation,
) -> Result<VertexId, Error> {
    let Halves {
        parent,
        from,
        to,
        point,
        first,
        second,
    } = cut(graph, edge, location)?;

    let vertex = graph.add_vertex(StreetVertex::new(
        VertexKind::Split {
            parent: parent.serial,
        },
        format!("split of {}", parent.name),
        point,
    ));
    let first = graph.insert_edge(from, vertex, half_edge(&parent, first));
    let second = graph.insert_edge(vertex, to, half_edge(&parent, second));
    graph.index_edge(first);
    graph.index_edge(second);
    graph.detach_edge(edge);

    if let Some(area) = parent.area().and_then(|area| graph.area_mut(area)) {
        area.vertices.push(vertex);
        area.edges.retain(|&e| e != edge);
        area.edges.extend([first, second]);
    }
    log::trace!("Split edge {edge:?} (serial {}) at {vertex:?}", parent.serial);
    Ok(vertex)
}

/// Splits `edge` inside `arena`, leaving the street graph untouched
///
/// # Errors
///
/// Returns an error if the edge is not in the graph or its geometry is degenerate
pub fn split_temporary(
    graph: &StreetGraph,
    arena: &mut TemporaryGraph,
    edge: EdgeId,
    location: LinearLocation,
    side: SplitSide,
) -> Result<TempVertexId, Error> {
    let Halves {
        parent,
        from,
        to,
        point,
        first,
        second,
    } = cut(graph, edge, location)?;

    let vertex = arena.add_vertex(
        TemporaryVertexKind::Split {
            parent: parent.serial,
            side,
        },
        format!("split of {}", parent.name),
        point,
    );
    let partial = |from, to, (geometry, length_mm): (LineString<f64>, Millimeters)| TemporaryEdge {
        from,
        to,
        kind: TemporaryEdgeKind::PartialStreet { parent: edge },
        permission: parent.permission,
        length_mm,
        geometry,
    };
    if side.has_inbound() {
        arena.add_edge(partial(
            VertexRef::Permanent(from),
            VertexRef::Temporary(vertex),
            first,
        ));
    }
    if side.has_outbound() {
        arena.add_edge(partial(
            VertexRef::Temporary(vertex),
            VertexRef::Permanent(to),
            second,
        ));
    }
    Ok(vertex)
}
