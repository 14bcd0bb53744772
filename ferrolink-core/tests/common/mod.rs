#![allow(dead_code)]

use ferrolink_core::prelude::*;
use geo::point;

pub const ORIGIN_X: f64 = 30.0;
pub const ORIGIN_Y: f64 = 60.0;
pub const SPACING: f64 = 0.001;

/// Square grid of two-way streets, `size` intersections per side,
/// `SPACING` degrees apart, south-west corner at (`ORIGIN_X`, `ORIGIN_Y`).
pub struct Grid {
    pub graph: StreetGraph,
    pub vertices: Vec<Vec<VertexId>>,
}

impl Grid {
    pub fn vertex(&self, column: usize, row: usize) -> VertexId {
        self.vertices[row][column]
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn grid(size: usize, permission: Permission) -> Grid {
    let mut graph = StreetGraph::new();
    let vertices: Vec<Vec<VertexId>> = (0..size)
        .map(|row| {
            (0..size)
                .map(|column| {
                    graph.add_intersection(
                        point!(
                            x: ORIGIN_X + column as f64 * SPACING,
                            y: ORIGIN_Y + row as f64 * SPACING
                        ),
                        None,
                    )
                })
                .collect()
        })
        .collect();

    for row in 0..size {
        for column in 0..size {
            if column + 1 < size {
                graph
                    .add_two_way_street(
                        vertices[row][column],
                        vertices[row][column + 1],
                        None,
                        permission,
                        &format!("row {row}"),
                    )
                    .unwrap();
            }
            if row + 1 < size {
                graph
                    .add_two_way_street(
                        vertices[row][column],
                        vertices[row + 1][column],
                        None,
                        permission,
                        &format!("column {column}"),
                    )
                    .unwrap();
            }
        }
    }
    Grid { graph, vertices }
}
