use std::fmt;

use crate::{Meters, VertexId};

/// Non-fatal problem found while linking the street graph
#[derive(Debug, Clone, PartialEq)]
pub enum BuildAnnotation {
    StopUnlinked {
        stop: VertexId,
        stop_id: String,
        label: String,
    },
    BikeRentalStationUnlinked {
        station: VertexId,
        station_id: String,
        label: String,
    },
    BikeParkUnlinked {
        park: VertexId,
        park_id: String,
        label: String,
    },
    /// The nearest street edge is farther than the warning distance
    StopLinkedTooFar {
        stop: VertexId,
        label: String,
        distance_m: Meters,
    },
    StopsOutsideStreetCoverage { count: usize, total: usize },
}

impl fmt::Display for BuildAnnotation {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildAnnotation::StopUnlinked { stop_id, label, .. } => {
                write!(f, "Stop {stop_id} ({label}) not near any streets; it will not be usable")
            }
            BuildAnnotation::BikeRentalStationUnlinked {
                station_id, label, ..
            } => write!(
                f,
                "Bike rental station {station_id} ({label}) not near any streets; \
                 it will not be usable"
            ),
            BuildAnnotation::BikeParkUnlinked { park_id, label, .. } => write!(
                f,
                "Bike park {park_id} ({label}) not near any streets; it will not be usable"
            ),
            BuildAnnotation::StopLinkedTooFar {
                label, distance_m, ..
            } => write!(
                f,
                "Stop {label} is {distance_m:.1} m from the nearest street it was linked to"
            ),
            BuildAnnotation::StopsOutsideStreetCoverage { count, total } => {
                let percentage = if *total == 0 {
                    0.0
                } else {
                    *count as f64 / *total as f64 * 100.0
                };
                write!(
                    f,
                    "{count} of {total} transit stops ({percentage:.1}%) are outside the street \
                     network coverage area and may be unreachable"
                )
            }
        }
    }
}
