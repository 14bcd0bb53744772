//! Street network linking core.
//!
//! Attaches transit stops, bike stations, shared vehicles and ad-hoc
//! search endpoints to the nearest usable edges of a street graph, either
//! permanently while the graph is built or temporarily for one request.

pub mod dynamic;
pub mod linking;
pub mod loading;
pub mod model;
pub mod prelude;

mod error;

pub use error::Error;
pub use model::{EdgeId, VertexId};

/// Edge lengths are stored as integer millimetres so that split halves
/// always sum exactly to the original edge.
pub type Millimeters = u64;

/// Distances in metres
pub type Meters = f64;
