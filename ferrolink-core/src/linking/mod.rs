//! Attaching entities and search endpoints to the street network

pub mod candidates;
pub mod config;
pub mod geometry;
pub mod link_edges;
pub mod linker;
pub mod request;
pub mod selection;
pub mod split;

pub use candidates::{
    CandidateSearch, EdgeCandidate, find_candidate_edges, find_closest_edges, find_closest_stops,
};
pub use config::{
    DUPLICATE_WAY_EPSILON_METERS, ENDPOINT_SNAP_EPSILON, LinkerConfig, MAX_SEARCH_RADIUS_METERS,
    WARNING_DISTANCE_METERS,
};
pub use geometry::{LinearLocation, LocalProjection};
pub use link_edges::{ConnectorRule, LinkDirection, LinkEdgeKind, LinkKind};
pub use linker::{LinkReport, PermanentLinker, TemporaryLinker};
pub use request::{RequestContext, RequestModes, SplitGate, TemporaryLocation};
pub use selection::{Ranked, select_closest};
pub use split::{Attachment, SplitSide};
