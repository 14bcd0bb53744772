pub use crate::{EdgeId, Error, Meters, Millimeters, VertexId};

// Street graph
pub use crate::model::{
    EdgeKind, GraphView, Permission, StreetGraph, TemporaryGraph, TraverseMode, VertexKind,
    VertexRef,
};

// Linking
pub use crate::linking::{
    LinkKind, LinkReport, LinkerConfig, PermanentLinker, RequestContext, RequestModes,
    TemporaryLinker, TemporaryLocation,
};
pub use crate::loading::{BuildAnnotation, link_street_graph};

// Dynamic entities
pub use crate::dynamic::{
    DynamicSnapshot, EntityDescriptor, EntityFeed, EntityKey, GraphWriter, PollingUpdater,
    ReconcileOutcome, UpdaterConfig, VehicleType,
};
