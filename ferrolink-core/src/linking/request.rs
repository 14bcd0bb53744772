//! Per-request state for temporary linking

use hashbrown::HashSet;

use crate::{
    EdgeId, Error,
    model::{GraphView, StreetGraph, TempVertexId, TemporaryGraph, TraverseMode},
};

/// Street modes enabled for a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestModes {
    pub walk: bool,
    pub bicycle: bool,
    pub car: bool,
    pub park_and_ride: bool,
    pub kiss_and_ride: bool,
}

impl RequestModes {
    pub fn walk() -> Self {
        Self {
            walk: true,
            ..Self::default()
        }
    }

    pub fn bicycle() -> Self {
        Self {
            bicycle: true,
            ..Self::default()
        }
    }

    pub fn car() -> Self {
        Self {
            car: true,
            ..Self::default()
        }
    }

    /// Mode used to pick link candidates for the origin or the destination.
    ///
    /// With park-and-ride or kiss-and-ride the trip ends on foot, so the
    /// destination links for walking even when driving is enabled.
    pub fn linking_mode(&self, end_vertex: bool) -> TraverseMode {
        if self.car {
            if end_vertex && (self.park_and_ride || self.kiss_and_ride) {
                TraverseMode::Walk
            } else {
                TraverseMode::Car
            }
        } else if self.walk {
            TraverseMode::Walk
        } else if self.bicycle {
            TraverseMode::Bicycle
        } else {
            TraverseMode::Walk
        }
    }
}

/// Edges already split in the current request
#[derive(Debug, Default)]
pub struct SplitGate {
    split: HashSet<EdgeId>,
}

impl SplitGate {
    /// Records a split of `edge`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrivialPath`] if the edge was already split in this request
    pub fn record(&mut self, edge: EdgeId) -> Result<(), Error> {
        if self.split.insert(edge) {
            Ok(())
        } else {
            Err(Error::TrivialPath(edge))
        }
    }

    pub fn is_split(&self, edge: EdgeId) -> bool {
        self.split.contains(&edge)
    }
}

/// Everything one search request creates while linking its endpoints.
///
/// Dropping the context (or calling [`RequestContext::dispose`]) releases
/// all temporary vertices and edges.
#[derive(Debug, Default)]
pub struct RequestContext {
    modes: RequestModes,
    graph: TemporaryGraph,
    gate: SplitGate,
}

impl RequestContext {
    pub fn new(modes: RequestModes) -> Self {
        Self {
            modes,
            graph: TemporaryGraph::new(),
            gate: SplitGate::default(),
        }
    }

    pub fn modes(&self) -> RequestModes {
        self.modes
    }

    pub fn temporary(&self) -> &TemporaryGraph {
        &self.graph
    }

    pub fn gate(&self) -> &SplitGate {
        &self.gate
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut TemporaryGraph, &mut SplitGate) {
        (&mut self.graph, &mut self.gate)
    }

    /// The street graph with this request's temporary subgraph on top
    pub fn view<'a>(&'a self, streets: &'a StreetGraph) -> GraphView<'a> {
        GraphView::new(streets).with_overlay(&self.graph)
    }

    pub fn dispose(self) {
        self.graph.dispose();
    }
}

/// Result of linking an ad-hoc search endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporaryLocation {
    pub vertex: TempVertexId,
    /// `false` if nothing was found within the search radius; the vertex
    /// then has no edges
    pub linked: bool,
}
