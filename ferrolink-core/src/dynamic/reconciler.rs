//! Diff-based lifecycle of dynamically reported entities.
//!
//! Every entity that appears in a feed is linked once into its own
//! temporary arena and stays in the table, linked or not, for as long as it
//! keeps being reported. An entity whose link failed is only tried again
//! after it has disappeared from the feed and come back.

use std::sync::Arc;

use hashbrown::HashMap;

use super::entity::{EntityDescriptor, EntityKey};
use crate::{
    VertexId,
    linking::TemporaryLinker,
    model::{GraphView, StreetGraph, TempVertexId, TemporaryGraph, TemporaryVertexKind},
};

/// Temporary subgraph attaching one entity to the street network
#[derive(Debug)]
pub struct EntityLink {
    pub vertex: TempVertexId,
    pub arena: TemporaryGraph,
    /// Permanent vertices the arena's edges attach to
    pub street_vertices: Vec<VertexId>,
}

#[derive(Debug)]
pub struct TrackedEntity {
    pub descriptor: EntityDescriptor,
    /// `None` if linking failed
    pub link: Option<EntityLink>,
}

impl TrackedEntity {
    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }
}

/// Changes applied by one reconciliation, keys sorted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub added: Vec<EntityKey>,
    pub removed: Vec<EntityKey>,
    /// How many of `added` were linked
    pub linked: usize,
    pub unlinked: usize,
}

type EntityTable = HashMap<EntityKey, Arc<TrackedEntity>>;

/// Owner of the tracked-entity table
#[derive(Debug, Default)]
pub struct EntityReconciler {
    tracked: EntityTable,
    link_attempts: u64,
    version: u64,
}

impl EntityReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the table in line with the `current` feed contents.
    ///
    /// Entities reported in both the table and the feed are left untouched,
    /// including their position. The table is replaced only once the whole
    /// batch has been processed.
    pub fn reconcile(
        &mut self,
        linker: &TemporaryLinker<'_>,
        current: Vec<EntityDescriptor>,
    ) -> ReconcileOutcome {
        let mut reported: HashMap<EntityKey, EntityDescriptor> =
            HashMap::with_capacity(current.len());
        for descriptor in current {
            reported.entry(descriptor.key.clone()).or_insert(descriptor);
        }

        let mut next = self.tracked.clone();
        let mut removed: Vec<EntityKey> = next
            .keys()
            .filter(|key| !reported.contains_key(*key))
            .cloned()
            .collect();
        removed.sort_unstable();
        for key in &removed {
            next.remove(key);
        }

        let mut added: Vec<EntityDescriptor> = reported
            .into_values()
            .filter(|descriptor| !next.contains_key(&descriptor.key))
            .collect();
        added.sort_unstable_by(|a, b| a.key.cmp(&b.key));

        let mut outcome = ReconcileOutcome {
            removed,
            ..ReconcileOutcome::default()
        };
        for descriptor in added {
            self.link_attempts += 1;
            let link = link_entity(linker, &descriptor);
            if link.is_some() {
                outcome.linked += 1;
            } else {
                outcome.unlinked += 1;
            }
            outcome.added.push(descriptor.key.clone());
            next.insert(
                descriptor.key.clone(),
                Arc::new(TrackedEntity { descriptor, link }),
            );
        }

        self.tracked = next;
        self.version += 1;
        log::debug!(
            "Reconciled entities: {} added ({} unlinked), {} removed, {} tracked",
            outcome.added.len(),
            outcome.unlinked,
            outcome.removed.len(),
            self.tracked.len()
        );
        outcome
    }

    pub fn tracked(&self, key: &EntityKey) -> Option<&TrackedEntity> {
        self.tracked.get(key).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Number of link attempts made since creation
    pub fn link_attempts(&self) -> u64 {
        self.link_attempts
    }

    /// Immutable copy of the current table for readers
    pub fn snapshot(&self) -> DynamicSnapshot {
        let mut at_vertex: HashMap<VertexId, Vec<EntityKey>> = HashMap::new();
        let mut linked = Vec::new();
        for (key, entity) in &self.tracked {
            if let Some(link) = &entity.link {
                linked.push(key.clone());
                for &vertex in &link.street_vertices {
                    at_vertex.entry(vertex).or_default().push(key.clone());
                }
            }
        }
        for keys in at_vertex.values_mut() {
            keys.sort_unstable();
        }
        linked.sort_unstable();
        DynamicSnapshot {
            version: self.version,
            entities: self.tracked.clone(),
            linked,
            at_vertex,
        }
    }
}

fn link_entity(
    linker: &TemporaryLinker<'_>,
    descriptor: &EntityDescriptor,
) -> Option<EntityLink> {
    let kind = descriptor.kind.link_kind();
    let mut arena = TemporaryGraph::new();
    let vertex = arena.add_vertex(
        TemporaryVertexKind::Entity {
            key: descriptor.key.clone(),
            kind,
        },
        descriptor.name.clone(),
        descriptor.position,
    );
    match linker.link_vertex(&mut arena, vertex, kind, descriptor.kind.linking_mode(), None) {
        Ok(true) => Some(EntityLink {
            vertex,
            street_vertices: arena.permanent_vertices(),
            arena,
        }),
        Ok(false) => {
            log::debug!("Entity {} is not near any usable street", descriptor.key);
            None
        }
        Err(e) => {
            log::warn!("Failed to link entity {}: {e}", descriptor.key);
            None
        }
    }
}

/// State of the dynamic entities as published by one reconciliation
#[derive(Debug, Default)]
pub struct DynamicSnapshot {
    version: u64,
    entities: EntityTable,
    /// Keys of linked entities, sorted
    linked: Vec<EntityKey>,
    at_vertex: HashMap<VertexId, Vec<EntityKey>>,
}

impl DynamicSnapshot {
    /// Number of reconciliations applied before this snapshot was taken
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, key: &EntityKey) -> Option<&TrackedEntity> {
        self.entities.get(key).map(Arc::as_ref)
    }

    /// Linked entities reachable from the street vertex `vertex`
    pub fn entities_at(&self, vertex: VertexId) -> &[EntityKey] {
        self.at_vertex.get(&vertex).map(Vec::as_slice).unwrap_or_default()
    }

    /// Temporary subgraphs of all linked entities, ordered by key
    pub fn overlays(&self) -> impl Iterator<Item = &TemporaryGraph> + '_ {
        self.linked.iter().filter_map(|key| {
            self.entities
                .get(key)
                .and_then(|entity| entity.link.as_ref().map(|link| &link.arena))
        })
    }

    /// The street graph with every linked entity on top
    pub fn view<'a>(&'a self, streets: &'a StreetGraph) -> GraphView<'a> {
        GraphView::new(streets).with_overlays(self.overlays())
    }
}
