//! Shared vehicles and bike stations reported by external feeds.
//!
//! Entities are linked into per-entity temporary arenas by a
//! [`EntityReconciler`] that lives on the [`GraphWriter`] thread. Searches
//! read the latest [`DynamicSnapshot`] without waiting for updates.

mod entity;
mod reconciler;
mod updater;
mod writer;

pub use entity::{EntityDescriptor, EntityKey, EntityKind, VehicleType};
pub use reconciler::{
    DynamicSnapshot, EntityLink, EntityReconciler, ReconcileOutcome, TrackedEntity,
};
pub use updater::{EntityFeed, PollingUpdater, UpdaterConfig, UpdaterHandle};
pub use writer::{GraphWriter, SnapshotReader, WriteQueue, WriterState};
