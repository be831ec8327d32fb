//! # Datastore Boundary
//!
//! The abstract entity-iteration capability the orchestrator drives, plus
//! the entity model and an in-memory implementation.
//!
//! Translating the OR/AND selector algebra into native filters is the
//! datastore's responsibility, not the orchestrator's; the in-memory
//! store does it by direct entity matching.

mod entity;
mod errors;
mod memory;

pub use entity::{Entity, EntityInfo, EntityType, Member, Node, Relation, Way};
pub use errors::{DatastoreError, DatastoreResult};
pub use memory::MemoryDatastore;

use crate::query::{BboxSelector, Selector};

/// A finite, forward-only, non-restartable sequence of entities.
///
/// Pulled lazily; once consumed it cannot be re-iterated without
/// re-invoking the datastore. `release` frees the underlying cursor and
/// is safe to call any number of times, on any exit path.
pub trait EntityStream {
    /// Pulls the next entity, or `None` once exhausted or released.
    fn next_entity(&mut self) -> DatastoreResult<Option<Entity>>;

    /// Frees held resources. Idempotent; never panics.
    fn release(&mut self);
}

/// Abstract spatial datastore, opened per request.
///
/// Each `iterate_*` call receives the descriptor's bounding regions and
/// remaining selectors to apply as filters.
pub trait Datastore: Send + Sync {
    fn iterate_nodes(
        &self,
        bboxes: &[BboxSelector],
        selectors: &[Selector],
    ) -> DatastoreResult<Box<dyn EntityStream + Send + '_>>;

    fn iterate_ways(
        &self,
        bboxes: &[BboxSelector],
        selectors: &[Selector],
    ) -> DatastoreResult<Box<dyn EntityStream + Send + '_>>;

    fn iterate_relations(
        &self,
        bboxes: &[BboxSelector],
        selectors: &[Selector],
    ) -> DatastoreResult<Box<dyn EntityStream + Send + '_>>;

    fn iterate_all_primitives(
        &self,
        bboxes: &[BboxSelector],
        selectors: &[Selector],
    ) -> DatastoreResult<Box<dyn EntityStream + Send + '_>>;

    /// Raw contents of one bounding box, not filtered by selectors.
    ///
    /// With `full_extract` set, referenced members outside the box are
    /// pulled in so the extract is self-contained.
    fn iterate_bounding_box(
        &self,
        left: f64,
        right: f64,
        top: f64,
        bottom: f64,
        full_extract: bool,
    ) -> DatastoreResult<Box<dyn EntityStream + Send + '_>>;
}
