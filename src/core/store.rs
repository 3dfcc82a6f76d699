//! Storage collaborator traits
//!
//! The scaffold layer never talks to a database directly. It is built
//! against these traits, and a backend implements them once for every
//! entity type it can hold.

use crate::core::entity::{Entity, ForeignKey, ManyToMany, Model};
use crate::core::error::ScaffoldResult;
use crate::core::query::{Filter, Query};
use async_trait::async_trait;
use std::sync::Arc;

/// Type-erased relation traversal.
///
/// Resolves related entities without the caller knowing their concrete
/// types, which is what lets the serializer expand relations of any shape.
#[async_trait]
pub trait RelationResolver: Send + Sync {
    /// Fetch the entity referenced by a foreign key
    async fn resolve_one(
        &self,
        relation: &ForeignKey,
        id: i64,
    ) -> ScaffoldResult<Option<Arc<dyn Model>>>;

    /// Fetch the full related collection of a many-valued relation
    async fn resolve_many(
        &self,
        relation: &ManyToMany,
        owner_id: i64,
    ) -> ScaffoldResult<Vec<Arc<dyn Model>>>;
}

/// Persisted-entity store for one entity type
///
/// Every call is a suspension point; implementations own their locking.
#[async_trait]
pub trait EntityStore<E: Entity>: RelationResolver {
    /// Point lookup by identity
    async fn fetch(&self, id: i64) -> ScaffoldResult<Option<E>>;

    /// Filtered, ordered, sliced scan
    async fn find(&self, query: &Query) -> ScaffoldResult<Vec<E>>;

    /// Number of entities matching a filter
    async fn count(&self, filter: &Filter) -> ScaffoldResult<usize>;

    /// Persist a new entity, assigning an identity when `id()` is `0`
    async fn insert(&self, entity: E) -> ScaffoldResult<E>;

    /// Insert-or-update.
    ///
    /// With `expected_version` set, the stored row's version column must
    /// still hold that value or the save fails with a version conflict.
    async fn save(&self, entity: &E, expected_version: Option<i64>) -> ScaffoldResult<()>;

    /// Delete by identity, returning whether a row was removed
    async fn remove(&self, id: i64) -> ScaffoldResult<bool>;
}
