//! Generic data-access engine
//!
//! [`Crud`] binds an entity type, its creation and update input types and
//! a storage collaborator. It holds no mutable state: every call re-reads
//! from or re-writes to the store.

use crate::config::{PaginationConfig, ScaffoldConfig};
use crate::core::entity::Entity;
use crate::core::error::{EntityError, ScaffoldResult};
use crate::core::field::FieldValue;
use crate::core::input::{CreateInput, FieldMap, Input, UpdateInput};
use crate::core::prefetch::Prefetched;
use crate::core::query::{Filter, OrderBy, Page, Query};
use crate::core::store::{EntityStore, RelationResolver};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed create/read/update/delete/list over one entity type
///
/// # Example
///
/// ```rust,ignore
/// let orders: Crud<Order, NewOrder, OrderPatch, InMemoryStore> = Crud::new(store.clone());
///
/// let order = orders.create(Input::Validated(new_order)).await?;
/// let page = orders.list(1, 20, Filter::All, &[OrderBy::desc("placed_at")], &["customer"]).await?;
/// ```
pub struct Crud<E, C, U, S> {
    store: Arc<S>,
    pagination: PaginationConfig,
    _marker: PhantomData<fn() -> (E, C, U)>,
}

impl<E, C, U, S> Clone for Crud<E, C, U, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            pagination: self.pagination.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E, C, U, S> Crud<E, C, U, S>
where
    E: Entity,
    C: CreateInput,
    U: UpdateInput,
    S: EntityStore<E> + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            pagination: PaginationConfig::default(),
            _marker: PhantomData,
        }
    }

    /// Apply the paging limits of a loaded configuration
    pub fn with_config(mut self, config: &ScaffoldConfig) -> Self {
        self.pagination = config.pagination.clone();
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch by identity, failing when absent
    pub async fn get(&self, id: i64) -> ScaffoldResult<E> {
        self.query(id)
            .await?
            .ok_or_else(|| EntityError::not_found(E::meta().entity_type, id).into())
    }

    /// Fetch by identity, `None` when absent
    pub async fn query(&self, id: i64) -> ScaffoldResult<Option<E>> {
        self.store.fetch(id).await
    }

    /// Every entity matching `filter`, in storage order
    pub async fn select(&self, filter: Filter) -> ScaffoldResult<Vec<E>> {
        self.store.find(&Query::new(filter)).await
    }

    /// One page of the entities matching `search`.
    ///
    /// `page` is 1-based; `0` is treated as `1`. The total is counted over
    /// the whole search independent of paging, so an out-of-range page
    /// yields no items but the correct total. Relations named in `related`
    /// are loaded for every item on the page.
    pub async fn list(
        &self,
        page: usize,
        page_size: usize,
        search: Filter,
        order: &[OrderBy],
        related: &[&str],
    ) -> ScaffoldResult<Page<E>> {
        let page = page.max(1);
        let page_size = self.pagination.page_size(page_size);
        let window = Query::new(search)
            .order_by(order.iter().cloned())
            .offset((page - 1).saturating_mul(page_size))
            .limit(page_size);

        let (total, items) = futures::try_join!(self.store.count(&window.filter), async {
            if page_size == 0 {
                Ok(Vec::new())
            } else {
                self.store.find(&window).await
            }
        })?;

        let resolver: Arc<dyn RelationResolver> = self.store.clone();
        let related = if related.is_empty() {
            Prefetched::default().with_fallback(resolver)
        } else {
            Prefetched::load(&items, related, resolver).await?
        };

        tracing::debug!(
            entity_type = E::meta().entity_type,
            page,
            page_size,
            total,
            returned = items.len(),
            "listed entities"
        );
        Ok(Page {
            total,
            items,
            related,
            page,
            page_size,
        })
    }

    /// Persist a new entity from the full field set of `input`
    pub async fn create(&self, input: Input<C>) -> ScaffoldResult<E> {
        let fields = input.creation_fields()?;
        let entity: E = from_fields(fields)?;
        let created = self.store.insert(entity).await?;
        tracing::debug!(
            entity_type = E::meta().entity_type,
            id = created.id(),
            "created entity"
        );
        Ok(created)
    }

    /// Merge the explicitly set fields of `input` into an existing entity.
    ///
    /// Identity is never reassigned. When the entity type declares a version
    /// column, the save only succeeds if no other writer bumped it since the
    /// read, and the column is incremented.
    pub async fn update(&self, id: i64, input: Input<U>) -> ScaffoldResult<E> {
        let changes = input.update_fields()?;
        let current = self.get(id).await?;
        let meta = E::meta();

        let expected = meta
            .version_field
            .map(|field| {
                current
                    .field_value(field)
                    .as_ref()
                    .and_then(FieldValue::as_integer)
                    .unwrap_or(0)
            });

        let mut merged = to_fields(&current)?;
        for (key, value) in changes {
            if meta.version_field == Some(key.as_str()) {
                continue;
            }
            merged.insert(key, value);
        }
        merged.insert("id".to_string(), Value::from(id));
        if let (Some(field), Some(version)) = (meta.version_field, expected) {
            merged.insert(field.to_string(), Value::from(version + 1));
        }

        let updated: E = from_fields(merged)?;
        if let Err(e) = self.store.save(&updated, expected).await {
            tracing::warn!(entity_type = meta.entity_type, id, error = %e, "update rejected");
            return Err(e);
        }
        tracing::debug!(entity_type = meta.entity_type, id, "updated entity");
        Ok(updated)
    }

    /// Delete by identity, failing when absent
    pub async fn remove(&self, id: i64) -> ScaffoldResult<E> {
        let entity = self.get(id).await?;
        if !self.store.remove(id).await? {
            return Err(EntityError::not_found(E::meta().entity_type, id).into());
        }
        tracing::debug!(entity_type = E::meta().entity_type, id, "removed entity");
        Ok(entity)
    }

    /// Delete by identity, `None` when there was nothing to delete
    pub async fn delete(&self, id: i64) -> ScaffoldResult<Option<E>> {
        let Some(entity) = self.query(id).await? else {
            return Ok(None);
        };
        if self.store.remove(id).await? {
            tracing::debug!(entity_type = E::meta().entity_type, id, "deleted entity");
            Ok(Some(entity))
        } else {
            Ok(None)
        }
    }
}

fn to_fields<E: Entity>(entity: &E) -> ScaffoldResult<FieldMap> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(EntityError::serialization(
            E::meta().entity_type,
            "entity does not serialize to a key/value object",
        )
        .into()),
        Err(e) => Err(EntityError::serialization(E::meta().entity_type, e).into()),
    }
}

fn from_fields<E: Entity>(fields: FieldMap) -> ScaffoldResult<E> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| EntityError::serialization(E::meta().entity_type, e).into())
}
