//! Eager loading of relations for a batch of entities

use crate::core::entity::{Entity, ForeignKey, ManyToMany, Model};
use crate::core::error::{EntityError, ScaffoldResult};
use crate::core::field::FieldValue;
use crate::core::store::RelationResolver;
use async_trait::async_trait;
use futures::future::join_all;
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Relations loaded ahead of serialization.
///
/// Acts as a [`RelationResolver`] itself: lookups for prefetched relations
/// are answered from memory, anything else goes to the fallback resolver.
#[derive(Clone, Default)]
pub struct Prefetched {
    one: IndexMap<&'static str, HashMap<i64, Arc<dyn Model>>>,
    many: IndexMap<&'static str, HashMap<i64, Vec<Arc<dyn Model>>>>,
    fallback: Option<Arc<dyn RelationResolver>>,
}

impl Prefetched {
    /// Load the named relations for every entity in `entities`.
    ///
    /// Each relation name must be a foreign key or many-valued relation of
    /// `E`; fetches for all relations run concurrently.
    pub async fn load<E: Entity>(
        entities: &[E],
        related: &[&str],
        resolver: Arc<dyn RelationResolver>,
    ) -> ScaffoldResult<Self> {
        let meta = E::meta();
        let mut fks = Vec::new();
        let mut m2ms = Vec::new();
        for name in related {
            if let Some(fk) = meta.foreign_key(name) {
                fks.push(fk);
            } else if let Some(m2m) = meta.many_to_many(name) {
                m2ms.push(m2m);
            } else {
                return Err(EntityError::unknown_field(meta.entity_type, name).into());
            }
        }

        let fk_loads = fks
            .into_iter()
            .map(|fk| load_foreign_key(entities, fk, resolver.as_ref()));
        let m2m_loads = m2ms.into_iter().map(|m2m| {
            let owners: Vec<i64> = entities.iter().map(Entity::id).collect();
            load_many(owners, m2m, resolver.as_ref())
        });
        let (fk_results, m2m_results) = futures::join!(join_all(fk_loads), join_all(m2m_loads));

        let mut prefetched = Prefetched::default();
        for result in fk_results {
            let (name, loaded) = result?;
            prefetched.one.insert(name, loaded);
        }
        for result in m2m_results {
            let (name, loaded) = result?;
            prefetched.many.insert(name, loaded);
        }
        tracing::debug!(
            entity_type = meta.entity_type,
            relations = ?related,
            "prefetched relations"
        );
        Ok(prefetched.with_fallback(resolver))
    }

    /// Route lookups for relations that were not prefetched to `resolver`
    pub fn with_fallback(mut self, resolver: Arc<dyn RelationResolver>) -> Self {
        self.fallback = Some(resolver);
        self
    }

    /// Whether a relation was eagerly loaded
    pub fn contains(&self, relation: &str) -> bool {
        self.one.contains_key(relation) || self.many.contains_key(relation)
    }

    /// Names of the prefetched relations, in request order
    pub fn relations(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.one.keys().chain(self.many.keys()).copied()
    }

    fn fallback(&self) -> ScaffoldResult<&dyn RelationResolver> {
        self.fallback.as_deref().ok_or_else(|| {
            crate::core::error::StorageError::Backend {
                message: "relation was not prefetched and no fallback resolver is set".to_string(),
            }
            .into()
        })
    }
}

async fn load_foreign_key<E: Entity>(
    entities: &[E],
    fk: &'static ForeignKey,
    resolver: &dyn RelationResolver,
) -> ScaffoldResult<(&'static str, HashMap<i64, Arc<dyn Model>>)> {
    let ids: BTreeSet<i64> = entities
        .iter()
        .filter_map(|e| match e.field_value(fk.column) {
            Some(FieldValue::Integer(id)) => Some(id),
            _ => None,
        })
        .collect();

    let fetched = join_all(ids.into_iter().map(|id| async move {
        resolver
            .resolve_one(fk, id)
            .await
            .map(|found| found.map(|model| (id, model)))
    }))
    .await;

    let mut loaded = HashMap::new();
    for result in fetched {
        if let Some((id, model)) = result? {
            loaded.insert(id, model);
        }
    }
    Ok((fk.name, loaded))
}

async fn load_many(
    owners: Vec<i64>,
    m2m: &'static ManyToMany,
    resolver: &dyn RelationResolver,
) -> ScaffoldResult<(&'static str, HashMap<i64, Vec<Arc<dyn Model>>>)> {
    let fetched = join_all(owners.into_iter().map(|owner| async move {
        resolver
            .resolve_many(m2m, owner)
            .await
            .map(|members| (owner, members))
    }))
    .await;

    let mut loaded = HashMap::new();
    for result in fetched {
        let (owner, members) = result?;
        loaded.insert(owner, members);
    }
    Ok((m2m.name, loaded))
}

#[async_trait]
impl RelationResolver for Prefetched {
    async fn resolve_one(
        &self,
        relation: &ForeignKey,
        id: i64,
    ) -> ScaffoldResult<Option<Arc<dyn Model>>> {
        match self.one.get(relation.name).and_then(|loaded| loaded.get(&id)) {
            Some(model) => Ok(Some(model.clone())),
            None => self.fallback()?.resolve_one(relation, id).await,
        }
    }

    async fn resolve_many(
        &self,
        relation: &ManyToMany,
        owner_id: i64,
    ) -> ScaffoldResult<Vec<Arc<dyn Model>>> {
        match self.many.get(relation.name).and_then(|m| m.get(&owner_id)) {
            Some(members) => Ok(members.clone()),
            None => self.fallback()?.resolve_many(relation, owner_id).await,
        }
    }
}

impl std::fmt::Debug for Prefetched {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prefetched")
            .field("relations", &self.relations().collect::<Vec<_>>())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}
