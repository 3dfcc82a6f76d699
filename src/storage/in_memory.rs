//! In-memory implementation of the storage traits for testing and development

use crate::core::entity::{Entity, ForeignKey, ManyToMany, Model};
use crate::core::error::{EntityError, ScaffoldResult, StorageError};
use crate::core::query::{Filter, Query};
use crate::core::store::{EntityStore, RelationResolver};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Decoder = fn(&Value) -> ScaffoldResult<Arc<dyn Model>>;

#[derive(Default)]
struct Tables {
    /// Rows per entity type, keyed (and therefore ordered) by identity
    rows: HashMap<&'static str, BTreeMap<i64, Value>>,
    /// Last identity handed out per entity type
    sequences: HashMap<&'static str, i64>,
    /// Join tables per through-name: (owner, related) pairs in link order
    joins: HashMap<&'static str, Vec<(i64, i64)>>,
    /// Type-erased row decoders per entity type, used for relation traversal
    decoders: HashMap<&'static str, Decoder>,
}

impl Tables {
    fn register<E: Entity>(&mut self) {
        self.decoders
            .entry(E::meta().entity_type)
            .or_insert(decode_model::<E>);
    }

    fn decode(&self, entity_type: &str, row: &Value) -> ScaffoldResult<Arc<dyn Model>> {
        let decoder = self
            .decoders
            .get(entity_type)
            .ok_or_else(|| StorageError::UnknownEntityType {
                entity_type: entity_type.to_string(),
            })?;
        decoder(row)
    }
}

fn decode<E: Entity>(row: &Value) -> ScaffoldResult<E> {
    E::deserialize(row).map_err(|e| EntityError::serialization(E::meta().entity_type, e).into())
}

fn decode_model<E: Entity>(row: &Value) -> ScaffoldResult<Arc<dyn Model>> {
    Ok(Arc::new(decode::<E>(row)?))
}

fn encode<E: Entity>(entity: &E) -> ScaffoldResult<Value> {
    serde_json::to_value(entity)
        .map_err(|e| EntityError::serialization(E::meta().entity_type, e).into())
}

/// In-memory entity store
///
/// Holds every entity type in one place so relations can be traversed
/// across types. Uses RwLock for thread-safe access; clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `E` resolvable as a relation target before any row is inserted
    pub fn register<E: Entity>(&self) -> ScaffoldResult<()> {
        self.write()?.register::<E>();
        Ok(())
    }

    /// Add `related_id` to the many-valued relation `relation` of `owner_id`.
    ///
    /// Linking an already linked pair is a no-op.
    pub fn link<E: Entity>(&self, relation: &str, owner_id: i64, related_id: i64) -> ScaffoldResult<()> {
        let m2m = many_to_many::<E>(relation)?;
        let mut tables = self.write()?;
        let pairs = tables.joins.entry(m2m.through).or_default();
        if !pairs.contains(&(owner_id, related_id)) {
            pairs.push((owner_id, related_id));
        }
        Ok(())
    }

    /// Remove one pair from a many-valued relation, returning whether it existed
    pub fn unlink<E: Entity>(&self, relation: &str, owner_id: i64, related_id: i64) -> ScaffoldResult<bool> {
        let m2m = many_to_many::<E>(relation)?;
        let mut tables = self.write()?;
        let Some(pairs) = tables.joins.get_mut(m2m.through) else {
            return Ok(false);
        };
        let before = pairs.len();
        pairs.retain(|pair| *pair != (owner_id, related_id));
        Ok(pairs.len() != before)
    }

    /// Empty a many-valued relation of one owner, returning how many pairs were dropped
    pub fn clear<E: Entity>(&self, relation: &str, owner_id: i64) -> ScaffoldResult<usize> {
        let m2m = many_to_many::<E>(relation)?;
        let mut tables = self.write()?;
        let Some(pairs) = tables.joins.get_mut(m2m.through) else {
            return Ok(0);
        };
        let before = pairs.len();
        pairs.retain(|(owner, _)| *owner != owner_id);
        Ok(before - pairs.len())
    }

    fn read(&self) -> ScaffoldResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|e| {
            StorageError::Backend {
                message: format!("Failed to acquire read lock: {}", e),
            }
            .into()
        })
    }

    fn write(&self) -> ScaffoldResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|e| {
            StorageError::Backend {
                message: format!("Failed to acquire write lock: {}", e),
            }
            .into()
        })
    }

    /// Decode every row of `E` matching `filter`, in identity order
    fn scan<E: Entity>(&self, filter: &Filter) -> ScaffoldResult<Vec<E>> {
        let tables = self.read()?;
        let Some(rows) = tables.rows.get(E::meta().entity_type) else {
            return Ok(Vec::new());
        };
        let mut matching = Vec::new();
        for row in rows.values() {
            let entity = decode::<E>(row)?;
            if filter.matches(&entity) {
                matching.push(entity);
            }
        }
        Ok(matching)
    }
}

fn many_to_many<E: Entity>(relation: &str) -> ScaffoldResult<&'static ManyToMany> {
    let meta = E::meta();
    meta.many_to_many(relation)
        .ok_or_else(|| EntityError::unknown_field(meta.entity_type, relation).into())
}

#[async_trait]
impl RelationResolver for InMemoryStore {
    async fn resolve_one(
        &self,
        relation: &ForeignKey,
        id: i64,
    ) -> ScaffoldResult<Option<Arc<dyn Model>>> {
        let tables = self.read()?;
        match tables.rows.get(relation.target).and_then(|rows| rows.get(&id)) {
            Some(row) => tables.decode(relation.target, row).map(Some),
            None => Ok(None),
        }
    }

    async fn resolve_many(
        &self,
        relation: &ManyToMany,
        owner_id: i64,
    ) -> ScaffoldResult<Vec<Arc<dyn Model>>> {
        let tables = self.read()?;
        let (Some(pairs), Some(rows)) = (
            tables.joins.get(relation.through),
            tables.rows.get(relation.target),
        ) else {
            return Ok(Vec::new());
        };

        // Pairs whose related row has been removed are skipped.
        pairs
            .iter()
            .filter(|(owner, _)| *owner == owner_id)
            .filter_map(|(_, related)| rows.get(related))
            .map(|row| tables.decode(relation.target, row))
            .collect()
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for InMemoryStore {
    async fn fetch(&self, id: i64) -> ScaffoldResult<Option<E>> {
        let tables = self.read()?;
        tables
            .rows
            .get(E::meta().entity_type)
            .and_then(|rows| rows.get(&id))
            .map(decode::<E>)
            .transpose()
    }

    async fn find(&self, query: &Query) -> ScaffoldResult<Vec<E>> {
        let matching = self.scan::<E>(&query.filter)?;
        Ok(query.window(matching))
    }

    async fn count(&self, filter: &Filter) -> ScaffoldResult<usize> {
        Ok(self.scan::<E>(filter)?.len())
    }

    async fn insert(&self, mut entity: E) -> ScaffoldResult<E> {
        let entity_type = E::meta().entity_type;
        let mut tables = self.write()?;
        tables.register::<E>();

        let last = tables.sequences.get(entity_type).copied().unwrap_or(0);
        let id = match entity.id() {
            0 => last + 1,
            id if tables
                .rows
                .get(entity_type)
                .is_some_and(|rows| rows.contains_key(&id)) =>
            {
                return Err(StorageError::Conflict {
                    entity_type: entity_type.to_string(),
                    id,
                }
                .into());
            }
            id => id,
        };
        entity.set_id(id);

        let row = encode(&entity)?;
        tables.sequences.insert(entity_type, last.max(id));
        tables.rows.entry(entity_type).or_default().insert(id, row);
        Ok(entity)
    }

    async fn save(&self, entity: &E, expected_version: Option<i64>) -> ScaffoldResult<()> {
        let meta = E::meta();
        let id = entity.id();
        let row = encode(entity)?;
        let mut tables = self.write()?;
        tables.register::<E>();

        let rows = tables.rows.entry(meta.entity_type).or_default();
        if let (Some(expected), Some(field)) = (expected_version, meta.version_field) {
            let stored = rows
                .get(&id)
                .ok_or_else(|| EntityError::not_found(meta.entity_type, id))?;
            let found = stored.get(field).and_then(Value::as_i64).unwrap_or(0);
            if found != expected {
                return Err(StorageError::VersionConflict {
                    entity_type: meta.entity_type.to_string(),
                    id,
                    expected,
                    found,
                }
                .into());
            }
        }
        rows.insert(id, row);

        let last = tables.sequences.entry(meta.entity_type).or_insert(0);
        *last = (*last).max(id);
        Ok(())
    }

    async fn remove(&self, id: i64) -> ScaffoldResult<bool> {
        let meta = E::meta();
        let mut tables = self.write()?;
        let removed = tables
            .rows
            .get_mut(meta.entity_type)
            .and_then(|rows| rows.remove(&id))
            .is_some();
        if removed {
            for m2m in meta.many_to_many {
                if let Some(pairs) = tables.joins.get_mut(m2m.through) {
                    pairs.retain(|(owner, _)| *owner != id);
                }
            }
        }
        Ok(removed)
    }
}
