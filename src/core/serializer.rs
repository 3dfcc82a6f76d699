//! Recursive entity serializer
//!
//! Converts an entity into a transport mapping: an insertion-ordered JSON
//! object whose values are strings, numbers, booleans, null, nested
//! mappings or sequences of mappings.
//!
//! Relations are expanded at most one level deep. Expanded related entities
//! go through [`Serializer::project`], which only ever reads scalar fields,
//! so mutually-referencing entity graphs can never recurse.
//!
//! # Example
//!
//! ```rust,ignore
//! let options = SerializeOptions::new()
//!     .exclude(["customer_id"])
//!     .expand_fk(Projection::new().include(["id", "name"]))
//!     .expand_m2m(Projection::new());
//!
//! let mapping = Serializer::new().to_mapping(&order, &options, &store).await?;
//! ```

use crate::config::{FormatConfig, ScaffoldConfig};
use crate::core::entity::{ForeignKey, ManyToMany, Model};
use crate::core::error::{EntityError, ScaffoldResult};
use crate::core::field::FieldValue;
use crate::core::normalize::normalize_with;
use crate::core::store::RelationResolver;
use futures::future::join_all;
use serde_json::Value;

/// Transport-safe, insertion-ordered key/value structure
pub type Mapping = serde_json::Map<String, Value>;

/// Include/exclude narrowing of the scalar field set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// Fields to keep, in output order. Empty means every scalar field.
    pub include: Vec<String>,
    /// Fields to drop
    pub exclude: Vec<String>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = fields.into_iter().map(Into::into).collect();
        self
    }

    fn excludes(&self, field: &str) -> bool {
        self.exclude.iter().any(|f| f == field)
    }
}

/// What to emit for one `to_mapping` call.
///
/// `fk` / `m2m` being `Some` is the request to expand that relation class;
/// the carried projection narrows the nested mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    pub fields: Projection,
    pub fk: Option<Projection>,
    pub m2m: Option<Projection>,
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = self.fields.include(fields);
        self
    }

    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = self.fields.exclude(fields);
        self
    }

    /// Expand foreign keys, narrowing each referenced entity by `projection`
    pub fn expand_fk(mut self, projection: Projection) -> Self {
        self.fk = Some(projection);
        self
    }

    /// Expand many-valued relations, narrowing each member by `projection`
    pub fn expand_m2m(mut self, projection: Projection) -> Self {
        self.m2m = Some(projection);
        self
    }
}

/// Entity to transport-mapping converter
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    formats: FormatConfig,
}

impl Serializer {
    /// Serializer with the default date/time patterns
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formats(formats: FormatConfig) -> Self {
        Self { formats }
    }

    pub fn with_config(config: &ScaffoldConfig) -> Self {
        Self::with_formats(config.formats.clone())
    }

    /// Convert one entity, expanding relations as `options` requests.
    ///
    /// All foreign-key and many-valued fetches run concurrently and are all
    /// awaited; if any of them fails the whole call fails and no partial
    /// mapping is returned.
    pub async fn to_mapping(
        &self,
        entity: &dyn Model,
        options: &SerializeOptions,
        resolver: &dyn RelationResolver,
    ) -> ScaffoldResult<Mapping> {
        let meta = entity.descriptor();
        let mut mapping = self.project(entity, &options.fields)?;

        let fk_tasks: Vec<_> = match &options.fk {
            Some(projection) => meta
                .foreign_keys
                .iter()
                .filter(|fk| !options.fields.excludes(fk.name))
                .map(|fk| self.expand_foreign_key(entity, fk, projection, resolver))
                .collect(),
            None => Vec::new(),
        };
        let m2m_tasks: Vec<_> = match &options.m2m {
            Some(projection) => meta
                .many_to_many
                .iter()
                .filter(|m2m| !options.fields.excludes(m2m.name))
                .map(|m2m| self.expand_many(entity, m2m, projection, resolver))
                .collect(),
            None => Vec::new(),
        };

        let (fk_results, m2m_results) = futures::join!(join_all(fk_tasks), join_all(m2m_tasks));
        for result in fk_results.into_iter().chain(m2m_results) {
            let (name, value) = result?;
            mapping.insert(name.to_string(), value);
        }

        tracing::debug!(
            entity_type = meta.entity_type,
            id = entity.identity(),
            keys = mapping.len(),
            "serialized entity"
        );
        Ok(mapping)
    }

    /// Convert a batch of entities concurrently, all-or-nothing
    pub async fn to_mappings<E: Model>(
        &self,
        entities: &[E],
        options: &SerializeOptions,
        resolver: &dyn RelationResolver,
    ) -> ScaffoldResult<Vec<Mapping>> {
        join_all(
            entities
                .iter()
                .map(|entity| self.to_mapping(entity, options, resolver)),
        )
        .await
        .into_iter()
        .collect()
    }

    /// Scalar-only conversion. Never touches relations.
    pub fn project(&self, entity: &dyn Model, projection: &Projection) -> ScaffoldResult<Mapping> {
        let meta = entity.descriptor();
        let keys: Vec<&str> = if projection.include.is_empty() {
            meta.fields.to_vec()
        } else {
            projection.include.iter().map(String::as_str).collect()
        };

        let mut mapping = Mapping::new();
        for key in keys.into_iter().filter(|k| !projection.excludes(k)) {
            let raw = match entity.value_of(key) {
                Some(raw) if meta.has_field(key) => raw,
                _ => return Err(EntityError::unknown_field(meta.entity_type, key).into()),
            };
            let value = normalize_with(&raw, &self.formats).map_err(|source| {
                EntityError::Encoding {
                    entity_type: meta.entity_type.to_string(),
                    field: key.to_string(),
                    source,
                }
            })?;
            mapping.insert(key.to_string(), value);
        }
        Ok(mapping)
    }

    async fn expand_foreign_key(
        &self,
        entity: &dyn Model,
        fk: &'static ForeignKey,
        projection: &Projection,
        resolver: &dyn RelationResolver,
    ) -> ScaffoldResult<(&'static str, Value)> {
        let meta = entity.descriptor();
        let id = match entity.value_of(fk.column) {
            Some(FieldValue::Null) => return Ok((fk.name, Value::Null)),
            Some(FieldValue::Integer(id)) => id,
            _ => {
                return Err(EntityError::InvalidReference {
                    entity_type: meta.entity_type.to_string(),
                    field: fk.name.to_string(),
                }
                .into());
            }
        };

        let related = resolver
            .resolve_one(fk, id)
            .await?
            .ok_or_else(|| EntityError::not_found(fk.target, id))?;
        let nested = self.project(related.as_ref(), projection)?;
        Ok((fk.name, Value::Object(nested)))
    }

    async fn expand_many(
        &self,
        entity: &dyn Model,
        m2m: &'static ManyToMany,
        projection: &Projection,
        resolver: &dyn RelationResolver,
    ) -> ScaffoldResult<(&'static str, Value)> {
        let members = resolver.resolve_many(m2m, entity.identity()).await?;
        let nested = members
            .iter()
            .map(|member| self.project(member.as_ref(), projection).map(Value::Object))
            .collect::<ScaffoldResult<Vec<_>>>()?;
        Ok((m2m.name, Value::Array(nested)))
    }
}
