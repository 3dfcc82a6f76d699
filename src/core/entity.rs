//! Entity traits defining the core abstraction for all persisted types

use crate::core::field::FieldValue;
use serde::{Serialize, de::DeserializeOwned};

/// A single-valued reference from one entity to another.
///
/// The referenced identity lives in a scalar `column` (e.g. `customer_id`);
/// the relation itself is exposed under `name` (e.g. `customer`) when expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub name: &'static str,
    pub column: &'static str,
    pub target: &'static str,
}

/// A set-valued relation stored in a join ("through") table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManyToMany {
    pub name: &'static str,
    pub target: &'static str,
    pub through: &'static str,
}

/// Static field descriptor set of an entity type.
///
/// This is a property of the type, never of an instance: `fields` lists
/// the scalar columns in declaration order (identity first), followed by
/// the relation descriptors.
#[derive(Debug)]
pub struct EntityMeta {
    /// Entity type name (e.g. "order")
    pub entity_type: &'static str,

    /// Ordered scalar field names, including foreign-key columns
    pub fields: &'static [&'static str],

    /// Foreign-key relations
    pub foreign_keys: &'static [ForeignKey],

    /// Many-valued relations
    pub many_to_many: &'static [ManyToMany],

    /// Column checked and incremented on every update, if any
    pub version_field: Option<&'static str>,
}

impl EntityMeta {
    /// Whether `field` is a declared scalar field
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    /// Look up a foreign-key relation by name
    pub fn foreign_key(&self, name: &str) -> Option<&'static ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }

    /// Look up a many-valued relation by name
    pub fn many_to_many(&self, name: &str) -> Option<&'static ManyToMany> {
        self.many_to_many.iter().find(|m2m| m2m.name == name)
    }
}

/// Base trait for all persisted entities.
///
/// Entities round-trip through a plain key/value mapping with serde, which
/// is how creation and partial updates are applied. Most types implement
/// this through [`impl_entity!`](crate::impl_entity).
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Static field descriptor set for this type
    fn meta() -> &'static EntityMeta;

    /// Unique identity; `0` until the store assigns one
    fn id(&self) -> i64;

    /// Assign the identity. Only the store calls this, on insert.
    fn set_id(&mut self, id: i64);

    /// Get the value of a declared scalar field by name
    fn field_value(&self, field: &str) -> Option<FieldValue>;
}

/// Object-safe view of an entity used where the concrete type is erased,
/// such as related entities resolved by a store.
pub trait Model: Send + Sync {
    fn descriptor(&self) -> &'static EntityMeta;

    fn identity(&self) -> i64;

    fn value_of(&self, field: &str) -> Option<FieldValue>;
}

impl<E: Entity> Model for E {
    fn descriptor(&self) -> &'static EntityMeta {
        E::meta()
    }

    fn identity(&self) -> i64 {
        self.id()
    }

    fn value_of(&self, field: &str) -> Option<FieldValue> {
        self.field_value(field)
    }
}
