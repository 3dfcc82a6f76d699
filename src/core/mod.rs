//! Core module containing fundamental traits and types for the scaffold layer

pub mod crud;
pub mod entity;
pub mod error;
pub mod field;
pub mod input;
pub mod normalize;
pub mod prefetch;
pub mod query;
pub mod serializer;
pub mod store;

pub use crud::Crud;
pub use entity::{Entity, EntityMeta, ForeignKey, ManyToMany, Model};
pub use error::{
    ConfigError, EncodingError, EntityError, ScaffoldError, ScaffoldResult, StorageError,
    ValidationError,
};
pub use field::FieldValue;
pub use input::{CreateInput, FieldMap, Input, UpdateInput};
pub use normalize::{normalize, normalize_with};
pub use prefetch::Prefetched;
pub use query::{Direction, Filter, OrderBy, Page, Query};
pub use serializer::{Mapping, Projection, SerializeOptions, Serializer};
pub use store::{EntityStore, RelationResolver};
