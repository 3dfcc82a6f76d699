//! # Scaffold
//!
//! Generic persisted-entity scaffolding for data-backed services.
//!
//! ## Features
//!
//! - **Value Normalization**: timestamps, decimals and byte fields become transport-safe primitives
//! - **Depth-Bounded Serialization**: foreign keys and many-valued relations expand exactly one level
//! - **Concurrent Fan-Out**: every relation fetch of a `to_mapping` call runs at once, all-or-nothing
//! - **Typed CRUD**: `get`/`query`/`select`/`list`/`create`/`update`/`remove`/`delete` over any entity
//! - **Trusted vs Validated Input**: plain mappings bypass validation, typed inputs never do
//! - **Optimistic Concurrency**: optional version column checked and bumped on update
//! - **Configuration-Based**: date/time patterns and paging limits via YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scaffold::prelude::*;
//!
//! impl_entity!(
//!     Customer,
//!     "customer",
//!     { name: String }
//! );
//!
//! impl_entity!(
//!     Order,
//!     "order",
//!     {
//!         total: Decimal,
//!         placed_at: DateTime<Utc>,
//!         customer_id: Option<i64>,
//!     },
//!     foreign_keys { customer: customer_id => "customer" }
//! );
//!
//! let store = Arc::new(InMemoryStore::new());
//! let orders: Crud<Order, NewOrder, OrderPatch, _> = Crud::new(store.clone());
//!
//! let order = orders.get(1).await?;
//! let options = SerializeOptions::new().expand_fk(Projection::new());
//! let mapping = Serializer::new().to_mapping(&order, &options, store.as_ref()).await?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        entity::{Entity, EntityMeta, ForeignKey, ManyToMany, Model},
        field::FieldValue,
        store::{EntityStore, RelationResolver},
    };

    // === Serialization ===
    pub use crate::core::{
        normalize::{normalize, normalize_with},
        serializer::{Mapping, Projection, SerializeOptions, Serializer},
    };

    // === Data Access ===
    pub use crate::core::{
        crud::Crud,
        input::{CreateInput, FieldMap, Input, UpdateInput},
        prefetch::Prefetched,
        query::{Direction, Filter, OrderBy, Page, Query},
    };

    // === Errors ===
    pub use crate::core::error::{
        EntityError, ScaffoldError, ScaffoldResult, StorageError, ValidationError,
    };

    // === Macros ===
    pub use crate::impl_entity;

    // === Storage ===
    pub use crate::storage::InMemoryStore;

    // === Config ===
    pub use crate::config::{FormatConfig, PaginationConfig, ScaffoldConfig};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
    pub use rust_decimal::Decimal;
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
    pub use validator::Validate;
}
