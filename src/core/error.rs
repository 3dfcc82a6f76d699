//! Typed error handling for the scaffold crate
//!
//! Every fallible operation returns [`ScaffoldResult`]. The top-level
//! [`ScaffoldError`] wraps one category per concern so callers can match
//! on exactly what went wrong instead of inspecting strings.
//!
//! # Error Categories
//!
//! - [`EntityError`]: entity lookups and serialization
//! - [`ValidationError`]: validated input objects rejected before any write
//! - [`StorageError`]: failures reported by the storage collaborator
//! - [`ConfigError`]: configuration loading
//!
//! # Example
//!
//! ```rust,ignore
//! match orders.get(9999).await {
//!     Ok(order) => println!("found {}", order.id),
//!     Err(ScaffoldError::Entity(EntityError::NotFound { id, .. })) => {
//!         println!("order {} does not exist", id);
//!     }
//!     Err(e) => eprintln!("other error: {}", e),
//! }
//! ```

use indexmap::IndexMap;
use std::str::Utf8Error;
use thiserror::Error;

/// The main error type for the scaffold crate
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// Entity-related errors (lookups, serialization)
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// Input validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage backend errors, propagated unchanged
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScaffoldError {
    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ScaffoldError::Entity(e) => e.error_code(),
            ScaffoldError::Validation(_) => "VALIDATION_ERROR",
            ScaffoldError::Storage(e) => e.error_code(),
            ScaffoldError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether this error reports an absent identity
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScaffoldError::Entity(EntityError::NotFound { .. }))
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// A byte field that could not be decoded as UTF-8
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("byte sequence is not valid UTF-8: {source}")]
pub struct EncodingError {
    #[from]
    source: Utf8Error,
}

impl EncodingError {
    /// Offset of the first invalid byte
    pub fn valid_up_to(&self) -> usize {
        self.source.valid_up_to()
    }
}

/// Errors related to entity operations
#[derive(Debug, Error)]
pub enum EntityError {
    /// No entity has the requested identity
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: i64 },

    /// A byte field failed UTF-8 decoding during serialization
    #[error("failed to encode field '{field}' of {entity_type}: {source}")]
    Encoding {
        entity_type: String,
        field: String,
        #[source]
        source: EncodingError,
    },

    /// A field or relation name is not declared on the entity type
    #[error("{entity_type} has no field named '{field}'")]
    UnknownField { entity_type: String, field: String },

    /// A foreign-key column holds something other than an identity
    #[error("foreign key '{field}' of {entity_type} does not hold an integer identity")]
    InvalidReference { entity_type: String, field: String },

    /// Failed to convert between an entity and its plain mapping
    #[error("failed to serialize/deserialize {entity_type}: {message}")]
    Serialization {
        entity_type: String,
        message: String,
    },
}

impl EntityError {
    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::Encoding { .. } => "ENTITY_ENCODING_ERROR",
            EntityError::UnknownField { .. } => "UNKNOWN_FIELD",
            EntityError::InvalidReference { .. } => "INVALID_REFERENCE",
            EntityError::Serialization { .. } => "ENTITY_SERIALIZATION_ERROR",
        }
    }

    pub(crate) fn not_found(entity_type: &str, id: i64) -> Self {
        EntityError::NotFound {
            entity_type: entity_type.to_string(),
            id,
        }
    }

    pub(crate) fn unknown_field(entity_type: &str, field: &str) -> Self {
        EntityError::UnknownField {
            entity_type: entity_type.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn serialization(entity_type: &str, err: impl std::fmt::Display) -> Self {
        EntityError::Serialization {
            entity_type: entity_type.to_string(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors raised while resolving an input object into a plain mapping
#[derive(Debug, Error)]
pub enum ValidationError {
    /// One or more fields failed their validation rules
    #[error("validation failed: {}", format_field_errors(.0))]
    FieldErrors(IndexMap<String, Vec<String>>),

    /// The input could not be turned into a key/value mapping at all
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

fn format_field_errors(errors: &IndexMap<String, Vec<String>>) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<(String, Vec<String>)> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        ValidationError::FieldErrors(fields.into_iter().collect())
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by the storage collaborator
#[derive(Debug, Error)]
pub enum StorageError {
    /// Insert collided with an existing identity
    #[error("{entity_type} with id '{id}' already exists")]
    Conflict { entity_type: String, id: i64 },

    /// Versioned save lost a race with another writer
    #[error("{entity_type} '{id}' was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        entity_type: String,
        id: i64,
        expected: i64,
        found: i64,
    },

    /// Relation points at an entity type the store cannot decode
    #[error("entity type '{entity_type}' is not registered with the store")]
    UnknownEntityType { entity_type: String },

    /// Any other backend failure
    #[error("storage backend error: {message}")]
    Backend { message: String },
}

impl StorageError {
    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Conflict { .. } => "STORAGE_CONFLICT",
            StorageError::VersionConflict { .. } => "VERSION_CONFLICT",
            StorageError::UnknownEntityType { .. } => "UNKNOWN_ENTITY_TYPE",
            StorageError::Backend { .. } => "STORAGE_ERROR",
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration content is not valid YAML for the expected shape
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for scaffold operations
pub type ScaffoldResult<T> = Result<T, ScaffoldError>;
