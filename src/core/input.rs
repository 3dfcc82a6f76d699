//! Create/update payloads
//!
//! An [`Input`] is either a plain key/value mapping the caller vouches for,
//! or a typed object that is validated before it is reduced to a mapping.

use crate::core::error::{ScaffoldResult, ValidationError};
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

/// Plain key/value payload applied to an entity
pub type FieldMap = serde_json::Map<String, Value>;

/// Payload of a create or update call
#[derive(Debug, Clone)]
pub enum Input<T> {
    /// Used exactly as given, no validation
    Trusted(FieldMap),
    /// Validated, then reduced to a mapping
    Validated(T),
}

impl<T> From<FieldMap> for Input<T> {
    fn from(fields: FieldMap) -> Self {
        Input::Trusted(fields)
    }
}

/// Validated object accepted by `create`.
///
/// Blanket-implemented for every serializable, validatable type.
pub trait CreateInput: Serialize + Validate + Send + Sync {
    /// Full field set, including fields the caller left at their defaults
    fn to_fields(&self) -> ScaffoldResult<FieldMap> {
        to_field_map(self)
    }
}

impl<T: Serialize + Validate + Send + Sync> CreateInput for T {}

/// Validated object accepted by `update`.
///
/// Only explicitly set fields are applied: identity is never applied and
/// `None`/null fields count as unset.
pub trait UpdateInput: Serialize + Validate + Send + Sync {
    fn changed_fields(&self) -> ScaffoldResult<FieldMap> {
        let mut fields = to_field_map(self)?;
        fields.remove("id");
        fields.retain(|_, value| !value.is_null());
        Ok(fields)
    }
}

impl<T: Serialize + Validate + Send + Sync> UpdateInput for T {}

fn to_field_map<T: Serialize + ?Sized>(input: &T) -> ScaffoldResult<FieldMap> {
    match serde_json::to_value(input) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(ValidationError::InvalidInput {
            message: format!("expected a key/value object, got {}", other),
        }
        .into()),
        Err(e) => Err(ValidationError::InvalidInput {
            message: e.to_string(),
        }
        .into()),
    }
}

impl<C: CreateInput> Input<C> {
    /// Resolve a create payload into the full mapping to persist
    pub fn creation_fields(&self) -> ScaffoldResult<FieldMap> {
        match self {
            Input::Trusted(fields) => Ok(fields.clone()),
            Input::Validated(input) => {
                input.validate().map_err(ValidationError::from)?;
                input.to_fields()
            }
        }
    }
}

impl<U: UpdateInput> Input<U> {
    /// Resolve an update payload into the set of fields to apply
    pub fn update_fields(&self) -> ScaffoldResult<FieldMap> {
        match self {
            Input::Trusted(fields) => {
                let mut fields = fields.clone();
                fields.remove("id");
                Ok(fields)
            }
            Input::Validated(input) => {
                input.validate().map_err(ValidationError::from)?;
                input.changed_fields()
            }
        }
    }
}
