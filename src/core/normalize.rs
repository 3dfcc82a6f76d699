//! Value normalization: stored field value to transport-safe primitive
//!
//! | Stored variant | Transport value |
//! |---|---|
//! | `DateTime` | string, `%Y-%m-%d %H:%M:%S` |
//! | `Date` | string, `%Y-%m-%d` |
//! | `Time` | string, `%H:%M:%S` |
//! | `Bytes` | UTF-8 decoded string, error if invalid |
//! | `Decimal` | nearest `f64` |
//! | anything else | unchanged |
//!
//! Decimals lose precision on purpose: consumers expect a JSON number, and
//! `f64` is the closest thing transport layers understand.

use crate::config::FormatConfig;
use crate::core::error::EncodingError;
use crate::core::field::FieldValue;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

/// Normalize a value with the default fixed patterns
pub fn normalize(value: &FieldValue) -> Result<Value, EncodingError> {
    normalize_with(value, &FormatConfig::default())
}

/// Normalize a value using the given format patterns
pub fn normalize_with(value: &FieldValue, formats: &FormatConfig) -> Result<Value, EncodingError> {
    let normalized = match value {
        FieldValue::DateTime(dt) => Value::String(dt.format(&formats.datetime).to_string()),
        FieldValue::Date(d) => Value::String(d.format(&formats.date).to_string()),
        FieldValue::Time(t) => Value::String(t.format(&formats.time).to_string()),
        FieldValue::Bytes(bytes) => Value::String(std::str::from_utf8(bytes)?.to_string()),
        FieldValue::Decimal(d) => Value::from(decimal_to_f64(d)),
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::Integer(i) => Value::from(*i),
        // Non-finite floats have no JSON form and become null.
        FieldValue::Float(f) => Value::from(*f),
        FieldValue::Boolean(b) => Value::Bool(*b),
        FieldValue::Null => Value::Null,
    };
    Ok(normalized)
}

// Parsing the exact decimal text rounds to the nearest double; `to_f64`
// can be one ulp off for long mantissas.
fn decimal_to_f64(d: &rust_decimal::Decimal) -> f64 {
    d.to_string()
        .parse()
        .ok()
        .or_else(|| d.to_f64())
        .unwrap_or(f64::NAN)
}
