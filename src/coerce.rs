//! Type and format coercion of resolved values
//!
//! [`coerce`] converts one present value to the declared type of a field
//! spec. A declared format takes priority and replaces basic type coercion.
//! Failures are returned as [`CoercionError`]; [`coerce_or_default`] turns
//! them into the field's fallback value and reports them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};
use serde_json::{Number, Value};
use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::error::kind_name;
use crate::schema::{FieldSpec, FieldType, Format};

const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
// `%#z` accepts `Z`, `+02`, `+0200` and `+02:00`
const OFFSET_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

/// A single field's conversion failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("cannot convert {found} to {target}")]
    Incompatible { target: FieldType, found: &'static str },

    #[error("'{value}' is not a valid {target}")]
    Parse { target: FieldType, value: String },

    #[error("'{value}' is not a valid {format}")]
    Format { format: Format, value: String },
}

/// Convert `value` according to `spec`.
///
/// Null converts to null. A declared format is applied instead of the basic
/// type conversion.
pub fn coerce(value: &Value, spec: &FieldSpec) -> Result<Value, CoercionError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    match spec.format() {
        Some(format) => convert_format(value, format),
        None => convert_type(value, spec.field_type()),
    }
}

/// [`coerce`], substituting the field's default (or null) on failure
pub fn coerce_or_default(
    value: &Value,
    spec: &FieldSpec,
    field: &str,
    diagnostics: &dyn Diagnostics,
) -> Value {
    match coerce(value, spec) {
        Ok(converted) => converted,
        Err(error) => {
            diagnostics.coercion_failed(field, &error);
            spec.fallback()
        }
    }
}

/// Basic conversion of a non-null value to `target`
pub fn convert_type(value: &Value, target: FieldType) -> Result<Value, CoercionError> {
    match target {
        FieldType::String => Ok(Value::String(to_text(value))),
        FieldType::Number => to_number(value),
        FieldType::Integer => to_integer(value),
        FieldType::Boolean => Ok(Value::Bool(is_truthy(value))),
        FieldType::Array => match value {
            Value::Array(_) => Ok(value.clone()),
            scalar => Ok(Value::Array(vec![scalar.clone()])),
        },
        FieldType::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            other => Err(CoercionError::Incompatible {
                target,
                found: kind_name(other),
            }),
        },
        FieldType::Null => Ok(Value::Null),
    }
}

/// Format-specific conversion of a non-null value
pub fn convert_format(value: &Value, format: Format) -> Result<Value, CoercionError> {
    match format {
        Format::Date => match value {
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .map(|date| Value::String(date.format(DATE_FORMAT).to_string()))
                .map_err(|_| CoercionError::Format {
                    format,
                    value: s.clone(),
                }),
            other => Ok(other.clone()),
        },
        Format::DateTime => match value {
            Value::String(s) => parse_date_time(s.trim())
                .map(Value::String)
                .ok_or_else(|| CoercionError::Format {
                    format,
                    value: s.clone(),
                }),
            other => Ok(other.clone()),
        },
        Format::Email => Ok(Value::String(to_text(value).trim().to_lowercase())),
        Format::Uri | Format::Uuid => Ok(Value::String(to_text(value).trim().to_string())),
    }
}

/// Parse an ISO-8601 date-time and render it canonically.
///
/// Offset-carrying inputs (including `Z`) render as RFC 3339 with their
/// offset; naive inputs render without one; a bare date means midnight.
fn parse_date_time(s: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false));
    }
    for fmt in OFFSET_DATE_TIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false));
        }
    }

    let naive = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(naive.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

/// Textual form of a value. Composites render as compact JSON.
fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn to_number(value: &Value) -> Result<Value, CoercionError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => {
            return Err(CoercionError::Incompatible {
                target: FieldType::Number,
                found: kind_name(other),
            })
        }
    };

    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| CoercionError::Parse {
            target: FieldType::Number,
            value: to_text(value),
        })
}

fn to_integer(value: &Value) -> Result<Value, CoercionError> {
    let parse_error = || CoercionError::Parse {
        target: FieldType::Integer,
        value: to_text(value),
    };

    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| Value::from(f.trunc() as i64))
            .ok_or_else(parse_error),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<u64>().map(Value::from))
                .map_err(|_| parse_error())
        }
        Value::Bool(b) => Ok(Value::from(i64::from(*b))),
        other => Err(CoercionError::Incompatible {
            target: FieldType::Integer,
            found: kind_name(other),
        }),
    }
}

/// Truthiness: false, zero, empty string and empty composites are false
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
