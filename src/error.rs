//! Error types for schema loading and record normalization

use std::path::PathBuf;

use thiserror::Error;

/// Result type for normalizer operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema and transformation errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Required field '{field}' is missing")]
    Validation { field: String },

    #[error("Record must be a mapping, got {found}")]
    InvalidRecord { found: &'static str },

    #[error("Schema file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Schema not found: {name}")]
    NotFound { name: String },

    #[error("Unsupported schema file: {} (expected .json, .yaml or .yml)", path.display())]
    UnsupportedFile { path: PathBuf },

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SchemaError {
    /// Whether this error rejects the record itself rather than the schema or
    /// the environment
    pub fn is_validation(&self) -> bool {
        matches!(self, SchemaError::Validation { .. } | SchemaError::InvalidRecord { .. })
    }

    /// Name of the offending field, for field-identified failures
    pub fn field(&self) -> Option<&str> {
        match self {
            SchemaError::Validation { field } => Some(field),
            _ => None,
        }
    }
}

/// Human-readable name of a JSON value's kind, for error messages
pub(crate) fn kind_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_names_field() {
        let err = SchemaError::Validation { field: "id".to_string() };
        assert!(err.is_validation());
        assert_eq!(err.field(), Some("id"));
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_not_found_is_not_validation() {
        let err = SchemaError::NotFound { name: "users".to_string() };
        assert!(!err.is_validation());
        assert_eq!(err.to_string(), "Schema not found: users");
    }
}
