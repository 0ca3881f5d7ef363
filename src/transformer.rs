//! Schema Transformer
//!
//! Applies one schema to records: resolves every declared field, applies
//! custom transformers, substitutes defaults, and enforces required fields in
//! strict mode.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::diagnostics::{tracing_diagnostics, Diagnostics};
use crate::error::{kind_name, Result, SchemaError};
use crate::nested;
use crate::resolver;
use crate::schema::Schema;

/// A per-field function that replaces type coercion.
///
/// It receives the raw resolved value (null when absent) and its result is
/// used verbatim.
pub type CustomTransformer = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Transforms records into the shape declared by a schema
pub struct SchemaTransformer {
    schema: Schema,
    /// Missing required fields fail the record instead of defaulting
    strict: bool,
    custom_transformers: RwLock<HashMap<String, CustomTransformer>>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl SchemaTransformer {
    /// Create a transformer for an already-parsed schema
    pub fn new(schema: Schema, strict: bool) -> Self {
        tracing::debug!(
            schema = schema.display_title(),
            fields = schema.properties.len(),
            strict,
            "initialized schema transformer"
        );
        Self {
            schema,
            strict,
            custom_transformers: RwLock::new(HashMap::new()),
            diagnostics: tracing_diagnostics(),
        }
    }

    /// Create a transformer from a schema document
    pub fn from_value(document: Value, strict: bool) -> Result<Self> {
        Ok(Self::new(Schema::from_value(document)?, strict))
    }

    /// Create a transformer from a JSON or YAML schema file
    pub fn from_file(path: impl AsRef<Path>, strict: bool) -> Result<Self> {
        Ok(Self::new(Schema::from_file(path)?, strict))
    }

    /// Replace the sink that receives field-level failures
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Register a custom transformer for `field`, replacing any earlier one.
    ///
    /// Takes `&self`. Records already being transformed keep the set of
    /// transformers they started with.
    pub fn add_custom_transformer<F>(&self, field: impl Into<String>, transformer: F)
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        let field = field.into();
        tracing::debug!(field = %field, "adding custom transformer");
        self.custom_transformers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(field, Arc::new(transformer));
    }

    /// Transform a single record or an array of records.
    ///
    /// An array yields an array in the same order. The first record that
    /// fails validation aborts the whole batch; see
    /// [`SchemaTransformer::transform_each`] for per-record results.
    pub fn transform(&self, data: &Value) -> Result<Value> {
        match data {
            Value::Array(records) => {
                tracing::debug!(count = records.len(), "transforming batch");
                records
                    .iter()
                    .map(|record| self.transform_single(record).map(Value::Object))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            record => self.transform_single(record).map(Value::Object),
        }
    }

    /// Transform each record independently, keeping one result per record
    pub fn transform_each<'a, I>(&self, records: I) -> Vec<Result<Map<String, Value>>>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        records
            .into_iter()
            .map(|record| self.transform_single(record))
            .collect()
    }

    /// Transform one record.
    ///
    /// Fails only when the record is not a mapping, or when a required field
    /// without a default is absent in strict mode.
    pub fn transform_single(&self, record: &Value) -> Result<Map<String, Value>> {
        if !record.is_object() {
            return Err(SchemaError::InvalidRecord {
                found: kind_name(record),
            });
        }

        // snapshot so custom transformers run without holding the lock
        let custom = self
            .custom_transformers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let diagnostics = self.diagnostics.as_ref();

        let mut out = Map::with_capacity(self.schema.properties.len());
        for (name, spec) in self.schema.properties.iter() {
            let raw = resolver::resolve(record, spec.source_path(name));

            if let Some(transformer) = custom.get(name) {
                out.insert(name.to_string(), transformer(raw.unwrap_or(&Value::Null)));
                continue;
            }

            let value = match raw {
                Some(raw) => nested::transform_value(raw, spec, name, diagnostics),
                None if spec.default.is_none() && self.strict && self.schema.is_required(name) => {
                    diagnostics.required_missing(name);
                    return Err(SchemaError::Validation {
                        field: name.to_string(),
                    });
                }
                None => spec.fallback(),
            };
            out.insert(name.to_string(), value);
        }

        Ok(out)
    }

    /// Check whether `data` passes validation.
    ///
    /// Returns `Ok(false)` for validation failures; any other error propagates.
    pub fn validate(&self, data: &Value) -> Result<bool> {
        match self.transform(data) {
            Ok(_) => Ok(true),
            Err(e) if e.is_validation() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Output field names in declaration order
    pub fn schema_fields(&self) -> Vec<String> {
        self.schema.properties.names()
    }

    /// Names listed as required (possibly empty)
    pub fn required_fields(&self) -> &[String] {
        &self.schema.required
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl fmt::Debug for SchemaTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let custom: Vec<String> = self
            .custom_transformers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("SchemaTransformer")
            .field("schema", &self.schema.display_title())
            .field("fields", &self.schema.properties.names())
            .field("strict", &self.strict)
            .field("custom_transformers", &custom)
            .finish()
    }
}
