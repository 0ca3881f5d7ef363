//! Schema Normalizer
//!
//! Converts heterogeneous records into one uniform shape described by a
//! declarative, JSON-Schema-like document.
//!
//! ## Features
//!
//! - **Field Mapping**: Output fields read from dotted source paths in nested input
//! - **Type Coercion**: string, number, integer, boolean, array, object and null targets
//! - **Formats**: date, date-time, email, uri and uuid normalization
//! - **Failure Isolation**: A bad field falls back to its default; the record survives
//! - **Strict Mode**: Missing required fields reject the record
//! - **Registry**: Named schemas loaded from memory, JSON or YAML files
//!
//! ## Example
//!
//! ```
//! use schema_normalizer::SchemaTransformer;
//! use serde_json::json;
//!
//! let transformer = SchemaTransformer::from_value(json!({
//!     "type": "object",
//!     "properties": {
//!         "user_id": { "type": "integer", "source": "id" },
//!         "email": { "type": "string", "format": "email", "source": "contact.email" },
//!         "status": { "type": "string", "default": "pending" }
//!     },
//!     "required": ["user_id"]
//! }), true).unwrap();
//!
//! let out = transformer
//!     .transform(&json!({ "id": "42", "contact": { "email": " Ada@Example.COM " } }))
//!     .unwrap();
//!
//! assert_eq!(out, json!({ "user_id": 42, "email": "ada@example.com", "status": "pending" }));
//! ```

pub mod coerce;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod nested;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod transformer;

pub use coerce::{coerce, CoercionError};
pub use config::NormalizerConfig;
pub use diagnostics::{DiagnosticEvent, Diagnostics, MemoryDiagnostics, TracingDiagnostics};
pub use error::{Result, SchemaError};
pub use registry::{SchemaRegistry, SchemaSource};
pub use resolver::resolve;
pub use schema::{FieldKind, FieldSpec, FieldType, Format, Properties, Schema};
pub use transformer::{CustomTransformer, SchemaTransformer};
