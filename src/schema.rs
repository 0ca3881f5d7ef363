//! Schema types and structures
//!
//! A schema document is JSON-Schema shaped: a top-level object with ordered
//! `properties`, a `required` list and an optional `title`. Each property is
//! parsed into a [`FieldSpec`], a recursive sum type over scalar, array and
//! object fields.

use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{kind_name, Result, SchemaError};

/// Declared target type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

impl FieldType {
    /// Parse a JSON-Schema type name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "integer" => Some(FieldType::Integer),
            "boolean" => Some(FieldType::Boolean),
            "array" => Some(FieldType::Array),
            "object" => Some(FieldType::Object),
            "null" => Some(FieldType::Null),
            _ => None,
        }
    }

    /// Get the JSON-Schema name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Null => "null",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format-specific conversion applied instead of basic type coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Calendar date, `YYYY-MM-DD`
    Date,
    /// ISO-8601 date-time
    DateTime,
    Email,
    Uri,
    Uuid,
}

impl Format {
    /// Parse a JSON-Schema format name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "date" => Some(Format::Date),
            "date-time" => Some(Format::DateTime),
            "email" => Some(Format::Email),
            "uri" => Some(Format::Uri),
            "uuid" => Some(Format::Uuid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Date => "date",
            Format::DateTime => "date-time",
            Format::Email => "email",
            Format::Uri => "uri",
            Format::Uuid => "uuid",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of named field specs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Vec<(String, FieldSpec)>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a property, replacing an earlier one with the same name in place
    pub fn insert(&mut self, name: impl Into<String>, spec: FieldSpec) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = spec,
            None => self.0.push((name, spec)),
        }
    }

    /// Builder-style [`Properties::insert`]
    pub fn with(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, spec)| spec)
    }

    /// Iterate properties in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.0.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Shape of a field: scalar, array of items, or nested object
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// string, number, integer, boolean or null
    Scalar {
        ty: FieldType,
        format: Option<Format>,
    },
    Array {
        items: Box<FieldSpec>,
    },
    /// `properties` is `None` for an open object that declares no shape
    Object {
        properties: Option<Properties>,
    },
}

/// Description of one output field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Dot-delimited path into the input record; defaults to the field name
    pub source: Option<String>,
    /// Value substituted when the source is absent or coercion fails
    pub default: Option<Value>,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Create a scalar field spec. `Array` and `Object` build their
    /// composite forms with string items and no declared properties.
    pub fn new(ty: FieldType) -> Self {
        let kind = match ty {
            FieldType::Array => FieldKind::Array {
                items: Box::new(FieldSpec::new(FieldType::String)),
            },
            FieldType::Object => FieldKind::Object { properties: None },
            ty => FieldKind::Scalar { ty, format: None },
        };
        Self {
            source: None,
            default: None,
            kind,
        }
    }

    /// Create an array field spec
    pub fn array(items: FieldSpec) -> Self {
        Self {
            source: None,
            default: None,
            kind: FieldKind::Array {
                items: Box::new(items),
            },
        }
    }

    /// Create an object field spec with declared nested properties
    pub fn object(properties: Properties) -> Self {
        Self {
            source: None,
            default: None,
            kind: FieldKind::Object {
                properties: Some(properties),
            },
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the format. Only scalar fields carry a format; composites ignore it.
    pub fn with_format(mut self, format: Format) -> Self {
        if let FieldKind::Scalar { format: slot, .. } = &mut self.kind {
            *slot = Some(format);
        }
        self
    }

    /// Get the declared type of this field
    pub fn field_type(&self) -> FieldType {
        match &self.kind {
            FieldKind::Scalar { ty, .. } => *ty,
            FieldKind::Array { .. } => FieldType::Array,
            FieldKind::Object { .. } => FieldType::Object,
        }
    }

    pub fn format(&self) -> Option<Format> {
        match &self.kind {
            FieldKind::Scalar { format, .. } => *format,
            _ => None,
        }
    }

    /// Path used to locate this field's raw value
    pub fn source_path<'a>(&'a self, field_name: &'a str) -> &'a str {
        self.source.as_deref().unwrap_or(field_name)
    }

    /// A fresh copy of the declared default, or null
    pub fn fallback(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }

    /// Parse a field spec from its schema document fragment
    pub fn from_value(name: &str, spec: &Value) -> Result<Self> {
        let obj = spec.as_object().ok_or_else(|| {
            SchemaError::InvalidFormat(format!(
                "field '{}' must be an object, got {}",
                name,
                kind_name(spec)
            ))
        })?;

        let ty = parse_type(name, obj.get("type"))?;

        let source = match obj.get("source") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(SchemaError::InvalidFormat(format!(
                    "field '{}': source must be a string, got {}",
                    name,
                    kind_name(other)
                )))
            }
        };

        let kind = match ty {
            FieldType::Array => {
                let items = match obj.get("items") {
                    Some(items) => FieldSpec::from_value(&format!("{}[]", name), items)?,
                    None => FieldSpec::new(FieldType::String),
                };
                FieldKind::Array {
                    items: Box::new(items),
                }
            }
            FieldType::Object => {
                let properties = match obj.get("properties") {
                    Some(props) => Some(parse_properties(name, props)?),
                    None => None,
                };
                FieldKind::Object { properties }
            }
            ty => FieldKind::Scalar {
                ty,
                format: parse_format(name, obj.get("format"))?,
            },
        };

        Ok(Self {
            source,
            default: obj.get("default").cloned(),
            kind,
        })
    }
}

/// A parsed schema document
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub title: Option<String>,
    /// Fields in declaration order
    pub properties: Properties,
    pub required: Vec<String>,
    /// The document this schema was parsed from
    document: Value,
}

impl Schema {
    /// Build a schema directly from properties
    pub fn new(properties: Properties, required: Vec<String>) -> Self {
        let mut props = Map::new();
        for (name, spec) in properties.iter() {
            props.insert(name.to_string(), spec_to_value(spec));
        }
        let document = serde_json::json!({
            "type": "object",
            "properties": props,
            "required": &required,
        });
        Self {
            title: None,
            properties,
            required,
            document,
        }
    }

    /// Parse a schema document
    pub fn from_value(document: Value) -> Result<Self> {
        let obj = document.as_object().ok_or_else(|| {
            SchemaError::InvalidFormat(format!(
                "schema must be an object, got {}",
                kind_name(&document)
            ))
        })?;

        let title = obj.get("title").and_then(Value::as_str).map(String::from);

        let properties = match obj.get("properties") {
            Some(props) => parse_properties("<root>", props)?,
            None => Properties::new(),
        };

        let required = match obj.get("required") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(names)) => names
                .iter()
                .map(|n| {
                    n.as_str().map(String::from).ok_or_else(|| {
                        SchemaError::InvalidFormat(format!(
                            "required entries must be strings, got {}",
                            kind_name(n)
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(SchemaError::InvalidFormat(format!(
                    "required must be an array, got {}",
                    kind_name(other)
                )))
            }
        };

        Ok(Self {
            title,
            properties,
            required,
            document,
        })
    }

    /// Load a schema from a JSON or YAML file, detected by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let format = DocumentFormat::from_path(path)?;
        let content = fs::read_to_string(path)?;
        let document = match format {
            DocumentFormat::Json => serde_json::from_str(&content)?,
            DocumentFormat::Yaml => serde_yaml::from_str(&content)?,
        };

        tracing::info!(path = %path.display(), "loaded schema file");
        Self::from_value(document)
    }

    /// Whether `field` is listed as required
    pub fn is_required(&self, field: &str) -> bool {
        self.required.iter().any(|r| r == field)
    }

    /// Title for log messages
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }

    /// The schema document this schema was built from
    pub fn to_value(&self) -> Value {
        self.document.clone()
    }
}

/// Serialization format of a schema file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => Ok(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            _ => Err(SchemaError::UnsupportedFile {
                path: path.to_path_buf(),
            }),
        }
    }
}

fn parse_properties(parent: &str, props: &Value) -> Result<Properties> {
    let map = props.as_object().ok_or_else(|| {
        SchemaError::InvalidFormat(format!(
            "properties of '{}' must be an object, got {}",
            parent,
            kind_name(props)
        ))
    })?;

    let mut properties = Properties::new();
    for (name, spec) in map {
        properties.insert(name.clone(), FieldSpec::from_value(name, spec)?);
    }
    Ok(properties)
}

fn parse_type(field: &str, ty: Option<&Value>) -> Result<FieldType> {
    let name = match ty {
        None | Some(Value::Null) => return Ok(FieldType::String),
        Some(Value::String(name)) => name.as_str(),
        // Union types such as ["integer", "null"] resolve to the first non-null member
        Some(Value::Array(members)) => {
            let names: Vec<&str> = members.iter().filter_map(Value::as_str).collect();
            match names.iter().find(|n| **n != "null") {
                Some(name) => *name,
                None if !names.is_empty() => "null",
                None => {
                    return Err(SchemaError::InvalidFormat(format!(
                        "field '{}': type list has no type names",
                        field
                    )))
                }
            }
        }
        Some(other) => {
            return Err(SchemaError::InvalidFormat(format!(
                "field '{}': type must be a string or list, got {}",
                field,
                kind_name(other)
            )))
        }
    };

    FieldType::parse(name).ok_or_else(|| {
        SchemaError::InvalidFormat(format!("field '{}': unknown type '{}'", field, name))
    })
}

fn parse_format(field: &str, format: Option<&Value>) -> Result<Option<Format>> {
    match format {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => {
            let parsed = Format::parse(name);
            if parsed.is_none() {
                tracing::debug!(field, format = %name, "ignoring unsupported format");
            }
            Ok(parsed)
        }
        Some(other) => Err(SchemaError::InvalidFormat(format!(
            "field '{}': format must be a string, got {}",
            field,
            kind_name(other)
        ))),
    }
}

fn spec_to_value(spec: &FieldSpec) -> Value {
    let mut out = Map::new();
    out.insert("type".into(), Value::from(spec.field_type().as_str()));
    if let Some(source) = &spec.source {
        out.insert("source".into(), Value::from(source.as_str()));
    }
    if let Some(default) = &spec.default {
        out.insert("default".into(), default.clone());
    }
    match &spec.kind {
        FieldKind::Scalar {
            format: Some(format),
            ..
        } => {
            out.insert("format".into(), Value::from(format.as_str()));
        }
        FieldKind::Scalar { .. } => {}
        FieldKind::Array { items } => {
            out.insert("items".into(), spec_to_value(items));
        }
        FieldKind::Object {
            properties: Some(props),
        } => {
            let nested: Map<String, Value> = props
                .iter()
                .map(|(name, spec)| (name.to_string(), spec_to_value(spec)))
                .collect();
            out.insert("properties".into(), Value::Object(nested));
        }
        FieldKind::Object { properties: None } => {}
    }
    Value::Object(out)
}
