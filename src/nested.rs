//! Array and nested-object transformation
//!
//! Both walk a composite value through the field specs nested inside the
//! parent spec. Failures stay local to the element or property that caused
//! them.

use serde_json::{Map, Value};

use crate::coerce::{coerce_or_default, CoercionError};
use crate::diagnostics::Diagnostics;
use crate::error::kind_name;
use crate::resolver;
use crate::schema::{FieldKind, FieldSpec, FieldType, Properties};

/// Transform a present (non-absent) value according to its spec.
///
/// Arrays go through [`transform_array`], objects with declared properties
/// through [`transform_object`], everything else through coercion. A value
/// that cannot take the declared shape falls back to the field's default.
pub fn transform_value(
    value: &Value,
    spec: &FieldSpec,
    field: &str,
    diagnostics: &dyn Diagnostics,
) -> Value {
    match &spec.kind {
        FieldKind::Array { items } => {
            Value::Array(transform_array(value, items, field, diagnostics))
        }
        FieldKind::Object {
            properties: Some(properties),
        } => match value {
            Value::Object(_) => {
                Value::Object(transform_object(value, properties, field, diagnostics))
            }
            other => {
                diagnostics.coercion_failed(
                    field,
                    &CoercionError::Incompatible {
                        target: FieldType::Object,
                        found: kind_name(other),
                    },
                );
                spec.fallback()
            }
        },
        _ => coerce_or_default(value, spec, field, diagnostics),
    }
}

/// Map every element of `value` through `items`, preserving order.
///
/// A non-sequence value is treated as a one-element sequence. Null elements
/// stay null.
pub fn transform_array(
    value: &Value,
    items: &FieldSpec,
    field: &str,
    diagnostics: &dyn Diagnostics,
) -> Vec<Value> {
    let element_field = format!("{}[]", field);
    let transform = |element: &Value| {
        if element.is_null() {
            Value::Null
        } else {
            transform_value(element, items, &element_field, diagnostics)
        }
    };

    match value {
        Value::Array(elements) => elements.iter().map(transform).collect(),
        single => vec![transform(single)],
    }
}

/// Build a mapping from `properties`, resolving each one relative to `value`.
///
/// A non-mapping value yields an empty mapping. Absent properties take their
/// own default or null.
pub fn transform_object(
    value: &Value,
    properties: &Properties,
    field: &str,
    diagnostics: &dyn Diagnostics,
) -> Map<String, Value> {
    let mut out = Map::new();
    if !value.is_object() {
        return out;
    }

    for (name, spec) in properties.iter() {
        let nested = match resolver::resolve(value, spec.source_path(name)) {
            Some(raw) => transform_value(raw, spec, &format!("{}.{}", field, name), diagnostics),
            None => spec.fallback(),
        };
        out.insert(name.to_string(), nested);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticEvent, MemoryDiagnostics};
    use crate::schema::Format;
    use serde_json::json;

    fn id_properties() -> Properties {
        Properties::new().with("id", FieldSpec::new(FieldType::Integer))
    }

    #[test]
    fn test_array_of_scalars() {
        let sink = MemoryDiagnostics::new();
        let out = transform_array(
            &json!(["10", "20", "30"]),
            &FieldSpec::new(FieldType::Integer),
            "scores",
            &sink,
        );
        assert_eq!(out, vec![json!(10), json!(20), json!(30)]);
    }

    #[test]
    fn test_scalar_is_wrapped() {
        let sink = MemoryDiagnostics::new();
        let out = transform_array(&json!("solo"), &FieldSpec::new(FieldType::String), "tags", &sink);
        assert_eq!(out, vec![json!("solo")]);
    }

    #[test]
    fn test_array_of_objects_preserves_order() {
        let sink = MemoryDiagnostics::new();
        let items = FieldSpec::object(id_properties());
        let out = transform_array(&json!([{ "id": "1" }, { "id": "2" }]), &items, "users", &sink);
        assert_eq!(out, vec![json!({ "id": 1 }), json!({ "id": 2 })]);
    }

    #[test]
    fn test_element_failure_is_isolated() {
        let sink = MemoryDiagnostics::new();
        let items = FieldSpec::new(FieldType::Integer).with_default(json!(0));
        let out = transform_array(&json!(["1", "x", null, "3"]), &items, "n", &sink);
        assert_eq!(out, vec![json!(1), json!(0), Value::Null, json!(3)]);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field(), "n[]");
    }

    #[test]
    fn test_non_object_element_uses_item_default() {
        let sink = MemoryDiagnostics::new();
        let items = FieldSpec::object(id_properties());
        let out = transform_array(&json!([{ "id": 4 }, "junk"]), &items, "users", &sink);
        assert_eq!(out, vec![json!({ "id": 4 }), Value::Null]);
        assert!(matches!(&sink.events()[0], DiagnosticEvent::CoercionFailed { field, .. } if field == "users[]"));
    }

    #[test]
    fn test_open_object_items_pass_through() {
        let sink = MemoryDiagnostics::new();
        let out = transform_array(
            &json!([{ "any": "thing" }]),
            &FieldSpec::new(FieldType::Object),
            "blobs",
            &sink,
        );
        assert_eq!(out, vec![json!({ "any": "thing" })]);
    }

    #[test]
    fn test_object_resolves_relative_to_nested_value() {
        let sink = MemoryDiagnostics::new();
        let props = Properties::new()
            .with("id", FieldSpec::new(FieldType::Integer).with_source("user_id"))
            .with("city", FieldSpec::new(FieldType::String).with_source("address.city"))
            .with("role", FieldSpec::new(FieldType::String).with_default(json!("member")));

        let out = transform_object(
            &json!({ "user_id": "789", "address": { "city": "Oslo" } }),
            &props,
            "user",
            &sink,
        );

        assert_eq!(out.get("id"), Some(&json!(789)));
        assert_eq!(out.get("city"), Some(&json!("Oslo")));
        assert_eq!(out.get("role"), Some(&json!("member")));
    }

    #[test]
    fn test_non_mapping_object_is_empty() {
        let sink = MemoryDiagnostics::new();
        assert!(transform_object(&json!("text"), &id_properties(), "user", &sink).is_empty());
        assert!(transform_object(&json!([1]), &id_properties(), "user", &sink).is_empty());
    }

    #[test]
    fn test_nested_failure_names_full_path() {
        let sink = MemoryDiagnostics::new();
        let props = Properties::new().with(
            "born",
            FieldSpec::new(FieldType::String).with_format(Format::Date),
        );
        let out = transform_object(&json!({ "born": "not a date" }), &props, "person", &sink);
        assert_eq!(out.get("born"), Some(&Value::Null));
        assert_eq!(sink.events()[0].field(), "person.born");
    }

    #[test]
    fn test_value_with_wrong_shape_uses_field_default() {
        let sink = MemoryDiagnostics::new();
        let spec = FieldSpec::object(id_properties()).with_default(json!({ "id": 0 }));
        assert_eq!(transform_value(&json!(42), &spec, "user", &sink), json!({ "id": 0 }));
    }

    #[test]
    fn test_nested_arrays() {
        let sink = MemoryDiagnostics::new();
        let spec = FieldSpec::array(FieldSpec::array(FieldSpec::new(FieldType::Integer)));
        let out = transform_value(&json!([["1", "2"], "3"]), &spec, "grid", &sink);
        assert_eq!(out, json!([[1, 2], [3]]));
    }
}
