//! End-to-end normalization tests
//!
//! Exercise schema files, batches and the registry the way a connector
//! pipeline would.

use std::path::PathBuf;
use std::sync::Arc;

use schema_normalizer::{
    DiagnosticEvent, MemoryDiagnostics, SchemaError, SchemaRegistry, SchemaTransformer,
};
use serde_json::{json, Value};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load_records(name: &str) -> Value {
    serde_json::from_str(&std::fs::read_to_string(fixture(name)).unwrap()).unwrap()
}

// =============================================================================
// Schema files
// =============================================================================

#[test]
fn test_customer_batch_from_json_schema() {
    let sink = Arc::new(MemoryDiagnostics::new());
    let transformer = SchemaTransformer::from_file(fixture("customer.schema.json"), true)
        .unwrap()
        .with_diagnostics(sink.clone());

    let out = transformer.transform(&load_records("customers.json")).unwrap();

    assert_eq!(
        out,
        json!([
            {
                "customer_id": 101,
                "full_name": "Ada Lovelace",
                "email": "ada@example.com",
                "signed_up": "2023-04-01",
                "last_seen": "2024-06-30T08:15:00+00:00",
                "active": true,
                "tier": "standard",
                "tags": ["vip", "newsletter"],
                "address": { "city": "London", "postcode": "12345", "country": "NO" }
            },
            {
                "customer_id": 102,
                "full_name": "Grace Hopper",
                "email": "grace@example.com",
                "signed_up": null,
                "last_seen": null,
                "active": false,
                "tier": "gold",
                "tags": ["single"],
                "address": null
            }
        ])
    );

    let failed: Vec<String> = sink.events().iter().map(|e| e.field().to_string()).collect();
    assert_eq!(failed, vec!["signed_up", "address"]);
}

#[test]
fn test_order_schema_from_yaml() {
    let transformer = SchemaTransformer::from_file(fixture("order.yaml"), false).unwrap();
    assert_eq!(transformer.schema().title.as_deref(), Some("Order"));
    assert_eq!(transformer.required_fields(), ["order_id".to_string()]);

    let out = transformer
        .transform(&json!({
            "id": "9001",
            "amount": { "value": "19.90" },
            "items": [
                { "sku": "A-1", "qty": "2" },
                { "sku": "B-7" }
            ]
        }))
        .unwrap();

    assert_eq!(
        out,
        json!({
            "order_id": 9001,
            "total": 19.9,
            "currency": "EUR",
            "lines": [
                { "sku": "A-1", "quantity": 2 },
                { "sku": "B-7", "quantity": 1 }
            ]
        })
    );
}

#[test]
fn test_missing_schema_file() {
    let err = SchemaTransformer::from_file(fixture("does-not-exist.json"), false).unwrap_err();
    assert!(matches!(err, SchemaError::FileNotFound { .. }));
}

#[test]
fn test_malformed_schema_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ \"properties\": ").unwrap();

    let err = SchemaTransformer::from_file(&path, false).unwrap_err();
    assert!(matches!(err, SchemaError::Json(_)));
}

// =============================================================================
// Behavioural properties
// =============================================================================

#[test]
fn test_missing_data_never_fails_without_required() {
    let transformer = SchemaTransformer::from_value(
        json!({
            "properties": {
                "a": { "type": "integer" },
                "b": { "type": "array", "items": { "type": "object", "properties": { "x": {} } } },
                "c": { "type": "object", "properties": { "y": { "type": "boolean" } } },
                "d": { "type": "string", "format": "date-time", "source": "deep.er.path" }
            }
        }),
        true,
    )
    .unwrap();

    for record in [json!({}), json!({ "deep": 1 }), json!({ "a": null, "c": null })] {
        let out = transformer.transform(&record).unwrap();
        assert_eq!(out, json!({ "a": null, "b": null, "c": null, "d": null }));
    }
}

#[test]
fn test_dotted_path_integer() {
    let transformer = SchemaTransformer::from_value(
        json!({ "properties": { "value": { "type": "integer", "source": "a.b.c" } } }),
        false,
    )
    .unwrap();

    assert_eq!(
        transformer.transform(&json!({ "a": { "b": { "c": 5 } } })).unwrap(),
        json!({ "value": 5 })
    );
    assert_eq!(
        transformer.transform(&json!({ "a": {} })).unwrap(),
        json!({ "value": null })
    );
}

#[test]
fn test_array_of_objects_field() {
    let transformer = SchemaTransformer::from_value(
        json!({
            "properties": {
                "items": {
                    "type": "array",
                    "items": { "type": "object", "properties": { "id": { "type": "integer" } } }
                }
            }
        }),
        false,
    )
    .unwrap();

    let out = transformer
        .transform(&json!({ "items": [{ "id": "1" }, { "id": "2" }] }))
        .unwrap();
    assert_eq!(out, json!({ "items": [{ "id": 1 }, { "id": 2 }] }));
}

#[test]
fn test_strict_failure_names_field() {
    let schema = json!({ "properties": { "id": { "type": "integer" } }, "required": ["id"] });

    let strict = SchemaTransformer::from_value(schema.clone(), true).unwrap();
    match strict.transform(&json!({})) {
        Err(SchemaError::Validation { field }) => assert_eq!(field, "id"),
        other => panic!("Expected validation failure, got {:?}", other),
    }

    let lenient = SchemaTransformer::from_value(schema, false).unwrap();
    assert_eq!(lenient.transform(&json!({})).unwrap(), json!({ "id": null }));
}

#[test]
fn test_defaults_are_independent_per_record() {
    let transformer = SchemaTransformer::from_value(
        json!({
            "properties": {
                "status": { "type": "string", "default": "pending" },
                "labels": { "type": "array", "default": ["new"] },
                "meta": { "type": "object", "properties": { "k": {} }, "default": { "k": "v" } }
            }
        }),
        false,
    )
    .unwrap();

    let mut out = transformer.transform(&json!([{}, {}, {}])).unwrap();
    let records = out.as_array_mut().unwrap();

    // mutate the first record's defaults; the others must not change
    records[0]["labels"].as_array_mut().unwrap().push(json!("touched"));
    records[0]["meta"]["k"] = json!("changed");

    for record in &records[1..] {
        assert_eq!(record["status"], json!("pending"));
        assert_eq!(record["labels"], json!(["new"]));
        assert_eq!(record["meta"], json!({ "k": "v" }));
    }

    // and the schema itself is untouched for the next call
    let again = transformer.transform(&json!({})).unwrap();
    assert_eq!(again["labels"], json!(["new"]));
}

#[test]
fn test_identity_schema_is_idempotent() {
    let transformer = SchemaTransformer::from_file(fixture("customer.schema.json"), false).unwrap();
    let first = transformer.transform(&load_records("customers.json")).unwrap();

    let identity = SchemaTransformer::from_value(
        json!({
            "properties": {
                "customer_id": { "type": "integer" },
                "full_name": { "type": "string" },
                "email": { "type": "string", "format": "email" },
                "signed_up": { "type": "string", "format": "date" },
                "last_seen": { "type": "string", "format": "date-time" },
                "active": { "type": "boolean" },
                "tier": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "address": {
                    "type": "object",
                    "properties": {
                        "city": { "type": "string" },
                        "postcode": { "type": "string" },
                        "country": { "type": "string" }
                    }
                }
            }
        }),
        false,
    )
    .unwrap();

    let second = identity.transform(&first).unwrap();
    let third = identity.transform(&second).unwrap();
    assert_eq!(second, first);
    assert_eq!(third, second);
}

#[test]
fn test_concurrent_transforms_share_one_instance() {
    let transformer = Arc::new(
        SchemaTransformer::from_value(
            json!({ "properties": { "n": { "type": "integer" } } }),
            false,
        )
        .unwrap(),
    );
    transformer.add_custom_transformer("n", |v| json!(v.as_i64().unwrap_or_default() * 2));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let transformer = Arc::clone(&transformer);
            std::thread::spawn(move || transformer.transform(&json!({ "n": i })).unwrap())
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), json!({ "n": i * 2 }));
    }
}

// =============================================================================
// Registry
// =============================================================================

#[test]
fn test_registry_multi_source() {
    let sink = Arc::new(MemoryDiagnostics::new());
    let mut registry = SchemaRegistry::new().with_diagnostics(sink.clone());

    registry
        .register(
            "postgres_users",
            json!({
                "properties": {
                    "user_id": { "type": "integer", "source": "id" },
                    "is_active": { "type": "boolean", "source": "active" }
                }
            }),
        )
        .unwrap();
    registry
        .register(
            "mysql_users",
            json!({
                "properties": {
                    "user_id": { "type": "integer" },
                    "is_active": { "type": "boolean", "source": "status" }
                }
            }),
        )
        .unwrap();
    registry.register("orders", fixture("order.yaml")).unwrap();

    assert_eq!(registry.list_schemas(), vec!["mysql_users", "orders", "postgres_users"]);

    let pg = registry
        .transform("postgres_users", &json!([{ "id": 1, "active": true }]))
        .unwrap();
    let my = registry
        .transform("mysql_users", &json!([{ "user_id": "1", "status": 1 }]))
        .unwrap();
    assert_eq!(pg, my);

    registry
        .transform("mysql_users", &json!({ "user_id": "one" }))
        .unwrap();
    assert!(matches!(
        sink.events().as_slice(),
        [DiagnosticEvent::CoercionFailed { field, .. }] if field == "user_id"
    ));

    assert!(matches!(
        registry.transform("unknown", &json!({})),
        Err(SchemaError::NotFound { .. })
    ));
}
