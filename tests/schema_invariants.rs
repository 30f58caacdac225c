//! Schema Invariant Tests
//!
//! End-to-end behavior of field specs and schemas over JSON records:
//! - Required fields must exist; optional absent fields always pass
//! - Insert and update validation are fail-fast
//! - Item validation reports every failure
//! - Defaults and derived values are filled before validation
//! - Unknown keys are ignored and left in place

use recspec::schema::{
    generators, FieldSpec, Record, Schema, ValidationError, ValidationFn, ValueType,
};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

fn people() -> Schema {
    Schema::new(vec![
        FieldSpec::string("name", "display name").required(),
        FieldSpec::int("age", "age in years").required(),
    ])
}

// =============================================================================
// Existence Tests
// =============================================================================

/// A required spec without a default rejects absence and accepts a value.
#[test]
fn test_required_without_default() {
    let specs = [
        FieldSpec::string("s", "").required(),
        FieldSpec::int("i", "").required(),
        FieldSpec::list("l", "").required(),
        FieldSpec::boolean("b", "").required(),
    ];
    let values = [json!("x"), json!(3), json!([1]), json!(false)];

    for (spec, value) in specs.iter().zip(values.iter()) {
        assert!(matches!(
            spec.check_existence(None),
            Err(ValidationError::Required { .. })
        ));
        assert!(spec.check_existence(Some(value)).is_ok());
    }
}

/// Optional fields pass basic validity when absent, whatever their type.
#[test]
fn test_optional_absent_always_valid() {
    let specs = [
        FieldSpec::string("s", ""),
        FieldSpec::int("i", ""),
        FieldSpec::float("f", ""),
        FieldSpec::list("l", ""),
        FieldSpec::dict("d", ""),
        FieldSpec::enum_string("e", "", ["a"]),
    ];

    for spec in &specs {
        assert!(spec.check_basic_validity(None).is_ok(), "{}", spec.name());
        let mut null = Value::Null;
        assert!(spec.check_basic_validity(Some(&mut null)).is_ok(), "{}", spec.name());
    }
}

/// Empty strings do not exist unless empties are allowed.
#[test]
fn test_empty_string_policy() {
    let strict = FieldSpec::string("s", "").empty_allowed(false);
    assert!(!strict.exists(Some(&json!(""))));
    assert!(strict.exists(Some(&json!("x"))));

    let lenient = FieldSpec::string("s", "");
    assert!(lenient.exists(Some(&json!(""))));
}

// =============================================================================
// Type Tests
// =============================================================================

/// Enum values outside the legal set are rejected with the legal set named.
#[test]
fn test_enum_legal_values() {
    let spec = FieldSpec::enum_string("grade", "", ["a", "b"]);
    assert!(spec.check_type(&json!("a")).is_ok());

    match spec.check_type(&json!("c")) {
        Err(ValidationError::Enum {
            field,
            legal_values,
            value,
        }) => {
            assert_eq!(field, "grade");
            assert_eq!(legal_values, vec!["a".to_string(), "b".to_string()]);
            assert_eq!(value, "c");
        }
        other => panic!("unexpected {:?}", other),
    }
}

/// A failing custom validation surfaces as SpecificType.
#[test]
fn test_custom_validation() {
    let spec = FieldSpec::string("code", "")
        .with_validation(ValidationFn::new("three_chars", |s| s.chars().count() == 3));

    assert!(spec.check_type(&json!("abc")).is_ok());
    let err = spec.check_type(&json!("abcd")).unwrap_err();
    assert_eq!(err.code(), "RECSPEC_SPECIFIC_TYPE");
    assert!(err.to_string().contains("three_chars"));
}

/// Specialized string kinds validate their format.
#[test]
fn test_format_kinds() {
    let url = FieldSpec::url("homepage", "");
    assert!(url.check_type(&json!("https://example.com/a")).is_ok());
    assert!(url.check_type(&json!("not a url")).is_err());

    let email = FieldSpec::email("contact", "");
    assert!(email.check_type(&json!("ada@example.com")).is_ok());
    assert!(email.check_type(&json!("ada@")).is_err());

    let zone = FieldSpec::timezone("tz", "");
    assert!(zone.check_type(&json!("Europe/Paris")).is_ok());
    assert!(zone.check_type(&json!("Mars/Olympus")).is_err());
}

// =============================================================================
// Fill Tests
// =============================================================================

/// Generated id and timestamp are filled into an empty record and validate.
#[test]
fn test_generated_fields_round_trip() {
    let schema = Schema::new(vec![
        FieldSpec::id("id", "")
            .required()
            .with_default_fn(generators::unique_id),
        FieldSpec::timestamp("created_at", "").required(),
    ]);

    let mut data = Record::new();
    schema.auto_fill_required(&Record::new(), &mut data);
    schema.validate_insert(&mut data).unwrap();

    assert!(data.get("id").is_some_and(|v| v.is_string()));
    assert!(data.get("created_at").is_some_and(|v| v.is_i64()));
}

/// Two generated ids differ.
#[test]
fn test_generated_ids_differ() {
    let schema = Schema::standard(Vec::new());
    let mut first = Record::new();
    let mut second = Record::new();
    schema.prepare_insert(&Record::new(), &mut first);
    schema.prepare_insert(&Record::new(), &mut second);

    assert_ne!(first["id"], second["id"]);
    assert!(schema.has_everything_expected(&first));
}

/// Concatenation joins dependency values with '|'.
#[test]
fn test_concatenated_value() {
    let spec = FieldSpec::concatenated("key", "", ["a", "b"]);
    let data = record(json!({ "a": "x", "b": 1 }));

    assert_eq!(spec.create_value(&data), Some(json!("x|1")));
    assert_eq!(spec.value_type(), ValueType::String);
}

/// Derived values are computed from the update target when data lacks the
/// dependencies, and chains resolve in declaration order.
#[test]
fn test_derived_chain_with_update_target() {
    let schema = Schema::new(vec![
        FieldSpec::string("first", ""),
        FieldSpec::string("last", ""),
        FieldSpec::concatenated("full", "", ["first", "last"]),
        FieldSpec::derived("shout", ValueType::String, "", ["full"], |r| {
            json!(r["full"].as_str().unwrap_or_default().to_uppercase())
        }),
    ]);
    assert!(schema.derivation_order_violations().is_empty());

    let target = record(json!({ "first": "ada", "last": "lovelace" }));
    let mut data = record(json!({ "first": "grace" }));
    schema.auto_fill_derived(&mut data, Some(&target));

    assert_eq!(data["full"], "grace|lovelace");
    assert_eq!(data["shout"], "GRACE|LOVELACE");
    assert!(!data.contains_key("last"));
}

/// A null value is filled like a missing one and never feeds a derivation.
#[test]
fn test_null_treated_as_absent() {
    let schema = Schema::new(vec![
        FieldSpec::string("name", "").required().with_default("anon"),
        FieldSpec::string("team", ""),
        FieldSpec::concatenated("key", "", ["name", "team"]),
    ]);

    let mut data = record(json!({ "name": null, "team": null }));
    schema.prepare_insert(&Record::new(), &mut data);
    schema.validate_insert(&mut data).unwrap();

    assert_eq!(data["name"], "anon");
    assert!(!data.contains_key("key"));
}

// =============================================================================
// Validation Tests
// =============================================================================

/// Batch validation names every missing field in one error.
#[test]
fn test_batch_missing_required() {
    let mut data = Record::new();
    let (ok, errors) = people().validate_item(&mut data);

    assert!(!ok);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].missing_fields(), ["name".to_string(), "age".to_string()]);
}

/// Batch validation also reports bad values alongside missing fields.
#[test]
fn test_batch_collects_type_errors() {
    let mut data = record(json!({ "name": 7 }));
    let (ok, errors) = people().validate_item(&mut data);

    assert!(!ok);
    let codes: Vec<&str> = errors.iter().map(ValidationError::code).collect();
    assert_eq!(codes, vec!["RECSPEC_MISSING_REQUIRED", "RECSPEC_TYPE"]);
}

/// Insert validation stops at the first failure.
#[test]
fn test_insert_is_fail_fast() {
    let schema = Schema::new(vec![FieldSpec::int("a", ""), FieldSpec::int("b", "")]);
    let mut data = record(json!({ "a": "x", "b": "y" }));

    let err = schema.validate_insert(&mut data).unwrap_err();
    assert_eq!(err.field(), Some("a"));
}

/// Update validation does not require absent fields.
#[test]
fn test_update_allows_partial_data() {
    let mut data = record(json!({ "age": 40 }));
    assert!(people().validate_update_data(&mut data).is_ok());
    assert!(people().validate_insert(&mut data).is_err());
}

/// A nested dict missing a sub-schema required field fails after fill.
#[test]
fn test_nested_dict_missing_field() {
    let sub = Schema::new(vec![
        FieldSpec::int("x", "").required(),
        FieldSpec::int("y", "").with_default(0),
    ]);
    let spec = FieldSpec::dict("point", "").required().with_sub_schema(sub);

    let mut empty = json!({});
    let err = spec.check_basic_validity(Some(&mut empty)).unwrap_err();
    assert!(matches!(err, ValidationError::MissingRequired { .. }));
    assert_eq!(err.missing_fields(), ["point.x".to_string()]);
    assert_eq!(empty, json!({ "y": 0 }));

    let mut full = json!({ "x": 1 });
    assert!(spec.check_basic_validity(Some(&mut full)).is_ok());
}

/// Unknown keys are ignored and preserved.
#[test]
fn test_unknown_keys_untouched() {
    let schema = Schema::new(vec![FieldSpec::int("a", "")]);
    let mut data = record(json!({ "a": 1, "z": "ignored" }));

    schema.validate_insert(&mut data).unwrap();
    assert_eq!(data["z"], "ignored");
}

/// List elements are checked against the element spec.
#[test]
fn test_list_element_types() {
    let spec = FieldSpec::list("scores", "").with_element(FieldSpec::int("score", ""));

    assert!(spec.check_type(&json!([1, 2, 3])).is_ok());
    match spec.check_type(&json!([1, "two"])) {
        Err(ValidationError::Type {
            expected, actual, ..
        }) => {
            assert_eq!(expected, "list of int");
            assert_eq!(actual, "string at index 1");
        }
        other => panic!("unexpected {:?}", other),
    }
}

// =============================================================================
// Uniqueness Tests
// =============================================================================

/// Unique values are extracted and compared against an existing record.
#[test]
fn test_unique_collision() {
    let schema = Schema::new(vec![
        FieldSpec::string("email", "").unique(),
        FieldSpec::string("name", ""),
    ]);
    let incoming = record(json!({ "email": "a@b.c", "name": "a" }));
    let existing = record(json!({ "email": "a@b.c", "name": "b" }));

    let unique = schema.unique_values(&incoming);
    assert_eq!(unique.len(), 1);

    let err = schema.check_unique(&existing, &unique).unwrap_err();
    assert!(matches!(err, ValidationError::Uniqueness { .. }));

    let other = record(json!({ "email": "x@y.z" }));
    assert!(schema.check_unique(&other, &unique).is_ok());
}
