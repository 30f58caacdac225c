//! Schema: an ordered collection of field specs for one record kind
//!
//! A schema fills and validates whole records:
//! - `auto_fill_*` populate defaults and derived values
//! - `validate_insert` batch-reports missing required fields, then checks
//!   present fields fail-fast
//! - `validate_update_data` checks only the fields present
//! - `validate_item` collects every failure instead of stopping
//!
//! Keys without a spec are neither validated nor rejected.
//!
//! Derived fields are filled in declaration order in a single pass. A
//! derived field that reads another derived field must be declared after
//! it; `derivation_order_violations` reports schemas that break this.

use std::collections::HashMap;

use super::errors::{ValidationError, ValidationResult};
use super::generators;
use super::spec::FieldSpec;
use super::types::{has_value, present, Record};

/// Ordered field specs with a name index. Later specs replace earlier
/// specs of the same name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    specs: Vec<FieldSpec>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(specs: impl IntoIterator<Item = FieldSpec>) -> Self {
        let mut schema = Self::default();
        for spec in specs {
            schema.insert(spec);
        }
        schema
    }

    /// Builds a schema from `specs` and then merges in `base`, whose fields
    /// win on name collisions.
    pub fn with_base(base: &Schema, specs: impl IntoIterator<Item = FieldSpec>) -> Self {
        let mut schema = Self::new(specs);
        schema.ensure_defaults(base);
        schema
    }

    /// The fields every stored record carries: `id`, `created_at`, `updated_at`.
    pub fn standard_fields() -> Self {
        Self::new(vec![
            FieldSpec::id("id", "generated unique id")
                .required()
                .with_default_fn(generators::unique_id),
            FieldSpec::timestamp("created_at", "when the record was created").required(),
            FieldSpec::timestamp("updated_at", "when the record was last updated").required(),
        ])
    }

    /// `specs` composed with [`standard_fields`](Self::standard_fields).
    pub fn standard(specs: impl IntoIterator<Item = FieldSpec>) -> Self {
        Self::with_base(&Self::standard_fields(), specs)
    }

    /// Merges `other`'s fields into this schema; `other` wins on collision.
    ///
    /// Must complete before the schema is shared across threads.
    pub fn ensure_defaults(&mut self, other: &Schema) {
        for spec in &other.specs {
            self.insert(spec.clone());
        }
    }

    fn insert(&mut self, spec: FieldSpec) {
        match self.index.get(spec.name()) {
            Some(&position) => self.specs[position] = spec,
            None => {
                self.index.insert(spec.name().to_string(), self.specs.len());
                self.specs.push(spec);
            }
        }
    }

    // Field selection

    /// All specs in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.specs
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn select<P>(&self, predicate: P) -> Vec<&FieldSpec>
    where
        P: Fn(&FieldSpec) -> bool,
    {
        self.specs.iter().filter(|spec| predicate(*spec)).collect()
    }

    pub fn required(&self) -> Vec<&FieldSpec> {
        self.select(FieldSpec::is_required)
    }

    /// Required fields narrowed by `filter`, e.g. to drop derived fields.
    pub fn required_where<P>(&self, filter: P) -> Vec<&FieldSpec>
    where
        P: Fn(&FieldSpec) -> bool,
    {
        self.select(|spec| spec.is_required() && filter(spec))
    }

    pub fn optional_fields(&self) -> Vec<&FieldSpec> {
        self.select(FieldSpec::is_optional)
    }

    pub fn optional_with_defaults(&self) -> Vec<&FieldSpec> {
        self.select(|spec| spec.is_optional() && spec.has_default())
    }

    /// Derived fields, concatenated ones included.
    pub fn derived(&self) -> Vec<&FieldSpec> {
        self.select(FieldSpec::is_derived)
    }

    pub fn unique(&self) -> Vec<&FieldSpec> {
        self.select(FieldSpec::is_unique)
    }

    pub fn special_fills(&self) -> Vec<&FieldSpec> {
        self.select(FieldSpec::has_special_fill)
    }

    // Filling

    /// Defaults for optional fields missing from `data`. `data` is not modified.
    pub fn auto_fill_optional(&self, data: &Record) -> Record {
        self.optional_with_defaults()
            .into_iter()
            .filter(|spec| !has_value(data, spec.name()))
            .filter_map(|spec| spec.default().map(|value| (spec.name().to_string(), value)))
            .collect()
    }

    /// Computes derived fields missing from both `data` and `update_target`.
    ///
    /// Values are computed against the union of the two (`data` wins) and
    /// written into `data` only.
    pub fn auto_fill_derived(&self, data: &mut Record, update_target: Option<&Record>) {
        let mut union = update_target.cloned().unwrap_or_default();
        union.extend(
            data.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        for spec in self.derived() {
            if has_value(&union, spec.name()) {
                continue;
            }
            if let Some(value) = spec.create_value(&union) {
                union.insert(spec.name().to_string(), value.clone());
                data.insert(spec.name().to_string(), value);
            }
        }
    }

    /// Writes defaults for required fields missing from `data`.
    ///
    /// Fields named in `key` are store keys and never filled.
    pub fn auto_fill_required(&self, key: &Record, data: &mut Record) {
        for spec in self.required() {
            if has_value(data, spec.name()) || has_value(key, spec.name()) {
                continue;
            }
            if let Some(value) = spec.default() {
                data.insert(spec.name().to_string(), value);
            }
        }
    }

    /// Runs special fill transformers over the fields present in `data`.
    pub fn do_special_fills(&self, data: &mut Record) {
        for spec in self.special_fills() {
            if let Some(value) = data.get_mut(spec.name()).filter(|v| !v.is_null()) {
                if let Some(filled) = spec.special_fill(value) {
                    *value = filled;
                }
            }
        }
    }

    /// Invokes external update hooks for the fields present in `data`.
    pub fn apply_external_updates(&self, key: &Record, data: &Record) {
        for spec in self.specs.iter().filter(|s| s.has_external_update()) {
            if let Some(value) = present(data.get(spec.name())) {
                spec.external_update(key, value);
            }
        }
    }

    /// Required defaults, optional defaults, special fills, then derived
    /// values, in that order.
    pub fn prepare_insert(&self, key: &Record, data: &mut Record) {
        self.auto_fill_required(key, data);
        let optional = self.auto_fill_optional(data);
        data.extend(optional);
        self.do_special_fills(data);
        self.auto_fill_derived(data, None);
    }

    /// Whether `record` carries every required field, every optional field
    /// with a default, and every derived field it could compute.
    pub fn has_everything_expected(&self, record: &Record) -> bool {
        let has = |spec: &&FieldSpec| has_value(record, spec.name());
        self.required().iter().all(has)
            && self.optional_with_defaults().iter().all(has)
            && self
                .derived()
                .iter()
                .all(|spec| spec.create_value(record).is_none())
    }

    // Validation

    fn missing_required(&self, data: &Record) -> Option<ValidationError> {
        let missing: Vec<String> = self
            .required()
            .into_iter()
            .filter(|spec| !has_value(data, spec.name()))
            .map(|spec| spec.name().to_string())
            .collect();
        if missing.is_empty() {
            None
        } else {
            Some(ValidationError::missing_required(missing))
        }
    }

    /// Errors from every known field present in `data`, in key order.
    ///
    /// Lazy: fail-fast callers stop at the first item.
    fn field_errors<'a>(&'a self, data: &'a mut Record) -> impl Iterator<Item = ValidationError> + 'a {
        let keys: Vec<String> = data.keys().cloned().collect();
        keys.into_iter().filter_map(move |key| {
            let spec = self.get_field(&key)?;
            spec.check_basic_validity(data.get_mut(&key)).err()
        })
    }

    /// Collects every failure instead of stopping at the first.
    ///
    /// Missing required fields are reported as one `MissingRequired` error.
    pub fn validate_item(&self, data: &mut Record) -> (bool, Vec<ValidationError>) {
        let mut errors: Vec<ValidationError> = self.missing_required(data).into_iter().collect();
        errors.extend(self.field_errors(data));
        (errors.is_empty(), errors)
    }

    /// Fails with all missing required names at once, then with the first
    /// invalid present value.
    pub fn validate_insert(&self, data: &mut Record) -> ValidationResult<()> {
        if let Some(err) = self.missing_required(data) {
            return Err(err);
        }
        self.validate_update_data(data)
    }

    /// Validates only the fields present; partial updates are legal.
    pub fn validate_update_data(&self, data: &mut Record) -> ValidationResult<()> {
        match self.field_errors(data).next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // Uniqueness

    /// The values in `data` of fields marked unique.
    pub fn unique_values(&self, data: &Record) -> Record {
        self.unique()
            .into_iter()
            .filter_map(|spec| {
                data.get(spec.name())
                    .map(|value| (spec.name().to_string(), value.clone()))
            })
            .collect()
    }

    /// Fails for the first field in `data_unique` whose value equals `item`'s.
    pub fn check_unique(&self, item: &Record, data_unique: &Record) -> ValidationResult<()> {
        for (field, value) in data_unique {
            if item.get(field) == Some(value) {
                return Err(ValidationError::not_unique(field, value));
            }
        }
        Ok(())
    }

    /// Pairs of (derived field, later-declared derived field it reads).
    pub fn derivation_order_violations(&self) -> Vec<(String, String)> {
        let mut violations = Vec::new();
        for (position, spec) in self.specs.iter().enumerate() {
            for dependency in spec.dependencies() {
                let later_derived = self
                    .index
                    .get(dependency)
                    .is_some_and(|&i| i > position && self.specs[i].is_derived());
                if later_derived {
                    violations.push((spec.name().to_string(), dependency.clone()));
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::ValueType;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn people() -> Schema {
        Schema::new(vec![
            FieldSpec::string("name", "").required(),
            FieldSpec::int("age", "").required(),
            FieldSpec::enum_string("role", "", ["user", "admin"]).with_default("user"),
            FieldSpec::email("email", "").unique(),
        ])
    }

    #[test]
    fn test_last_write_wins_on_construction() {
        let schema = Schema::new(vec![
            FieldSpec::int("a", ""),
            FieldSpec::string("b", ""),
            FieldSpec::string("a", "").required(),
        ]);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.fields()[0].name(), "a");
        assert_eq!(schema.get_field("a").unwrap().value_type(), ValueType::String);
        assert!(schema.get_field("a").unwrap().is_required());
    }

    #[test]
    fn test_selectors() {
        let schema = people();
        let names = |specs: Vec<&FieldSpec>| -> Vec<String> {
            specs.iter().map(|s| s.name().to_string()).collect()
        };
        assert_eq!(names(schema.required()), vec!["name", "age"]);
        assert_eq!(names(schema.optional_fields()), vec!["role", "email"]);
        assert_eq!(names(schema.optional_with_defaults()), vec!["role"]);
        assert_eq!(names(schema.unique()), vec!["email"]);
        assert!(schema.derived().is_empty());
        assert_eq!(
            names(schema.required_where(|s| s.value_type() == ValueType::Int)),
            vec!["age"]
        );
    }

    #[test]
    fn test_auto_fill_optional_does_not_mutate() {
        let schema = people();
        let data = record(json!({"name": "Al"}));
        let fills = schema.auto_fill_optional(&data);
        assert_eq!(fills, record(json!({"role": "user"})));
        assert!(!data.contains_key("role"));

        let data = record(json!({"role": "admin"}));
        assert!(schema.auto_fill_optional(&data).is_empty());
    }

    #[test]
    fn test_auto_fill_required_skips_keys() {
        let schema = Schema::standard(vec![]);
        let mut data = Record::new();
        schema.auto_fill_required(&record(json!({"id": "k1"})), &mut data);
        assert!(!data.contains_key("id"));
        assert!(data["created_at"].is_i64());
        assert!(data["updated_at"].is_i64());
    }

    #[test]
    fn test_auto_fill_derived_uses_update_target() {
        let schema = Schema::new(vec![
            FieldSpec::string("a", ""),
            FieldSpec::int("b", ""),
            FieldSpec::concatenated("key", "", ["a", "b"]),
        ]);
        let existing = record(json!({"a": "x", "b": 1}));
        let mut update = record(json!({"b": 2}));
        schema.auto_fill_derived(&mut update, Some(&existing));
        assert_eq!(update["key"], json!("x|2"));
        assert!(!existing.contains_key("key"));
    }

    #[test]
    fn test_auto_fill_derived_skips_present() {
        let schema = Schema::new(vec![FieldSpec::concatenated("key", "", ["a"])]);
        let existing = record(json!({"key": "kept"}));
        let mut update = record(json!({"a": "x"}));
        schema.auto_fill_derived(&mut update, Some(&existing));
        assert!(!update.contains_key("key"));
    }

    #[test]
    fn test_derived_chain_in_declaration_order() {
        let schema = Schema::new(vec![
            FieldSpec::concatenated("ab", "", ["a", "b"]),
            FieldSpec::concatenated("abc", "", ["ab", "c"]),
        ]);
        let mut data = record(json!({"a": 1, "b": 2, "c": 3}));
        schema.auto_fill_derived(&mut data, None);
        assert_eq!(data["abc"], json!("1|2|3"));
        assert!(schema.derivation_order_violations().is_empty());
    }

    #[test]
    fn test_derivation_order_violation_reported() {
        let schema = Schema::new(vec![
            FieldSpec::concatenated("abc", "", ["ab", "c"]),
            FieldSpec::concatenated("ab", "", ["a", "b"]),
        ]);
        assert_eq!(
            schema.derivation_order_violations(),
            vec![("abc".to_string(), "ab".to_string())]
        );

        let mut data = record(json!({"a": 1, "b": 2, "c": 3}));
        schema.auto_fill_derived(&mut data, None);
        assert!(data.contains_key("ab"));
        assert!(!data.contains_key("abc"));
    }

    #[test]
    fn test_validate_item_batches_missing() {
        let schema = people();
        let (ok, errors) = schema.validate_item(&mut Record::new());
        assert!(!ok);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].missing_fields(),
            &["name".to_string(), "age".to_string()]
        );
    }

    #[test]
    fn test_validate_item_collects_every_failure() {
        let schema = people();
        let mut data = record(json!({"name": 5, "role": "root", "email": "bad"}));
        let (ok, errors) = schema.validate_item(&mut data);
        assert!(!ok);
        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(
            codes,
            vec![
                "RECSPEC_MISSING_REQUIRED",
                "RECSPEC_TYPE",
                "RECSPEC_ENUM",
                "RECSPEC_SPECIFIC_TYPE"
            ]
        );
    }

    #[test]
    fn test_validate_item_ok() {
        let schema = people();
        let mut data = record(json!({"name": "Al", "age": 3}));
        assert_eq!(schema.validate_item(&mut data), (true, vec![]));
    }

    #[test]
    fn test_validate_insert_fail_fast_after_presence() {
        let schema = people();
        let mut data = record(json!({"name": 5, "age": "x"}));
        let err = schema.validate_insert(&mut data).unwrap_err();
        assert_eq!(err.field(), Some("name"));

        let mut data = record(json!({"age": "x"}));
        let err = schema.validate_insert(&mut data).unwrap_err();
        assert_eq!(err.missing_fields(), &["name".to_string()]);
    }

    #[test]
    fn test_validate_update_null_required_value() {
        let schema = people();
        let mut data = record(json!({"name": null, "age": 1}));
        let err = schema.validate_update_data(&mut data).unwrap_err();
        assert_eq!(err, ValidationError::required("name"));
    }

    #[test]
    fn test_validate_update_allows_partial() {
        let schema = people();
        assert!(schema
            .validate_update_data(&mut record(json!({"age": 4})))
            .is_ok());
        assert!(schema
            .validate_update_data(&mut record(json!({"age": "four"})))
            .is_err());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let schema = Schema::new(vec![FieldSpec::int("a", "").required()]);
        let mut data = record(json!({"a": 1, "z": "ignored"}));
        assert!(schema.validate_insert(&mut data).is_ok());
        assert_eq!(data["z"], json!("ignored"));
    }

    #[test]
    fn test_ensure_defaults_other_wins() {
        let mut schema = Schema::new(vec![
            FieldSpec::string("id", "caller id"),
            FieldSpec::string("name", ""),
        ]);
        schema.ensure_defaults(&Schema::standard_fields());
        let names: Vec<_> = schema.fields().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["id", "name", "created_at", "updated_at"]);
        assert_eq!(schema.get_field("id").unwrap().description(), "generated unique id");
        assert!(schema.get_field("id").unwrap().is_required());
    }

    #[test]
    fn test_standard_round_trip() {
        let schema = Schema::standard(vec![FieldSpec::string("title", "")]);
        let mut data = Record::new();
        schema.auto_fill_required(&Record::new(), &mut data);
        schema.validate_insert(&mut data).unwrap();
        assert!(data["id"].as_str().is_some_and(|s| !s.is_empty()));
        assert!(data["created_at"].is_i64());
    }

    #[test]
    fn test_prepare_insert_fills_everything() {
        let schema = Schema::new(vec![
            FieldSpec::string("name", "")
                .required()
                .with_special_fill(|v| json!(v.as_str().unwrap_or_default().to_lowercase())),
            FieldSpec::int("rank", "").required().with_default(1),
            FieldSpec::string("role", "").with_default("user"),
            FieldSpec::concatenated("key", "", ["name", "rank"]),
        ]);
        let mut data = record(json!({"name": "ALICE"}));
        schema.prepare_insert(&Record::new(), &mut data);
        assert_eq!(
            data,
            record(json!({"name": "alice", "rank": 1, "role": "user", "key": "alice|1"}))
        );
        assert!(schema.has_everything_expected(&data));
    }

    #[test]
    fn test_has_everything_expected() {
        let schema = Schema::new(vec![
            FieldSpec::string("a", "").required(),
            FieldSpec::string("b", "").with_default("x"),
            FieldSpec::concatenated("k", "", ["a"]),
        ]);
        assert!(!schema.has_everything_expected(&record(json!({"a": "1"}))));
        assert!(!schema.has_everything_expected(&record(json!({"a": "1", "b": "x"}))));
        assert!(schema.has_everything_expected(&record(json!({"a": "1", "b": "x", "k": "1"}))));
    }

    #[test]
    fn test_special_fills_only_touch_present() {
        let schema = Schema::new(vec![
            FieldSpec::string("s", "").with_special_fill(|_| json!("filled")),
        ]);
        let mut data = Record::new();
        schema.do_special_fills(&mut data);
        assert!(data.is_empty());

        let mut data = record(json!({"s": "raw"}));
        schema.do_special_fills(&mut data);
        assert_eq!(data["s"], json!("filled"));
    }

    #[test]
    fn test_apply_external_updates() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let schema = Schema::new(vec![
            FieldSpec::string("name", "").with_external_update(move |key, value| {
                sink.lock().unwrap().push((key["id"].clone(), value.clone()));
            }),
            FieldSpec::string("other", ""),
        ]);
        schema.apply_external_updates(&record(json!({"id": "k"})), &record(json!({"name": "n", "other": "o"})));
        assert_eq!(*seen.lock().unwrap(), vec![(json!("k"), json!("n"))]);
    }

    #[test]
    fn test_check_unique() {
        let schema = people();
        let existing = record(json!({"email": "a@b.io", "name": "A"}));
        let candidate = record(json!({"email": "a@b.io", "name": "B"}));
        let unique = schema.unique_values(&candidate);
        assert_eq!(unique, record(json!({"email": "a@b.io"})));

        let err = schema.check_unique(&existing, &unique).unwrap_err();
        assert_eq!(err.code(), "RECSPEC_UNIQUENESS");
        assert_eq!(err.field(), Some("email"));

        let other = record(json!({"email": "c@d.io"}));
        assert!(schema.check_unique(&other, &unique).is_ok());
    }

    #[test]
    fn test_null_required_is_filled_from_default() {
        let schema = Schema::new(vec![FieldSpec::string("name", "").required().with_default("anon")]);
        let mut data = record(json!({"name": null}));

        schema.prepare_insert(&Record::new(), &mut data);
        assert_eq!(data["name"], "anon");
        assert!(schema.validate_insert(&mut data).is_ok());
    }

    #[test]
    fn test_null_optional_is_filled_from_default() {
        let schema = people();
        let data = record(json!({"role": null}));
        assert_eq!(schema.auto_fill_optional(&data), record(json!({"role": "user"})));
    }

    #[test]
    fn test_null_counts_as_missing_required() {
        let schema = people();
        let mut data = record(json!({"name": null, "age": 3}));

        let err = schema.validate_insert(&mut data).unwrap_err();
        assert_eq!(err.missing_fields(), ["name".to_string()]);
        assert!(!schema.has_everything_expected(&data));
    }

    #[test]
    fn test_null_dependency_blocks_derivation() {
        let schema = Schema::new(vec![
            FieldSpec::string("a", ""),
            FieldSpec::string("b", ""),
            FieldSpec::concatenated("key", "", ["a", "b"]),
        ]);

        let mut data = record(json!({"a": "x", "b": null}));
        schema.auto_fill_derived(&mut data, None);
        assert!(!data.contains_key("key"));

        let target = record(json!({"b": "y"}));
        schema.auto_fill_derived(&mut data, Some(&target));
        assert_eq!(data["key"], "x|y");
    }

    #[test]
    fn test_null_derived_value_is_recomputed() {
        let schema = Schema::new(vec![
            FieldSpec::string("a", ""),
            FieldSpec::concatenated("key", "", ["a"]),
        ]);
        let mut data = record(json!({"a": "x", "key": null}));
        schema.auto_fill_derived(&mut data, None);
        assert_eq!(data["key"], "x");
    }

    #[test]
    fn test_item_and_insert_report_same_first_error() {
        let schema = Schema::new(vec![FieldSpec::int("a", ""), FieldSpec::int("b", "")]);
        let mut data = record(json!({"a": "x", "b": "y"}));

        let (ok, errors) = schema.validate_item(&mut data.clone());
        assert!(!ok);
        assert_eq!(errors.len(), 2);
        assert_eq!(schema.validate_insert(&mut data).unwrap_err(), errors[0]);
    }

    #[test]
    fn test_schema_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }
}
