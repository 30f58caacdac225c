//! Field specifications
//!
//! A [`FieldSpec`] describes one named field of a record: its expected
//! type, whether it is optional, how a missing value is defaulted, and the
//! kind-specific rules in [`FieldKind`].
//!
//! Specs are optional unless marked [`required`](FieldSpec::required).
//! Absent means a missing key or a JSON `null`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::errors::{display_value, ValidationError, ValidationResult};
use super::formats;
use super::generators;
use super::record_schema::Schema;
use super::types::{
    has_value, present, value_type_name, DefaultFn, DeriveFn, ExternalUpdateFn, FillFn, Record,
    ValidationFn, ValueType,
};

/// Separator used by concatenated fields.
pub const CONCAT_SEPARATOR: &str = "|";

/// Rules shared by string-valued kinds.
#[derive(Debug, Clone)]
pub struct StringRules {
    /// Whether `""` counts as a value.
    pub empty_allowed: bool,
    /// Extra check run after the type check.
    pub validation: Option<ValidationFn>,
}

/// How a derived field computes its value.
#[derive(Clone)]
pub enum Derivation {
    /// Applies a function to the whole record.
    Function(DeriveFn),
    /// Joins the stringified dependency values with `|`.
    Concatenate,
}

impl fmt::Debug for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Derivation::Function(_) => f.write_str("Function(..)"),
            Derivation::Concatenate => f.write_str("Concatenate"),
        }
    }
}

/// Kind-specific validity rules.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Boolean,
    Int,
    Float,
    String(StringRules),
    EnumString {
        rules: StringRules,
        legal_values: BTreeSet<String>,
    },
    List {
        empty_allowed: bool,
        element: Option<Box<FieldSpec>>,
    },
    Dict {
        sub_schema: Option<Box<Schema>>,
    },
    Derived {
        value_type: ValueType,
        fields: Vec<String>,
        derivation: Derivation,
    },
}

impl FieldKind {
    /// Runtime type a value of this kind must have.
    pub fn value_type(&self) -> ValueType {
        match self {
            FieldKind::Boolean => ValueType::Bool,
            FieldKind::Int => ValueType::Int,
            FieldKind::Float => ValueType::Float,
            FieldKind::String(_) | FieldKind::EnumString { .. } => ValueType::String,
            FieldKind::List { .. } => ValueType::List,
            FieldKind::Dict { .. } => ValueType::Dict,
            FieldKind::Derived { value_type, .. } => *value_type,
        }
    }
}

/// Contract for one named field.
#[derive(Clone)]
pub struct FieldSpec {
    name: String,
    description: String,
    optional: bool,
    unique: bool,
    default_value: Option<Value>,
    default_fn: Option<DefaultFn>,
    special_fill_fn: Option<FillFn>,
    external_update_fn: Option<ExternalUpdateFn>,
    kind: FieldKind,
}

impl FieldSpec {
    /// Creates an optional spec of the given kind.
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            optional: true,
            unique: false,
            default_value: None,
            default_fn: None,
            special_fill_fn: None,
            external_update_fn: None,
            kind,
        }
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldKind::Boolean)
    }

    pub fn int(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldKind::Int)
    }

    pub fn float(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldKind::Float)
    }

    /// String field; empty strings count as values.
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(
            name,
            description,
            FieldKind::String(StringRules {
                empty_allowed: true,
                validation: None,
            }),
        )
    }

    /// String restricted to `legal_values`; empty strings count as absent.
    pub fn enum_string<I, S>(
        name: impl Into<String>,
        description: impl Into<String>,
        legal_values: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            description,
            FieldKind::EnumString {
                rules: StringRules {
                    empty_allowed: false,
                    validation: None,
                },
                legal_values: legal_values.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// List field; empty lists count as values.
    pub fn list(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(
            name,
            description,
            FieldKind::List {
                empty_allowed: true,
                element: None,
            },
        )
    }

    pub fn dict(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldKind::Dict { sub_schema: None })
    }

    /// Field computed by `derive` once every field in `fields` is present.
    pub fn derived<I, S, F>(
        name: impl Into<String>,
        value_type: ValueType,
        description: impl Into<String>,
        fields: I,
        derive: F,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        Self::new(
            name,
            description,
            FieldKind::Derived {
                value_type,
                fields: fields.into_iter().map(Into::into).collect(),
                derivation: Derivation::Function(Arc::new(derive)),
            },
        )
    }

    /// Composite key: the values of `fields` joined with `|`.
    pub fn concatenated<I, S>(name: impl Into<String>, description: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            description,
            FieldKind::Derived {
                value_type: ValueType::String,
                fields: fields.into_iter().map(Into::into).collect(),
                derivation: Derivation::Concatenate,
            },
        )
    }

    /// Epoch-seconds field defaulting to the current time.
    pub fn timestamp(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::int(name, description).with_default_fn(generators::timestamp)
    }

    /// Identifier field; never empty.
    pub fn id(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::string(name, description).empty_allowed(false)
    }

    pub fn url(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::string(name, description)
            .empty_allowed(false)
            .with_validation(ValidationFn::new("url", formats::is_url))
    }

    pub fn email(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::string(name, description)
            .empty_allowed(false)
            .with_validation(ValidationFn::new("email", formats::is_email))
    }

    /// IANA timezone name.
    pub fn timezone(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::enum_string(name, description, formats::timezone_names())
    }

    // Builders

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks values as expected to be unique across a collection.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_default_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default_fn = Some(Arc::new(f));
        self
    }

    pub(crate) fn with_shared_default_fn(mut self, f: DefaultFn) -> Self {
        self.default_fn = Some(f);
        self
    }

    pub fn with_special_fill<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.special_fill_fn = Some(Arc::new(f));
        self
    }

    pub fn with_external_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record, &Value) + Send + Sync + 'static,
    {
        self.external_update_fn = Some(Arc::new(f));
        self
    }

    /// Sets the empty-value policy. Ignored for kinds without one.
    pub fn empty_allowed(mut self, allowed: bool) -> Self {
        match &mut self.kind {
            FieldKind::String(rules) | FieldKind::EnumString { rules, .. } => {
                rules.empty_allowed = allowed
            }
            FieldKind::List { empty_allowed, .. } => *empty_allowed = allowed,
            _ => {}
        }
        self
    }

    /// Adds a check run on string values after the type check.
    /// Ignored for non-string kinds.
    pub fn with_validation(mut self, validation: ValidationFn) -> Self {
        if let FieldKind::String(rules) | FieldKind::EnumString { rules, .. } = &mut self.kind {
            rules.validation = Some(validation);
        }
        self
    }

    /// Spec each list element must satisfy. Ignored for non-list kinds.
    pub fn with_element(mut self, element: FieldSpec) -> Self {
        if let FieldKind::List { element: slot, .. } = &mut self.kind {
            *slot = Some(Box::new(element));
        }
        self
    }

    /// Nested schema for dict values. Ignored for non-dict kinds.
    pub fn with_sub_schema(mut self, schema: Schema) -> Self {
        if let FieldKind::Dict { sub_schema } = &mut self.kind {
            *sub_schema = Some(Box::new(schema));
        }
        self
    }

    // Accessors

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn value_type(&self) -> ValueType {
        self.kind.value_type()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_required(&self) -> bool {
        !self.optional
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.kind, FieldKind::Derived { .. })
    }

    /// Fields a derived spec reads; empty for other kinds.
    pub fn dependencies(&self) -> &[String] {
        match &self.kind {
            FieldKind::Derived { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn has_special_fill(&self) -> bool {
        self.special_fill_fn.is_some()
    }

    pub fn has_external_update(&self) -> bool {
        self.external_update_fn.is_some()
    }

    // Defaults

    pub fn has_default(&self) -> bool {
        self.default_fn.is_some() || self.default_value.as_ref().is_some_and(|v| !v.is_null())
    }

    /// The literal default if set, else the result of the default function.
    pub fn default(&self) -> Option<Value> {
        if let Some(value) = self.default_value.as_ref().filter(|v| !v.is_null()) {
            return Some(value.clone());
        }
        self.default_fn.as_ref().map(|f| f())
    }

    /// Runs the special fill transformer, if any.
    pub fn special_fill(&self, value: &Value) -> Option<Value> {
        self.special_fill_fn.as_ref().map(|f| f(value))
    }

    /// Runs the external update hook, if any.
    pub fn external_update(&self, key: &Record, value: &Value) {
        if let Some(f) = &self.external_update_fn {
            f(key, value);
        }
    }

    // Checks

    /// Whether `value` counts as present for this field.
    pub fn exists(&self, value: Option<&Value>) -> bool {
        let Some(value) = present(value) else {
            return false;
        };
        match &self.kind {
            FieldKind::String(rules) | FieldKind::EnumString { rules, .. } => {
                rules.empty_allowed || !is_empty(value)
            }
            FieldKind::List { empty_allowed, .. } => *empty_allowed || !is_empty(value),
            FieldKind::Dict {
                sub_schema: Some(schema),
            } => {
                let object = value.as_object();
                schema
                    .required()
                    .iter()
                    .all(|spec| spec.exists(object.and_then(|o| o.get(spec.name()))))
            }
            _ => true,
        }
    }

    /// Fails with `Required` unless the field is optional or `value` exists.
    pub fn check_existence(&self, value: Option<&Value>) -> ValidationResult<()> {
        if self.optional || self.exists(value) {
            Ok(())
        } else {
            Err(ValidationError::required(&self.name))
        }
    }

    /// Checks the runtime type and any kind-specific value rules.
    pub fn check_type(&self, value: &Value) -> ValidationResult<()> {
        match &self.kind {
            FieldKind::String(rules) => self.check_string(value, rules),
            FieldKind::EnumString {
                rules,
                legal_values,
            } => {
                self.check_string(value, rules)?;
                match value.as_str() {
                    Some(s) if legal_values.contains(s) => Ok(()),
                    _ => Err(ValidationError::not_legal(&self.name, legal_values, value)),
                }
            }
            FieldKind::List { element, .. } => {
                let items = value.as_array().ok_or_else(|| self.type_error(value))?;
                if let Some(element) = element {
                    for (i, item) in items.iter().enumerate() {
                        if element.check_type(item).is_err() {
                            return Err(ValidationError::type_mismatch(
                                &self.name,
                                format!("list of {}", element.value_type()),
                                format!("{} at index {}", value_type_name(item), i),
                            ));
                        }
                    }
                }
                Ok(())
            }
            _ => self.check_base_type(value),
        }
    }

    /// Existence then type, skipping both when an optional field is absent.
    ///
    /// Dict fields with a sub-schema fill their nested value in place and
    /// validate it as an insert.
    pub fn check_basic_validity(&self, value: Option<&mut Value>) -> ValidationResult<()> {
        match value.filter(|v| !v.is_null()) {
            None => self.check_existence(None),
            Some(value) => {
                if let FieldKind::Dict {
                    sub_schema: Some(schema),
                } = &self.kind
                {
                    return self.check_nested(schema, value);
                }
                self.check_existence(Some(&*value))?;
                self.check_type(value)
            }
        }
    }

    /// Computes a derived value from `record`.
    ///
    /// Returns `None` when the field is already in the record, when a
    /// dependency is missing, or when this is not a derived spec.
    pub fn create_value(&self, record: &Record) -> Option<Value> {
        let FieldKind::Derived {
            fields, derivation, ..
        } = &self.kind
        else {
            return None;
        };
        if has_value(record, &self.name) {
            return None;
        }
        if !fields.iter().all(|f| has_value(record, f)) {
            return None;
        }
        Some(match derivation {
            Derivation::Function(derive) => derive(record),
            Derivation::Concatenate => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| record.get(f).map(display_value).unwrap_or_default())
                    .collect();
                Value::String(parts.join(CONCAT_SEPARATOR))
            }
        })
    }

    fn check_base_type(&self, value: &Value) -> ValidationResult<()> {
        if self.value_type().matches(value) {
            Ok(())
        } else {
            Err(self.type_error(value))
        }
    }

    fn check_string(&self, value: &Value, rules: &StringRules) -> ValidationResult<()> {
        self.check_base_type(value)?;
        if let (Some(validation), Some(s)) = (&rules.validation, value.as_str()) {
            if !validation.accepts(s) {
                return Err(ValidationError::specific_type(&self.name, validation.name(), value));
            }
        }
        Ok(())
    }

    fn check_nested(&self, schema: &Schema, value: &mut Value) -> ValidationResult<()> {
        match value {
            Value::Object(nested) => {
                schema.prepare_insert(&Record::new(), nested);
                schema
                    .validate_insert(nested)
                    .map_err(|e| e.nested_in(&self.name))
            }
            other => Err(self.type_error(other)),
        }
    }

    fn type_error(&self, value: &Value) -> ValidationError {
        ValidationError::type_mismatch(&self.name, self.value_type().type_name(), value_type_name(value))
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .field("unique", &self.unique)
            .field("default_value", &self.default_value)
            .field("default_fn", &self.default_fn.is_some())
            .field("special_fill_fn", &self.special_fill_fn.is_some())
            .field("external_update_fn", &self.external_update_fn.is_some())
            .finish()
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
