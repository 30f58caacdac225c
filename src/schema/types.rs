//! Value type tags and hook signatures shared by field specifications
//!
//! Supported types:
//! - string: UTF-8 string
//! - int: 64-bit integer (signed or unsigned)
//! - float: any JSON number
//! - bool: Boolean
//! - list: JSON array
//! - dict: JSON object

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A candidate record: field name to value.
pub type Record = Map<String, Value>;

/// Runtime type tag a field value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
    List,
    Dict,
}

impl ValueType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::List => "list",
            ValueType::Dict => "dict",
        }
    }

    /// Whether `value` has this runtime type.
    ///
    /// Integers are accepted where a float is expected.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Int => value.is_i64() || value.is_u64(),
            ValueType::Float => value.is_number(),
            ValueType::Bool => value.is_boolean(),
            ValueType::List => value.is_array(),
            ValueType::Dict => value.is_object(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Returns the JSON type name of a value for error messages.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Treats a JSON `null` the same as a missing key.
pub(crate) fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Whether `record` carries a non-null value under `name`.
pub(crate) fn has_value(record: &Record, name: &str) -> bool {
    present(record.get(name)).is_some()
}

/// Niladic producer of a default value.
pub type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Transformer applied to a present value before storage.
pub type FillFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Side-effect hook receiving the record key and the field's value.
pub type ExternalUpdateFn = Arc<dyn Fn(&Record, &Value) + Send + Sync>;

/// Computes a derived value from the whole record.
pub type DeriveFn = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// Named predicate run on a string value after its type check.
///
/// The name appears in the error raised when the predicate rejects a value.
#[derive(Clone)]
pub struct ValidationFn {
    name: String,
    check: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl ValidationFn {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accepts(&self, value: &str) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for ValidationFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValidationFn").field(&self.name).finish()
    }
}
