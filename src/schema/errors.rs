//! Error types for field validation and schema loading
//!
//! Validation error codes:
//! - RECSPEC_REQUIRED: a required field has no value
//! - RECSPEC_TYPE: a value has the wrong runtime type
//! - RECSPEC_SPECIFIC_TYPE: a value failed a custom validation function
//! - RECSPEC_ENUM: a value is not among the legal values
//! - RECSPEC_MISSING_REQUIRED: one or more required fields absent from a record
//! - RECSPEC_UNIQUENESS: a value collides with an existing unique value
//!
//! None of these are transient. They describe defects in the input record.

use std::io;

use serde_json::Value;
use thiserror::Error;

use crate::i18n::{render_template, Localizer};

/// Enum errors list at most this many legal values in their message.
const LEGAL_VALUES_SHOWN: usize = 10;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for schema definition and loading operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A record or field failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("field {field} is required")]
    Required { field: String },

    #[error("field {field} must be of type {expected} not {actual}")]
    Type {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("could not validate field {field} with {validator}: {value}")]
    SpecificType {
        field: String,
        validator: String,
        value: String,
    },

    #[error("enum field {field} must be one of {legal} not {value}", legal = summarize_legal(.legal_values))]
    Enum {
        field: String,
        legal_values: Vec<String>,
        value: String,
    },

    #[error("missing required values: {joined}", joined = .fields.join(", "))]
    MissingRequired { fields: Vec<String> },

    #[error("field {field} has non-unique value {value}")]
    Uniqueness { field: String, value: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        Self::Required {
            field: field.into(),
        }
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Type {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn specific_type(field: impl Into<String>, validator: impl Into<String>, value: &Value) -> Self {
        Self::SpecificType {
            field: field.into(),
            validator: validator.into(),
            value: display_value(value),
        }
    }

    pub fn not_legal<'a, I>(field: impl Into<String>, legal_values: I, value: &Value) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        Self::Enum {
            field: field.into(),
            legal_values: legal_values.into_iter().cloned().collect(),
            value: display_value(value),
        }
    }

    pub fn missing_required(fields: Vec<String>) -> Self {
        Self::MissingRequired { fields }
    }

    pub fn not_unique(field: impl Into<String>, value: &Value) -> Self {
        Self::Uniqueness {
            field: field.into(),
            value: display_value(value),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Required { .. } => "RECSPEC_REQUIRED",
            Self::Type { .. } => "RECSPEC_TYPE",
            Self::SpecificType { .. } => "RECSPEC_SPECIFIC_TYPE",
            Self::Enum { .. } => "RECSPEC_ENUM",
            Self::MissingRequired { .. } => "RECSPEC_MISSING_REQUIRED",
            Self::Uniqueness { .. } => "RECSPEC_UNIQUENESS",
        }
    }

    /// Returns the offending field, or `None` for errors naming several fields.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Required { field }
            | Self::Type { field, .. }
            | Self::SpecificType { field, .. }
            | Self::Enum { field, .. }
            | Self::Uniqueness { field, .. } => Some(field),
            Self::MissingRequired { .. } => None,
        }
    }

    /// Returns the names reported by a `MissingRequired` error.
    pub fn missing_fields(&self) -> &[String] {
        match self {
            Self::MissingRequired { fields } => fields,
            _ => &[],
        }
    }

    /// Qualifies every field name with the enclosing dict field.
    pub fn nested_in(self, parent: &str) -> Self {
        let qualify = |name: String| format!("{}.{}", parent, name);
        match self {
            Self::Required { field } => Self::Required {
                field: qualify(field),
            },
            Self::Type {
                field,
                expected,
                actual,
            } => Self::Type {
                field: qualify(field),
                expected,
                actual,
            },
            Self::SpecificType {
                field,
                validator,
                value,
            } => Self::SpecificType {
                field: qualify(field),
                validator,
                value,
            },
            Self::Enum {
                field,
                legal_values,
                value,
            } => Self::Enum {
                field: qualify(field),
                legal_values,
                value,
            },
            Self::MissingRequired { fields } => Self::MissingRequired {
                fields: fields.into_iter().map(qualify).collect(),
            },
            Self::Uniqueness { field, value } => Self::Uniqueness {
                field: qualify(field),
                value,
            },
        }
    }

    /// Returns the untranslated message template.
    pub fn template(&self) -> &'static str {
        match self {
            Self::Required { .. } => "field %{field} is required",
            Self::Type { .. } => "field %{field} must be of type %{expected} not %{actual}",
            Self::SpecificType { .. } => "could not validate field %{field} with %{validator}: %{value}",
            Self::Enum { .. } => "enum field %{field} must be one of %{legal_values} not %{value}",
            Self::MissingRequired { .. } => "missing required values: %{fields}",
            Self::Uniqueness { .. } => "field %{field} has non-unique value %{value}",
        }
    }

    /// Returns the parameters interpolated into [`template`](Self::template).
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Required { field } => vec![("field", field.clone())],
            Self::Type {
                field,
                expected,
                actual,
            } => vec![
                ("field", field.clone()),
                ("expected", expected.clone()),
                ("actual", actual.clone()),
            ],
            Self::SpecificType {
                field,
                validator,
                value,
            } => vec![
                ("field", field.clone()),
                ("validator", validator.clone()),
                ("value", value.clone()),
            ],
            Self::Enum {
                field,
                legal_values,
                value,
            } => vec![
                ("field", field.clone()),
                ("legal_values", summarize_legal(legal_values)),
                ("value", value.clone()),
            ],
            Self::MissingRequired { fields } => vec![("fields", fields.join(", "))],
            Self::Uniqueness { field, value } => {
                vec![("field", field.clone()), ("value", value.clone())]
            }
        }
    }

    /// Renders the message with literal parameter substitution.
    pub fn message(&self) -> String {
        render_template(self.template(), &self.params())
    }

    /// Renders the message through a localizer.
    pub fn localized(&self, localizer: &dyn Localizer, desired_locales: &[&str]) -> String {
        localizer.localized_message(self.template(), desired_locales, &self.params())
    }
}

/// Renders a value for messages: strings unquoted, everything else as JSON.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn summarize_legal(legal_values: &[String]) -> String {
    if legal_values.len() <= LEGAL_VALUES_SHOWN {
        return legal_values.join(", ");
    }
    format!(
        "{}, ... ({} total)",
        legal_values[..LEGAL_VALUES_SHOWN].join(", "),
        legal_values.len()
    )
}

/// A schema definition could not be built or loaded.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema source '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed schema definition '{path}': {reason}")]
    Malformed { path: String, reason: String },

    #[error("field '{field}' refers to unknown generator '{generator}'")]
    UnknownGenerator { field: String, generator: String },

    #[error("derived field '{field}' depends on derived field '{depends_on}' declared after it")]
    DerivationOrder { field: String, depends_on: String },

    #[error("schema '{name}' is already registered")]
    DuplicateSchema { name: String },

    #[error("schema '{name}' not found")]
    UnknownSchema { name: String },
}

impl SchemaError {
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "RECSPEC_SCHEMA_IO",
            Self::Malformed { .. } => "RECSPEC_SCHEMA_MALFORMED",
            Self::UnknownGenerator { .. } => "RECSPEC_UNKNOWN_GENERATOR",
            Self::DerivationOrder { .. } => "RECSPEC_DERIVATION_ORDER",
            Self::DuplicateSchema { .. } => "RECSPEC_DUPLICATE_SCHEMA",
            Self::UnknownSchema { .. } => "RECSPEC_UNKNOWN_SCHEMA",
        }
    }
}
