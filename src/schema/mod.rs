//! Declarative record schemas
//!
//! A [`FieldSpec`] describes one field: its type, whether it is required,
//! how a default is produced, and how it is derived from other fields.
//! A [`Schema`] is an ordered set of specs that fills defaults and derived
//! values into records and validates them before insert or update.
//!
//! Validation is fail-fast for inserts and updates. [`Schema::validate_item`]
//! collects every failure instead.

mod errors;
mod formats;
pub mod generators;
mod loader;
mod record_schema;
mod spec;
mod types;

pub use errors::{SchemaError, SchemaResult, ValidationError, ValidationResult};
pub use formats::{is_email, is_url, timezone_names};
pub use loader::{FieldDef, KindDef, SchemaDef, SchemaLoader};
pub use record_schema::Schema;
pub use spec::{Derivation, FieldKind, FieldSpec, StringRules, CONCAT_SEPARATOR};
pub use types::{
    value_type_name, DefaultFn, DeriveFn, ExternalUpdateFn, FillFn, Record, ValidationFn,
    ValueType,
};
