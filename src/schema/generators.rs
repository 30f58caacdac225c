//! Default-value producers for standard fields
//!
//! Schema definition files cannot carry closures, so producers are
//! referenced by name and resolved here.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::types::DefaultFn;

/// Generator name for [`unique_id`].
pub const UNIQUE_ID: &str = "unique_id";
/// Generator name for [`timestamp`].
pub const TIMESTAMP: &str = "timestamp";

/// Fresh hyphenated UUID v4 string.
pub fn unique_id() -> Value {
    Value::String(Uuid::new_v4().to_string())
}

/// Current time in whole seconds since the Unix epoch.
pub fn timestamp() -> Value {
    Value::from(Utc::now().timestamp())
}

/// Resolves a generator by name.
pub fn named(name: &str) -> Option<DefaultFn> {
    match name {
        UNIQUE_ID => Some(Arc::new(unique_id)),
        TIMESTAMP => Some(Arc::new(timestamp)),
        _ => None,
    }
}
