//! recspec - declarative field specifications for record-like JSON data
//!
//! Schemas fill defaults, compute derived fields, and validate records
//! before they reach a store.

pub mod cli;
pub mod i18n;
pub mod observability;
pub mod schema;
