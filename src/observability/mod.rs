//! Observability for recspec
//!
//! Structured JSON-line logging of schema loading and record checks.
//!
//! ```ignore
//! use recspec::observability::{Event, Logger};
//!
//! Logger::info(Event::SchemaLoaded, &[("schema", "users"), ("fields", "7")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};
