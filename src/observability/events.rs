//! Observable events
//!
//! Events are explicit and typed; their names are stable log keys.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Configuration file read and validated
    ConfigLoaded,
    /// A schema definition was built and registered
    SchemaLoaded,
    /// A schema definition was refused
    SchemaRejected,
    /// A record passed validation
    RecordAccepted,
    /// A record failed validation
    RecordRejected,
    /// An input line was not a JSON object
    RecordMalformed,
    /// A check run finished
    CheckComplete,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaLoaded => "SCHEMA_LOADED",
            Event::SchemaRejected => "SCHEMA_REJECTED",
            Event::RecordAccepted => "RECORD_ACCEPTED",
            Event::RecordRejected => "RECORD_REJECTED",
            Event::RecordMalformed => "RECORD_MALFORMED",
            Event::CheckComplete => "CHECK_COMPLETE",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
