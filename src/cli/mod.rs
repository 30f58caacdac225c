//! CLI module for recspec
//!
//! Provides command-line interface for:
//! - check: fill and validate JSON-line records against a named schema
//! - schemas: list the schemas a schema directory defines

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, Mode};
pub use commands::{check, check_records, run, run_command, schemas, CheckOptions, CheckSummary, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_records, InputLine};
