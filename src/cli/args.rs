//! CLI argument definitions using clap
//!
//! Commands:
//! - recspec check --config <path> --schema <name> [--mode insert|update|item]
//! - recspec schemas --config <path>

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// recspec - fill and validate JSON records against declared schemas
#[derive(Parser, Debug)]
#[command(name = "recspec")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate line-delimited JSON records read from stdin
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./recspec.json")]
        config: PathBuf,

        /// Name of the schema records must satisfy
        #[arg(long)]
        schema: String,

        /// How each record is treated
        #[arg(long, value_enum, default_value_t = Mode::Insert)]
        mode: Mode,
    },

    /// List the schemas found in the schema directory
    Schemas {
        /// Path to configuration file
        #[arg(long, default_value = "./recspec.json")]
        config: PathBuf,
    },
}

/// Record handling mode for `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Fill defaults and derived fields, then validate fail-fast
    Insert,
    /// Derive fields and validate only what is present
    Update,
    /// Fill like insert, then report every failure
    Item,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Insert => "insert",
            Mode::Update => "update",
            Mode::Item => "item",
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
