//! CLI command implementations
//!
//! `check` reads line-delimited JSON records from stdin, fills and validates
//! each against one schema, and answers with one JSON line per record.
//! `schemas` lists what the schema directory defines.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::i18n::{Catalog, Localizer};
use crate::observability::{Event, Logger, Severity};
use crate::schema::{Record, Schema, SchemaLoader, ValidationError};

use super::args::{Command, Mode};
use super::errors::{CliError, CliResult};
use super::io::{read_records, write_accepted, write_line, write_rejected, InputLine};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory of schema definition files (required).
    /// Relative paths resolve against the config file's directory.
    pub schema_dir: String,

    /// Minimum log severity (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Preferred locales for error messages, most preferred first
    #[serde(default)]
    pub locales: Vec<String>,

    /// Message catalog file: `{locale: {template: translation}}`
    #[serde(default)]
    pub messages: Option<String>,

    /// Whether `check` fills defaults and derived fields (default true)
    #[serde(default = "default_fill_defaults")]
    pub fill_defaults: bool,

    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_fill_defaults() -> bool {
    true
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.validate()?;

        let path_str = path.display().to_string();
        Logger::info(
            Event::ConfigLoaded,
            &[
                ("path", path_str.as_str()),
                ("schema_dir", config.schema_dir.as_str()),
            ],
        );

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.schema_dir.trim().is_empty() {
            return Err(CliError::config_error("schema_dir must not be empty"));
        }

        self.severity()?;

        if self.locales.iter().any(|l| l.trim().is_empty()) {
            return Err(CliError::config_error("locales must not contain empty entries"));
        }

        if self.messages.is_some() && self.locales.is_empty() {
            return Err(CliError::config_error(
                "messages requires at least one entry in locales",
            ));
        }

        Ok(())
    }

    /// Parsed `log_level`.
    pub fn severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse()
            .map_err(|e: String| CliError::config_error(format!("Invalid log_level: {}", e)))
    }

    pub fn schema_path(&self) -> PathBuf {
        self.resolve(&self.schema_dir)
    }

    /// Loads the message catalog, if one is configured.
    pub fn catalog(&self) -> CliResult<Option<Catalog>> {
        let Some(messages) = &self.messages else {
            return Ok(None);
        };
        let path = self.resolve(messages);
        let content = fs::read_to_string(&path).map_err(|e| {
            CliError::config_error(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let tables: HashMap<String, HashMap<String, String>> = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid messages JSON: {}", e)))?;
        Ok(Some(Catalog::from(tables)))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Per-run options for [`check_records`].
pub struct CheckOptions<'a> {
    pub mode: Mode,
    pub fill_defaults: bool,
    pub localizer: Option<&'a dyn Localizer>,
    pub locales: Vec<&'a str>,
}

impl CheckOptions<'_> {
    fn render(&self, error: &ValidationError) -> Value {
        let message = match self.localizer {
            Some(localizer) => error.localized(localizer, &self.locales),
            None => error.message(),
        };
        json!({
            "code": error.code(),
            "field": error.field(),
            "message": message,
        })
    }
}

/// Counts from one `check` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub malformed: usize,
}

impl CheckSummary {
    pub fn total(&self) -> usize {
        self.accepted + self.rejected + self.malformed
    }

    pub fn failed(&self) -> usize {
        self.rejected + self.malformed
    }
}

/// Run the CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Check {
            config,
            schema,
            mode,
        } => check(&config, &schema, mode),
        Command::Schemas { config } => schemas(&config),
    }
}

fn load_schemas(config: &Config) -> CliResult<SchemaLoader> {
    let mut loader = SchemaLoader::new(&config.schema_path());
    loader.load_all()?;
    Ok(loader)
}

/// Validates stdin records against `schema_name`.
///
/// Fails with `RecordsRejected` when any record is rejected or malformed.
pub fn check(config_path: &Path, schema_name: &str, mode: Mode) -> CliResult<()> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.severity()?);

    let loader = load_schemas(&config)?;
    let schema = loader.require(schema_name)?;
    let catalog = config.catalog()?;

    let options = CheckOptions {
        mode,
        fill_defaults: config.fill_defaults,
        localizer: catalog.as_ref().map(|c| c as &dyn Localizer),
        locales: config.locales.iter().map(String::as_str).collect(),
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let summary = check_records(schema, &options, stdin.lock(), &mut stdout)?;

    if summary.failed() > 0 {
        return Err(CliError::records_rejected(summary.failed(), summary.total()));
    }
    Ok(())
}

/// Fills and validates every record read from `reader`, one response line
/// per record on `writer`.
pub fn check_records<R: BufRead, W: Write>(
    schema: &Schema,
    options: &CheckOptions<'_>,
    reader: R,
    writer: &mut W,
) -> CliResult<CheckSummary> {
    let mut summary = CheckSummary::default();

    for item in read_records(reader) {
        let (line, input) = item?;
        let line_str = line.to_string();

        let mut record = match input {
            InputLine::Record(record) => record,
            InputLine::Malformed(reason) => {
                Logger::warn(
                    Event::RecordMalformed,
                    &[("line", line_str.as_str()), ("reason", reason.as_str())],
                );
                write_rejected(
                    writer,
                    vec![json!({
                        "code": "RECSPEC_MALFORMED_RECORD",
                        "field": null,
                        "message": reason,
                    })],
                )?;
                summary.malformed += 1;
                continue;
            }
        };

        let errors = validate_record(schema, options, &mut record);
        if errors.is_empty() {
            Logger::trace(
                Event::RecordAccepted,
                &[("line", line_str.as_str()), ("mode", options.mode.as_str())],
            );
            write_accepted(writer, &record)?;
            summary.accepted += 1;
        } else {
            let codes: Vec<&str> = errors.iter().map(ValidationError::code).collect();
            let codes = codes.join(",");
            Logger::warn(
                Event::RecordRejected,
                &[
                    ("line", line_str.as_str()),
                    ("mode", options.mode.as_str()),
                    ("codes", codes.as_str()),
                ],
            );
            let rendered = errors.iter().map(|e| options.render(e)).collect();
            write_rejected(writer, rendered)?;
            summary.rejected += 1;
        }
    }

    let accepted = summary.accepted.to_string();
    let rejected = summary.rejected.to_string();
    let malformed = summary.malformed.to_string();
    Logger::info(
        Event::CheckComplete,
        &[
            ("accepted", accepted.as_str()),
            ("rejected", rejected.as_str()),
            ("malformed", malformed.as_str()),
        ],
    );

    Ok(summary)
}

fn validate_record(schema: &Schema, options: &CheckOptions<'_>, record: &mut Record) -> Vec<ValidationError> {
    match options.mode {
        Mode::Insert => {
            if options.fill_defaults {
                schema.prepare_insert(&Record::new(), record);
            }
            schema.validate_insert(record).err().into_iter().collect()
        }
        Mode::Update => {
            if options.fill_defaults {
                schema.auto_fill_derived(record, None);
            }
            schema.validate_update_data(record).err().into_iter().collect()
        }
        Mode::Item => {
            if options.fill_defaults {
                schema.prepare_insert(&Record::new(), record);
            }
            let (_, errors) = schema.validate_item(record);
            errors
        }
    }
}

/// Lists each loaded schema with its field names.
pub fn schemas(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.severity()?);

    let loader = load_schemas(&config)?;
    let mut stdout = io::stdout();
    for name in loader.names() {
        let schema = loader.require(name)?;
        let fields: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
        let required: Vec<&str> = schema.required().iter().map(|f| f.name()).collect();
        write_line(
            &mut stdout,
            &json!({
                "schema": name,
                "fields": fields,
                "required": required,
            }),
        )?;
    }
    Ok(())
}
