//! JSON-line I/O for the CLI
//!
//! - Input: one JSON object per line
//! - Output: one JSON object per line
//! - Blank lines are skipped
//! - UTF-8 only

use std::io::{BufRead, Write};

use serde_json::{json, Value};

use crate::schema::Record;

use super::errors::{CliError, CliResult};

/// One input line, parsed.
#[derive(Debug)]
pub enum InputLine {
    Record(Record),
    /// Not JSON, or JSON that is not an object.
    Malformed(String),
}

/// Reads the non-blank lines of `reader` as records.
///
/// Each item carries its 1-based line number.
pub fn read_records<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<(usize, InputLine)>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| match line {
            Err(e) => Some(Err(CliError::from(e))),
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(Ok((index + 1, parse_line(&line)))),
        })
}

fn parse_line(line: &str) -> InputLine {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(record)) => InputLine::Record(record),
        Ok(other) => InputLine::Malformed(format!(
            "expected a JSON object, got {}",
            crate::schema::value_type_name(&other)
        )),
        Err(e) => InputLine::Malformed(e.to_string()),
    }
}

/// Writes an accepted record.
pub fn write_accepted<W: Write>(writer: &mut W, record: &Record) -> CliResult<()> {
    write_line(
        writer,
        &json!({
            "status": "ok",
            "record": record,
        }),
    )
}

/// Writes a rejection carrying one entry per error.
pub fn write_rejected<W: Write>(writer: &mut W, errors: Vec<Value>) -> CliResult<()> {
    write_line(
        writer,
        &json!({
            "status": "error",
            "errors": errors,
        }),
    )
}

/// Writes a raw JSON value followed by a newline.
pub fn write_line<W: Write>(writer: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
