//! JSON I/O handling for CLI
//!
//! - Input: a JSON data file holding `{id: document}`
//! - Output: one JSON value per line on stdout
//! - Errors: a single JSON envelope on stdout
//! - UTF-8 only

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read the documents of a data file as `(id, document)` pairs
pub fn read_documents(path: &Path) -> CliResult<Vec<(String, Value)>> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))?;

    let value: Value = serde_json::from_str(&content)
        .map_err(|e| CliError::invalid_input(format!("Invalid data JSON: {}", e)))?;

    match value {
        Value::Object(documents) => Ok(documents.into_iter().collect()),
        _ => Err(CliError::invalid_input(
            "Data file must hold a JSON object of {id: document}",
        )),
    }
}

/// Parse a filter argument into JSON
pub fn parse_filter(raw: Option<&str>) -> CliResult<Value> {
    match raw {
        None => Ok(Value::Object(Default::default())),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| CliError::invalid_input(format!("Invalid filter JSON: {}", e))),
    }
}

/// Write one JSON value as a line
pub fn write_line<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    write_line(&mut stdout, &response)?;
    stdout.flush()?;

    Ok(())
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });

    let mut stdout = io::stdout();
    write_line(&mut stdout, &response)?;
    stdout.flush()?;

    Ok(())
}
