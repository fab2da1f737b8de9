// ditteau-core/src/infrastructure/rows.rs

use serde_json::{Map, Value};
use std::path::Path;

use crate::domain::error::EvaluationError;
use crate::infrastructure::error::InfrastructureError;

pub type JsonRow = Map<String, Value>;

/// One input row, or the reason it could not be read as one.
pub type RowInput = Result<JsonRow, EvaluationError>;

/// Reads input rows from a file. `.jsonl` / `.ndjson` files hold one object
/// per line; anything else is a JSON array of objects or a single object.
///
/// Only an unreadable file or a document that is not JSON at all fails the
/// read. A bad element or line becomes a per-row error in its slot.
pub fn read_rows(path: &Path) -> Result<Vec<RowInput>, InfrastructureError> {
    let content = std::fs::read_to_string(path).map_err(|source| InfrastructureError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;

    let lines = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "jsonl" || e == "ndjson");

    if lines {
        Ok(parse_json_lines(&content))
    } else {
        parse_rows(&content)
    }
}

pub fn parse_rows(content: &str) -> Result<Vec<RowInput>, InfrastructureError> {
    match serde_json::from_str::<Value>(content)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| into_object(item, i))
            .collect()),
        obj @ Value::Object(_) => Ok(vec![into_object(obj, 0)]),
        other => Err(InfrastructureError::InvalidRows(format!(
            "expected an array of objects, found {}",
            kind(&other)
        ))),
    }
}

/// Blank lines are skipped; row indices count the remaining lines.
pub fn parse_json_lines(content: &str) -> Vec<RowInput> {
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .enumerate()
        .map(|(index, (line_no, line))| match serde_json::from_str(line) {
            Ok(value) => into_object(value, index),
            Err(e) => Err(EvaluationError::MalformedRow {
                index,
                reason: format!("line {}: {}", line_no + 1, e),
            }),
        })
        .collect()
}

fn into_object(value: Value, index: usize) -> RowInput {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(EvaluationError::MalformedRow {
            index,
            reason: format!("found {}, not an object", kind(&other)),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
