//! File loaders for contact sources and override lists
//!
//! Supported formats:
//! - `.json`: an array whose elements are objects (one row each) or strings
//! - `.jsonl` / `.ndjson`: one JSON value per line, blank lines ignored
//!
//! Object keys become columns in order of first appearance. Scalar cells
//! are stringified; `null` becomes an empty cell.

use crate::error::{EngineError, EngineResult};
use crate::models::{ContactRef, ContactRemoval, RawTable};
use crate::services::standardizer::{normalize_header, ColumnMap};
use roster_common::Error;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Read one contact source
pub fn read_table(path: &Path) -> EngineResult<RawTable> {
    let values = read_values(path)?;
    let table = table_from_values(&source_name(path), &values, "name")?;
    info!(
        source = %table.source,
        rows = table.len(),
        columns = table.columns.len(),
        "Loaded source"
    );
    Ok(table)
}

/// Organization names, one per row
///
/// Object rows use their organization column, or their only column.
pub fn read_organization_list(path: &Path) -> EngineResult<Vec<String>> {
    let table = table_from_values(&source_name(path), &read_values(path)?, "organization")?;
    let columns = ColumnMap::resolve(&table.columns);
    let column = columns
        .organization
        .or(if table.columns.len() == 1 { Some(0) } else { None });

    let Some(column) = column else {
        return Err(Error::InvalidInput(format!(
            "{}: organization list has no organization column",
            table.source
        ))
        .into());
    };

    let entries: Vec<String> = (0..table.len())
        .map(|row| table.cell(row, column).trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect();
    debug!(source = %table.source, entries = entries.len(), "Loaded organization list");
    Ok(entries)
}

/// Contact removal entries (name, email, organization; any may be absent)
pub fn read_contact_removals(path: &Path) -> EngineResult<Vec<ContactRemoval>> {
    let table = table_from_values(&source_name(path), &read_values(path)?, "name")?;
    let columns = ColumnMap::resolve(&table.columns);

    let entries: Vec<ContactRemoval> = (0..table.len())
        .map(|row| ContactRemoval {
            name: row_name(&table, &columns, row),
            email: cell(&table, columns.email, row),
            organization: cell(&table, columns.organization, row),
        })
        .filter(|e| !e.name.is_empty() || e.has_email())
        .collect();
    debug!(source = %table.source, entries = entries.len(), "Loaded contact removal list");
    Ok(entries)
}

/// (Full name, organization) pairs for the exclude and inclusion lists
pub fn read_contact_refs(path: &Path) -> EngineResult<Vec<ContactRef>> {
    let table = table_from_values(&source_name(path), &read_values(path)?, "name")?;
    let columns = ColumnMap::resolve(&table.columns);

    let entries: Vec<ContactRef> = (0..table.len())
        .map(|row| {
            ContactRef::new(
                row_name(&table, &columns, row),
                cell(&table, columns.organization, row),
            )
        })
        .filter(|e| !e.name.is_empty())
        .collect();
    debug!(source = %table.source, entries = entries.len(), "Loaded contact list");
    Ok(entries)
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_values(path: &Path) -> EngineResult<Vec<Value>> {
    let text = fs::read_to_string(path).map_err(Error::from)?;
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => match serde_json::from_str::<Value>(&text).map_err(Error::from)? {
            Value::Array(values) => Ok(values),
            _ => Err(Error::InvalidInput(format!(
                "{}: expected a JSON array of rows",
                path.display()
            ))
            .into()),
        },
        "jsonl" | "ndjson" => text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str::<Value>(line).map_err(|e| EngineError::from(Error::from(e)))
            })
            .collect(),
        other => Err(Error::InvalidInput(format!(
            "{}: unsupported file type '{}' (expected .json or .jsonl)",
            path.display(),
            other
        ))
        .into()),
    }
}

/// Build a table from JSON rows
///
/// Bare scalars land in the column whose header matches `scalar_column`,
/// added when no object row supplied one.
fn table_from_values(
    source: &str,
    values: &[Value],
    scalar_column: &str,
) -> EngineResult<RawTable> {
    let mut columns: Vec<String> = Vec::new();
    let mut has_scalars = false;
    for value in values {
        match value {
            Value::Object(map) => {
                for key in map.keys() {
                    if !columns.iter().any(|c| c == key) {
                        columns.push(key.clone());
                    }
                }
            }
            Value::Array(_) => {
                return Err(Error::InvalidInput(format!(
                    "{}: nested arrays are not valid rows",
                    source
                ))
                .into())
            }
            _ => has_scalars = true,
        }
    }

    let wanted = normalize_header(scalar_column);
    let scalar_index = if has_scalars {
        match columns.iter().position(|c| normalize_header(c) == wanted) {
            Some(index) => Some(index),
            None => {
                columns.push(scalar_column.to_string());
                Some(columns.len() - 1)
            }
        }
    } else {
        None
    };

    let rows = values
        .iter()
        .map(|value| match value {
            Value::Object(map) => columns
                .iter()
                .map(|c| map.get(c).map(cell_text).unwrap_or_default())
                .collect(),
            scalar => (0..columns.len())
                .map(|i| if Some(i) == scalar_index { cell_text(scalar) } else { String::new() })
                .collect(),
        })
        .collect();

    Ok(RawTable {
        source: source.to_string(),
        columns,
        rows,
    })
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell(table: &RawTable, column: Option<usize>, row: usize) -> String {
    column
        .map(|c| table.cell(row, c).trim().to_string())
        .unwrap_or_default()
}

fn row_name(table: &RawTable, columns: &ColumnMap, row: usize) -> String {
    let name = cell(table, columns.name, row);
    if !name.is_empty() {
        return name;
    }
    let first = cell(table, columns.first_name, row);
    let last = cell(table, columns.last_name, row);
    format!("{} {}", first, last).trim().to_string()
}
