//! Fixture builders for contact sources

use roster_engine::models::RawTable;
use std::path::{Path, PathBuf};

const COLUMNS: [&str; 4] = ["Name", "Organization", "Job Title", "Email"];
const COLUMNS_WITH_ROLE: [&str; 5] = ["Name", "Organization", "Job Title", "Email", "Role"];

/// Source with Name / Organization / Job Title / Email columns
///
/// Rows are `(name, organization, title, email)`.
pub fn table(source: &str, rows: &[(&str, &str, &str, &str)]) -> RawTable {
    let columns = COLUMNS.iter().map(|c| c.to_string()).collect();
    rows.iter().fold(RawTable::new(source, columns), |t, (n, o, j, e)| {
        t.with_row(&[*n, *o, *j, *e])
    })
}

/// Source that also carries a Role column
///
/// Rows are `(name, organization, title, email, role)`.
pub fn table_with_roles(source: &str, rows: &[(&str, &str, &str, &str, &str)]) -> RawTable {
    let columns = COLUMNS_WITH_ROLE.iter().map(|c| c.to_string()).collect();
    rows.iter().fold(RawTable::new(source, columns), |t, (n, o, j, e, r)| {
        t.with_row(&[*n, *o, *j, *e, *r])
    })
}

/// Append `count` distinct people at one organization sharing a title
///
/// Names are `Person{n} {Organization-initial}`, emails empty.
pub fn with_people(mut table: RawTable, organization: &str, title: &str, count: usize) -> RawTable {
    let width = table.columns.len();
    for i in 1..=count {
        let mut row = vec![String::new(); width];
        row[0] = format!("Person{} {}", i, organization.split_whitespace().next().unwrap_or("X"));
        row[1] = organization.to_string();
        row[2] = title.to_string();
        table.rows.push(row);
    }
    table
}

/// Write `contents` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write fixture file");
    path
}
