//! CSV export of the currently filtered collection.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::descriptor::ColumnSpec;
use crate::error::ClientError;

pub const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8";

/// A generated file ready to be saved by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

impl ExportFile {
    /// Write into `dir` (created if missing) and return the full path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ClientError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, self.body.as_bytes())?;
        Ok(path)
    }
}

/// Quote a field, doubling embedded quotes.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Header row plus one row per entity, every field quoted.
pub fn to_csv<T>(items: &[T], columns: &[ColumnSpec<T>]) -> String {
    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|c| quote(&c.header))
            .collect::<Vec<_>>()
            .join(","),
    );
    for item in items {
        lines.push(
            columns
                .iter()
                .map(|c| quote(&c.value(item)))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// `<ResourceName>_<YYYY-MM-DD>.csv` with unsafe characters replaced.
pub fn export_filename(resource: &str, date: NaiveDate) -> String {
    let mut name = String::with_capacity(resource.len());
    for ch in resource.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            name.push(ch);
        } else {
            name.push('_');
        }
    }
    let name = name.trim_matches('_');
    let name = if name.is_empty() { "export" } else { name };
    format!("{name}_{}.csv", date.format("%Y-%m-%d"))
}

pub fn csv_export<T>(
    resource: &str,
    items: &[T],
    columns: &[ColumnSpec<T>],
    date: NaiveDate,
) -> ExportFile {
    ExportFile {
        filename: export_filename(resource, date),
        content_type: CSV_CONTENT_TYPE,
        body: to_csv(items, columns),
    }
}
