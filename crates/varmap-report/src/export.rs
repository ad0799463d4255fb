//! Projection of selected rows into the user-facing export table.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use csv::{Terminator, WriterBuilder};
use tracing::{info, info_span};

use varmap_core::SessionContext;
use varmap_model::columns::{ORIGIN, PREFERRED_EXPORT_ORDER};
use varmap_model::{ColumnName, Row};

use crate::error::{ReportError, Result};

/// Export file names start with this prefix.
pub const EXPORT_FILE_PREFIX: &str = "variablemapping";

/// Slug used when the session has no project name.
pub const DEFAULT_PROJECT_SLUG: &str = "varmap";

/// Rows ready to be written: business columns only, plus `Origin`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportView {
    columns: Vec<String>,
    records: Vec<Vec<String>>,
}

impl ExportView {
    /// Build the view for `rows`. Column order is the preferred prefix
    /// (only the columns that exist, `Origin` always), then the remaining
    /// columns in master order.
    pub fn build<'a, I>(rows: I, master_columns: &[ColumnName]) -> Self
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let rows: Vec<&Row> = rows.into_iter().collect();
        let mut known: Vec<&str> = master_columns
            .iter()
            .filter(|column| !column.is_internal())
            .map(ColumnName::as_str)
            .collect();
        for row in &rows {
            for column in row.columns() {
                if !column.is_internal() && !known.contains(&column.as_str()) {
                    known.push(column.as_str());
                }
            }
        }
        let columns = export_columns(&known);
        let records = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        if column == ORIGIN {
                            row.origin().as_str().to_string()
                        } else {
                            row.get(column).display_string()
                        }
                    })
                    .collect()
            })
            .collect();
        Self { columns, records }
    }

    /// View of the session's selected rows.
    pub fn from_session(session: &SessionContext) -> Self {
        let master = session.master();
        let rows = session.selected_rows();
        Self::build(&rows, master.columns())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// UTF-8 CSV with a header row, `\n` line endings.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for record in &self.records {
            writer.write_record(record)?;
        }
        writer
            .into_inner()
            .map_err(|err| ReportError::Csv(err.into_error().into()))
    }
}

/// Final column order for the given column names.
pub fn export_columns(available: &[&str]) -> Vec<String> {
    let mut columns: Vec<String> = PREFERRED_EXPORT_ORDER
        .iter()
        .filter(|name| **name == ORIGIN || available.contains(*name))
        .map(|name| (*name).to_string())
        .collect();
    for name in available {
        if !columns.iter().any(|column| column == name) {
            columns.push((*name).to_string());
        }
    }
    columns
}

/// Lowercase project name with spaces and `/` replaced by `_`.
pub fn project_slug(project_name: Option<&str>) -> String {
    let trimmed = project_name.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return DEFAULT_PROJECT_SLUG.to_string();
    }
    trimmed
        .to_lowercase()
        .chars()
        .map(|ch| if ch == ' ' || ch == '/' { '_' } else { ch })
        .collect()
}

/// `variablemapping_<slug>_<YYYYMMDD_HHMMSS>.csv`
pub fn export_file_name(project_name: Option<&str>, timestamp: NaiveDateTime) -> String {
    format!(
        "{EXPORT_FILE_PREFIX}_{}_{}.csv",
        project_slug(project_name),
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

/// Write the view into `dir` and return the path of the new file.
pub fn write_export(
    dir: &Path,
    view: &ExportView,
    project_name: Option<&str>,
    timestamp: NaiveDateTime,
) -> Result<PathBuf> {
    let span = info_span!("export", rows = view.len());
    let _guard = span.enter();

    fs::create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(export_file_name(project_name, timestamp));
    let bytes = view.to_csv_bytes()?;
    fs::write(&path, &bytes).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "export written");
    Ok(path)
}
