use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use varmap_model::{CellValue, ColumnName, Row};

use crate::error::{IngestError, Result};

/// A parsed CSV file: normalized header plus rows padded to the header width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|header| header == name)
    }

    /// Convert each record into a [`Row`]. Internal (`__`) columns are dropped
    /// and blank cells become missing values.
    pub fn to_rows(&self) -> Vec<Row> {
        let columns: Vec<Option<ColumnName>> = self
            .headers
            .iter()
            .map(|header| {
                ColumnName::new(header.as_str())
                    .ok()
                    .filter(|column| !column.is_internal())
            })
            .collect();
        self.rows
            .iter()
            .map(|record| {
                Row::from_cells(columns.iter().zip(record).filter_map(|(column, value)| {
                    column
                        .as_ref()
                        .map(|column| (column.clone(), CellValue::text(value)))
                }))
            })
            .collect()
    }

    /// Header columns usable as identity columns, in file order.
    pub fn identity_columns(&self) -> Vec<ColumnName> {
        self.headers
            .iter()
            .filter_map(|header| ColumnName::new(header.as_str()).ok())
            .filter(|column| !column.is_internal())
            .collect()
    }
}

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

pub fn read_csv_table(path: &Path) -> Result<CsvTable> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_csv_reader(file)?;
    debug!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "read csv table"
    );
    Ok(table)
}

pub fn parse_csv_bytes(bytes: &[u8]) -> Result<CsvTable> {
    read_csv_reader(bytes)
}

/// Parse CSV from any reader. The first non-empty record is the header.
///
/// Fully blank records are skipped. A record with non-empty values beyond the
/// header width is rejected rather than truncated.
pub fn read_csv_reader<R: Read>(input: R) -> Result<CsvTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let values: Vec<String> = record.iter().map(normalize_cell).collect();
        if values.iter().all(String::is_empty) {
            continue;
        }
        if headers.is_none() {
            headers = Some(build_header(&record)?);
            continue;
        }
        let width = headers.as_ref().map_or(0, Vec::len);
        let used = values
            .iter()
            .rposition(|value| !value.is_empty())
            .map_or(0, |pos| pos + 1);
        if used > width {
            return Err(IngestError::RecordTooWide {
                record: index + 1,
                found: used,
                expected: width,
            });
        }
        let mut row = Vec::with_capacity(width);
        for idx in 0..width {
            row.push(values.get(idx).cloned().unwrap_or_default());
        }
        rows.push(row);
    }
    Ok(CsvTable {
        headers: headers.unwrap_or_default(),
        rows,
    })
}

fn build_header(record: &csv::StringRecord) -> Result<Vec<String>> {
    let headers: Vec<String> = record.iter().map(normalize_header).collect();
    let mut seen = BTreeSet::new();
    for header in &headers {
        if header.is_empty() {
            continue;
        }
        if !seen.insert(header.as_str()) {
            return Err(IngestError::DuplicateColumn {
                column: header.clone(),
            });
        }
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_trimmed_and_whitespace_collapsed() {
        assert_eq!(normalize_header("\u{feff} Organ   System "), "Organ System");
        assert_eq!(normalize_header("EPIC ID"), "EPIC ID");
    }

    #[test]
    fn short_records_are_padded() {
        let table = parse_csv_bytes(b"Variable,Unit,Group\nHeart Rate,bpm\n").unwrap();
        assert_eq!(table.rows, vec![vec!["Heart Rate", "bpm", ""]]);
    }

    #[test]
    fn wide_records_are_rejected() {
        let err = parse_csv_bytes(b"Variable\nHeart Rate,extra\n").unwrap_err();
        assert!(matches!(
            err,
            IngestError::RecordTooWide {
                found: 2,
                expected: 1,
                ..
            }
        ));
    }

    #[test]
    fn trailing_empty_cells_are_tolerated() {
        let table = parse_csv_bytes(b"Variable\nHeart Rate,,\n").unwrap();
        assert_eq!(table.rows, vec![vec!["Heart Rate"]]);
    }

    #[test]
    fn duplicate_headers_are_rejected() {
        let err = parse_csv_bytes(b"Variable,Unit,Unit\nA,b,c\n").unwrap_err();
        assert!(matches!(err, IngestError::DuplicateColumn { column } if column == "Unit"));
    }

    #[test]
    fn to_rows_drops_internal_columns_and_blanks() {
        let table =
            parse_csv_bytes(b"Variable,__row_key__,Unit\nSodium,abc123,\n").unwrap();
        let rows = table.to_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].variable(), Some("Sodium"));
        assert!(rows[0].get("__row_key__").is_missing());
        assert!(rows[0].get("Unit").is_missing());
        let identity: Vec<String> = table
            .identity_columns()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(identity, vec!["Variable", "Unit"]);
    }
}
