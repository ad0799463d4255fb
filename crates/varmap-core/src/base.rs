//! Loading the shipped base table.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use varmap_ingest::{CsvTable, read_csv_table};
use varmap_model::columns::{UNKNOWN_SENTINEL, VARIABLE};
use varmap_model::Table;

use crate::error::{CoreError, Result};
use crate::normalize::{ensure_hierarchy_columns, fill_hierarchy};
use crate::rowkey::row_key;

/// Load, normalize and key the base table. The result is shared read-only
/// by every session of the process.
pub fn load_base_table(path: &Path) -> Result<Arc<Table>> {
    let start = Instant::now();
    let csv = read_csv_table(path)?;
    let table = base_table_from_csv(&csv)?;
    info!(
        path = %path.display(),
        row_count = table.len(),
        column_count = table.columns().len(),
        duration_ms = start.elapsed().as_millis(),
        "base table loaded"
    );
    Ok(Arc::new(table))
}

/// Build a keyed base table from parsed CSV.
///
/// Rows with a blank `Variable` are dropped, missing hierarchy values are
/// filled with the `Unknown` sentinel, and exact duplicates keep the first
/// occurrence.
pub fn base_table_from_csv(csv: &CsvTable) -> Result<Table> {
    if !csv.has_column(VARIABLE) {
        return Err(CoreError::validation(format!(
            "base table is missing the required column {VARIABLE:?}"
        )));
    }
    let mut table = Table::new(csv.identity_columns());
    ensure_hierarchy_columns(&mut table);
    let columns = table.identity_columns();

    let mut seen = BTreeSet::new();
    let mut blank = 0usize;
    let mut duplicates = 0usize;
    for mut row in csv.to_rows() {
        if row.variable().is_none() {
            blank += 1;
            continue;
        }
        fill_hierarchy(&mut row, UNKNOWN_SENTINEL);
        let key = row_key(&row, &columns);
        if !seen.insert(key.clone()) {
            duplicates += 1;
            continue;
        }
        row.key = Some(key);
        table.push_row(row);
    }
    if blank > 0 {
        warn!(dropped = blank, "base table rows without a Variable were dropped");
    }
    if duplicates > 0 {
        debug!(dropped = duplicates, "duplicate base table rows were dropped");
    }
    Ok(table)
}
