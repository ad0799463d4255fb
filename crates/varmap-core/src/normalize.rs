//! Hierarchy normalization applied at every load boundary.

use varmap_model::columns::HIERARCHY;
use varmap_model::{CellValue, ColumnName, Row, Table};

/// Hierarchy columns as column names, outermost first.
pub fn hierarchy_columns() -> Vec<ColumnName> {
    HIERARCHY
        .iter()
        .filter_map(|name| ColumnName::new(*name).ok())
        .collect()
}

/// Fill missing hierarchy cells with `sentinel`. Returns true if anything changed.
pub fn fill_hierarchy(row: &mut Row, sentinel: &str) -> bool {
    let mut changed = false;
    for column in hierarchy_columns() {
        if row.get(column.as_str()).is_missing() {
            row.set(column, CellValue::text(sentinel));
            changed = true;
        }
    }
    changed
}

/// Make sure the table lists every hierarchy column.
pub fn ensure_hierarchy_columns(table: &mut Table) {
    for column in hierarchy_columns() {
        table.ensure_column(column);
    }
}

#[cfg(test)]
mod tests {
    use varmap_model::columns::{GROUP, ORGAN_SYSTEM, VARIABLE};

    use super::*;

    #[test]
    fn fills_only_missing_levels() {
        let mut row = Row::from_cells([(
            ColumnName::new(VARIABLE).unwrap(),
            CellValue::text("Heart Rate"),
        )]);
        assert!(fill_hierarchy(&mut row, "Unknown"));
        assert_eq!(row.text(ORGAN_SYSTEM), Some("Unknown"));
        assert_eq!(row.text(GROUP), Some("Unknown"));
        assert_eq!(row.text(VARIABLE), Some("Heart Rate"));
        assert!(!fill_hierarchy(&mut row, "Unknown"));
    }

    #[test]
    fn hierarchy_columns_are_added_once() {
        let mut table = Table::new(vec![ColumnName::new("Unit").unwrap()]);
        ensure_hierarchy_columns(&mut table);
        ensure_hierarchy_columns(&mut table);
        let names: Vec<&str> = table.columns().iter().map(ColumnName::as_str).collect();
        assert_eq!(names, vec!["Unit", "Organ System", "Group", "Variable"]);
    }
}
