//! Data model for the variable mapping engine.
//!
//! A [`Table`] is an ordered list of [`Row`]s over an ordered column list.
//! Each row carries its business cells, an optional content-derived
//! [`RowKey`] and session [`Provenance`].

pub mod columns;
pub mod error;
pub mod ids;
pub mod provenance;
pub mod table;

pub use error::{ModelError, Result};
pub use ids::{ColumnName, LEAF_PREFIX, ROW_KEY_LEN, RowKey};
pub use provenance::{Origin, Provenance};
pub use table::{CellValue, Row, Table};

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn column(name: &str) -> ColumnName {
        ColumnName::new(name).unwrap()
    }

    #[test]
    fn column_name_is_trimmed_and_rejects_blank() {
        assert_eq!(column("  Organ System ").as_str(), "Organ System");
        assert!(ColumnName::new("   ").is_err());
        assert!(column("__row_key__").is_internal());
        assert!(!column("Unit").is_internal());
    }

    #[test]
    fn row_key_parse_normalizes_case_and_rejects_non_hex() {
        let key = RowKey::parse(" ABCDEF0123 ").unwrap();
        assert_eq!(key.as_str(), "abcdef0123");
        assert_eq!(key.leaf_value(), "ROW:abcdef0123");
        assert!(RowKey::parse("").is_err());
        assert!(RowKey::parse("Cardiology").is_err());
        assert!(RowKey::parse("abc,def").is_err());
    }

    #[test]
    fn row_key_from_digest_truncates() {
        let key = RowKey::from_digest_hex("0123456789ABCDEF0123");
        assert_eq!(key.as_str().len(), ROW_KEY_LEN);
        assert_eq!(key.as_str(), "0123456789");
    }

    #[test]
    fn blank_text_becomes_missing_and_is_not_stored() {
        assert_eq!(CellValue::text("  "), CellValue::Missing);
        assert_eq!(CellValue::text(" bpm "), CellValue::Text("bpm".to_string()));

        let mut row = Row::new();
        row.set(column("Unit"), CellValue::text("bpm"));
        row.set(column("Unit"), CellValue::text(""));
        assert!(row.cells.is_empty());
        assert!(row.get("Unit").is_missing());
    }

    #[test]
    fn origin_precedence_is_created_then_uploaded_then_base() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(Provenance::default().origin(), Origin::Base);
        assert_eq!(Provenance::uploaded(at).origin(), Origin::UserUpload);
        assert_eq!(Provenance::created(at).origin(), Origin::UserCreated);
        assert_eq!(Origin::UserUpload.to_string(), "User upload");
    }

    #[test]
    fn table_registers_columns_in_first_seen_order_and_skips_internal() {
        let mut table = Table::new(vec![column("Variable"), column("Group")]);
        let row = Row::from_cells([
            (column("Unit"), CellValue::text("bpm")),
            (column("Variable"), CellValue::text("Heart Rate")),
            (column("__note__"), CellValue::text("hidden")),
        ]);
        table.push_row(row);

        let names: Vec<&str> = table.columns().iter().map(ColumnName::as_str).collect();
        assert_eq!(names, vec!["Variable", "Group", "Unit"]);
        assert!(table.rows()[0].get("__note__").is_missing());
    }

    #[test]
    fn cell_value_json_conversion() {
        let number = serde_json::json!(42);
        assert_eq!(
            CellValue::from_json(&number),
            CellValue::Number(serde_json::Number::from(42))
        );
        assert_eq!(CellValue::from_json(&serde_json::Value::Null), CellValue::Missing);
        assert_eq!(
            CellValue::from_json(&serde_json::json!(true)),
            CellValue::Text("true".to_string())
        );
        assert_eq!(CellValue::text("x").to_json(), serde_json::json!("x"));
    }

    #[test]
    fn row_serializes_with_key_as_string() {
        let mut row = Row::from_cells([(column("Variable"), CellValue::text("Sodium"))]);
        row.key = Some(RowKey::parse("00aa11bb22").unwrap());
        let json = serde_json::to_value(&row).expect("serialize row");
        assert_eq!(json["key"], "00aa11bb22");
        let round: Row = serde_json::from_value(json).expect("deserialize row");
        assert_eq!(round, row);
    }
}
