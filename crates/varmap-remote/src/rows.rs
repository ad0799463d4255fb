//! Conversion between session rows and the backend's JSON rows.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use varmap_core::{content_key, fill_hierarchy};
use varmap_model::columns::UNKNOWN_SENTINEL;
use varmap_model::{CellValue, ColumnName, Provenance, Row, RowKey};

pub const ROW_KEY_FIELD: &str = "row_key";
pub const USER_CREATED_FIELD: &str = "user_created";
pub const UPLOADED_AT_FIELD: &str = "user_uploaded_at";

/// JSON object sent to the backend for one row.
pub fn row_to_json(row: &Row) -> Value {
    let mut object = Map::new();
    for (column, value) in &row.cells {
        object.insert(column.to_string(), value.to_json());
    }
    if let Some(key) = &row.key {
        object.insert(ROW_KEY_FIELD.to_string(), Value::String(key.to_string()));
    }
    object.insert(
        USER_CREATED_FIELD.to_string(),
        Value::Bool(row.provenance.user_created),
    );
    object.insert(
        UPLOADED_AT_FIELD.to_string(),
        row.provenance
            .uploaded_at
            .map_or(Value::Null, |at| Value::String(at.to_rfc3339())),
    );
    Value::Object(object)
}

/// Row for one backend object. Non-objects yield `None`. A missing or
/// malformed `row_key` is replaced by a key computed from the row.
pub fn row_from_json(value: &Value) -> Option<Row> {
    let object = value.as_object()?;
    let mut row = Row::new();
    for (name, cell) in object {
        if matches!(
            name.as_str(),
            ROW_KEY_FIELD | USER_CREATED_FIELD | UPLOADED_AT_FIELD
        ) {
            continue;
        }
        let Ok(column) = ColumnName::new(name.as_str()) else {
            continue;
        };
        if column.is_internal() {
            continue;
        }
        row.set(column, CellValue::from_json(cell));
    }
    fill_hierarchy(&mut row, UNKNOWN_SENTINEL);

    row.provenance = Provenance {
        user_created: object
            .get(USER_CREATED_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false),
        uploaded_at: object
            .get(UPLOADED_AT_FIELD)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc)),
        replaces: None,
    };
    row.key = object
        .get(ROW_KEY_FIELD)
        .and_then(Value::as_str)
        .and_then(|raw| RowKey::parse(raw).ok())
        .or_else(|| Some(content_key(&row)));
    Some(row)
}

/// Rows of a pull response: `{"rows": [...]}` or a bare array. Any other
/// shape holds no rows.
pub fn rows_from_response(value: &Value) -> Vec<Row> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(object) => match object.get("rows") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    items.iter().filter_map(row_from_json).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn backend_key_is_kept() {
        let row = row_from_json(&json!({
            "Variable": "Heart Rate",
            "Organ System": "Cardiology",
            "Group": "Heart",
            "row_key": "ABCDEF0123",
            "user_created": true
        }))
        .unwrap();
        assert_eq!(row.key.as_ref().map(RowKey::as_str), Some("abcdef0123"));
        assert!(row.provenance.user_created);
        assert!(row.get("row_key").is_missing());
    }

    #[test]
    fn key_is_computed_when_absent() {
        let first = row_from_json(&json!({"Variable": "Sodium", "Unit": "mmol/L"})).unwrap();
        let second = row_from_json(&json!({"Unit": "mmol/L", "Variable": "Sodium"})).unwrap();
        assert!(first.key.is_some());
        assert_eq!(first.key, second.key);
        assert_eq!(first.organ_system(), Some("Unknown"));
    }

    #[test]
    fn response_shapes() {
        let row = json!({"Variable": "Lactate"});
        assert_eq!(rows_from_response(&json!({"rows": [row.clone()]})).len(), 1);
        assert_eq!(rows_from_response(&json!([row.clone(), 3])).len(), 1);
        assert!(rows_from_response(&json!({"data": [row]})).is_empty());
        assert!(rows_from_response(&json!("nope")).is_empty());
    }

    #[test]
    fn outgoing_row_carries_key_and_provenance() {
        let incoming = row_from_json(&json!({
            "Variable": "Lactate",
            "row_key": "0123456789",
            "user_uploaded_at": "2024-03-01T10:00:00+00:00"
        }))
        .unwrap();
        let value = row_to_json(&incoming);
        assert_eq!(value["row_key"], "0123456789");
        assert_eq!(value["Variable"], "Lactate");
        assert_eq!(value["user_created"], false);
        assert_eq!(value["user_uploaded_at"], "2024-03-01T10:00:00+00:00");
    }
}
