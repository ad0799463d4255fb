//! Content-derived row identity.
//!
//! A row key is the SHA-256 of the row restricted to a set of identity
//! columns, serialized as JSON with sorted keys, truncated to
//! [`ROW_KEY_LEN`](varmap_model::ROW_KEY_LEN) hex characters. Absent and
//! missing values are both left out of the payload, so a row's key does not
//! depend on which other columns its table happens to carry.

use sha2::{Digest, Sha256};

use varmap_model::{ColumnName, Row, RowKey};

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Canonical JSON of `row` restricted to `columns`.
///
/// Column order and duplicates in `columns` do not matter. Internal columns
/// and cells without a value are left out.
pub fn canonical_payload(row: &Row, columns: &[ColumnName]) -> String {
    let mut names: Vec<&ColumnName> = columns.iter().filter(|c| !c.is_internal()).collect();
    names.sort();
    names.dedup();
    let mut payload = serde_json::Map::new();
    for name in names {
        let value = row.get(name.as_str());
        if value.is_missing() {
            continue;
        }
        payload.insert(name.to_string(), value.to_json());
    }
    serde_json::Value::Object(payload).to_string()
}

pub fn row_key(row: &Row, columns: &[ColumnName]) -> RowKey {
    RowKey::from_digest_hex(&sha256_hex(canonical_payload(row, columns).as_bytes()))
}

/// Key over every identity cell the row carries.
pub fn content_key(row: &Row) -> RowKey {
    let columns: Vec<ColumnName> = row.columns().cloned().collect();
    row_key(row, &columns)
}
