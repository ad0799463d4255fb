#![deny(unsafe_code)]

use std::collections::BTreeMap;

use crate::columns::{GROUP, ORGAN_SYSTEM, SOURCE, VARIABLE};
use crate::{ColumnName, Origin, Provenance, RowKey};

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    Text(String),
    Number(serde_json::Number),
    #[default]
    Missing,
}

static MISSING: CellValue = CellValue::Missing;

impl CellValue {
    /// Text cell from raw input. Surrounding whitespace is dropped and blank
    /// input becomes [`CellValue::Missing`].
    pub fn text(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            Self::Missing
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Rendering used for labels and CSV output. Missing renders as "".
    pub fn display_string(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Number(value) => value.to_string(),
            Self::Missing => String::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(value) => serde_json::Value::String(value.clone()),
            Self::Number(value) => serde_json::Value::Number(value.clone()),
            Self::Missing => serde_json::Value::Null,
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Missing,
            serde_json::Value::String(text) => Self::text(text),
            serde_json::Value::Number(number) => Self::Number(number.clone()),
            serde_json::Value::Bool(flag) => Self::Text(flag.to_string()),
            other => Self::text(other.to_string()),
        }
    }
}

/// One row of business columns plus its key and session provenance.
///
/// Missing values are never stored in `cells`; an absent column and a
/// missing value are the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Row {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<RowKey>,
    pub cells: BTreeMap<ColumnName, CellValue>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = (ColumnName, CellValue)>,
    {
        let mut row = Self::new();
        for (column, value) in cells {
            row.set(column, value);
        }
        row
    }

    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&MISSING)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).as_text()
    }

    pub fn set(&mut self, column: ColumnName, value: CellValue) {
        if value.is_missing() {
            self.cells.remove(column.as_str());
        } else {
            self.cells.insert(column, value);
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnName> {
        self.cells.keys()
    }

    pub fn variable(&self) -> Option<&str> {
        self.text(VARIABLE)
    }

    pub fn organ_system(&self) -> Option<&str> {
        self.text(ORGAN_SYSTEM)
    }

    pub fn group(&self) -> Option<&str> {
        self.text(GROUP)
    }

    pub fn source(&self) -> Option<&str> {
        self.text(SOURCE)
    }

    pub fn origin(&self) -> Origin {
        self.provenance.origin()
    }

    /// Tree leaf identity, available once the row is keyed.
    pub fn leaf_value(&self) -> Option<String> {
        self.key.as_ref().map(RowKey::leaf_value)
    }

    /// True when both rows hold the same value in every listed column.
    pub fn same_values<'a, I>(&self, other: &Row, columns: I) -> bool
    where
        I: IntoIterator<Item = &'a ColumnName>,
    {
        columns
            .into_iter()
            .all(|column| self.get(column.as_str()) == other.get(column.as_str()))
    }
}

/// Ordered rows sharing an ordered column list.
///
/// Column order is first-seen order; it drives export ordering of
/// non-preferred columns. Internal columns are never registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Table {
    columns: Vec<ColumnName>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<ColumnName>) -> Self {
        let mut table = Self::default();
        for column in columns {
            table.ensure_column(column);
        }
        table
    }

    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    /// Identity columns: every registered column (internal ones are never registered).
    pub fn identity_columns(&self) -> Vec<ColumnName> {
        self.columns.clone()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.as_str() == name)
    }

    /// Register a column at the end of the column list. Returns false when the
    /// column is internal or already present.
    pub fn ensure_column(&mut self, column: ColumnName) -> bool {
        if column.is_internal() || self.has_column(column.as_str()) {
            return false;
        }
        self.columns.push(column);
        true
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, mut row: Row) {
        row.cells.retain(|column, _| !column.is_internal());
        let new_columns: Vec<ColumnName> = row.columns().cloned().collect();
        for column in new_columns {
            self.ensure_column(column);
        }
        self.rows.push(row);
    }

    pub fn replace_row(&mut self, index: usize, mut row: Row) {
        row.cells.retain(|column, _| !column.is_internal());
        let new_columns: Vec<ColumnName> = row.columns().cloned().collect();
        for column in new_columns {
            self.ensure_column(column);
        }
        if let Some(slot) = self.rows.get_mut(index) {
            *slot = row;
        }
    }

    pub fn position_by_key(&self, key: &RowKey) -> Option<usize> {
        self.rows.iter().position(|row| row.key.as_ref() == Some(key))
    }

    pub fn get_by_key(&self, key: &RowKey) -> Option<&Row> {
        self.rows.iter().find(|row| row.key.as_ref() == Some(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowKey> {
        self.rows.iter().filter_map(|row| row.key.as_ref())
    }
}
