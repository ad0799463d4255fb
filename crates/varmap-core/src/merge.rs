//! Upsert of uploaded rows into the session overlay.
//!
//! The base table is never modified. Uploaded rows are classified against
//! the current master view (base rows not superseded by the overlay, plus the
//! overlay) and written to a copy of the overlay, which the caller swaps in
//! only when the whole upload succeeded.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace};

use varmap_ingest::CsvTable;
use varmap_model::columns::{
    EPIC_ID, GENERAL_SENTINEL, GROUP, ORGAN_SYSTEM, PDMS_ID, SOURCE, UNIT, UNKNOWN_SENTINEL,
    VARIABLE,
};
use varmap_model::{CellValue, ColumnName, Provenance, Row, RowKey, Table};

use crate::error::{CoreError, Result};
use crate::normalize::{fill_hierarchy, hierarchy_columns};
use crate::rowkey::{canonical_payload, content_key};

/// How an uploaded row is matched against existing rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Match on every identity column the master table has, including
    /// columns written by earlier rows of the same upload.
    #[default]
    ExactIdentity,
    /// Match on the listed columns only; other columns may be updated.
    NaturalKey(Vec<ColumnName>),
}

impl MatchPolicy {
    /// `Variable` + `Organ System` + `Group`.
    pub fn natural_key() -> Self {
        let columns = [VARIABLE, ORGAN_SYSTEM, GROUP]
            .iter()
            .filter_map(|name| ColumnName::new(*name).ok())
            .collect();
        Self::NaturalKey(columns)
    }

    fn match_columns(&self, reference_columns: &[ColumnName]) -> Vec<ColumnName> {
        match self {
            Self::ExactIdentity => reference_columns.to_vec(),
            Self::NaturalKey(columns) => columns.clone(),
        }
    }

    fn follows_master_columns(&self) -> bool {
        matches!(self, Self::ExactIdentity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    Added,
    Updated,
    /// Identical to an existing row; nothing written.
    Duplicate,
}

/// Counters reported after an upload.
///
/// `skipped` covers duplicates, ambiguous matches and rows without a
/// `Variable`; the last two are also counted on their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub ambiguous: usize,
    pub blank: usize,
}

impl MergeSummary {
    pub fn total(&self) -> usize {
        self.added + self.updated + self.skipped
    }
}

/// An uploaded row that resolved to exactly one master row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRow {
    pub action: MergeAction,
    pub key: RowKey,
    pub row: Row,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub overlay: Table,
    pub summary: MergeSummary,
    pub processed: Vec<ProcessedRow>,
}

/// Values of the manual "add a variable" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewVariable {
    pub variable: String,
    pub organ_system: String,
    pub group: String,
    pub source: String,
    pub epic_id: String,
    pub pdms_id: String,
    pub unit: String,
    /// Additional columns, passed through verbatim.
    pub extra: Vec<(String, String)>,
}

impl NewVariable {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            ..Self::default()
        }
    }

    /// Row for this form. Blank `Organ System` and `Group` become `General`.
    pub fn to_row(&self) -> Result<Row> {
        if self.variable.trim().is_empty() {
            return Err(CoreError::validation("Variable is required"));
        }
        let mut row = Row::new();
        let fields = [
            (VARIABLE, self.variable.as_str()),
            (ORGAN_SYSTEM, self.organ_system.as_str()),
            (GROUP, self.group.as_str()),
            (SOURCE, self.source.as_str()),
            (EPIC_ID, self.epic_id.as_str()),
            (PDMS_ID, self.pdms_id.as_str()),
            (UNIT, self.unit.as_str()),
        ];
        for (name, value) in fields {
            if let Ok(column) = ColumnName::new(name) {
                row.set(column, CellValue::text(value));
            }
        }
        for (name, value) in &self.extra {
            let column = ColumnName::new(name.as_str())
                .map_err(|_| CoreError::validation("extra column name must not be blank"))?;
            if column.is_internal() {
                return Err(CoreError::validation(format!(
                    "column {name:?} is reserved for internal use"
                )));
            }
            row.set(column, CellValue::text(value));
        }
        fill_hierarchy(&mut row, GENERAL_SENTINEL);
        Ok(row)
    }
}

/// Base rows hidden by the overlay: the ones it replaces and the ones with
/// the same key as an overlay row.
fn superseded_keys(overlay: &Table) -> BTreeSet<RowKey> {
    overlay
        .rows()
        .iter()
        .flat_map(|row| row.key.iter().chain(row.provenance.replaces.iter()))
        .cloned()
        .collect()
}

/// The table the rest of the application reads: base rows not superseded by
/// the overlay, in base order, followed by the overlay rows.
pub fn master_table(base: &Table, overlay: &Table) -> Table {
    let hidden = superseded_keys(overlay);
    let mut master = Table::new(base.columns().to_vec());
    for column in overlay.columns() {
        master.ensure_column(column.clone());
    }
    for row in base.rows() {
        if row.key.as_ref().is_some_and(|key| hidden.contains(key)) {
            continue;
        }
        master.push_row(row.clone());
    }
    for row in overlay.rows() {
        master.push_row(row.clone());
    }
    master
}

fn master_columns(base: &Table, overlay: &Table) -> Vec<ColumnName> {
    let mut columns = base.columns().to_vec();
    for column in overlay.columns() {
        if !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    columns
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Base(usize),
    Overlay(usize),
}

/// Working state of one merge: the overlay copy plus an index of the master
/// view by match-column payload.
struct Reference<'a> {
    base: &'a Table,
    overlay: Table,
    match_columns: Vec<ColumnName>,
    follow_master_columns: bool,
    index: HashMap<String, Vec<Slot>>,
}

impl<'a> Reference<'a> {
    fn new(base: &'a Table, overlay: &Table, policy: &MatchPolicy) -> Self {
        let mut reference = Self {
            base,
            overlay: overlay.clone(),
            match_columns: policy.match_columns(&master_columns(base, overlay)),
            follow_master_columns: policy.follows_master_columns(),
            index: HashMap::new(),
        };
        reference.reindex();
        reference
    }

    fn reindex(&mut self) {
        self.index.clear();
        let hidden = superseded_keys(&self.overlay);
        let base = self.base;
        for (idx, row) in base.rows().iter().enumerate() {
            if row.key.as_ref().is_some_and(|key| hidden.contains(key)) {
                continue;
            }
            self.insert(row, Slot::Base(idx));
        }
        let payloads: Vec<String> = self
            .overlay
            .rows()
            .iter()
            .map(|row| self.payload(row))
            .collect();
        for (idx, payload) in payloads.into_iter().enumerate() {
            self.index.entry(payload).or_default().push(Slot::Overlay(idx));
        }
    }

    /// Pick up columns the overlay gained from the last write, so later rows
    /// of the same upload are matched the way a re-upload would match them.
    fn refresh_match_columns(&mut self) {
        if !self.follow_master_columns {
            return;
        }
        let known = master_columns(self.base, &self.overlay);
        if known.iter().all(|column| self.match_columns.contains(column)) {
            return;
        }
        self.match_columns = known;
        self.reindex();
        trace!(columns = self.match_columns.len(), "match columns extended");
    }

    fn payload(&self, row: &Row) -> String {
        canonical_payload(row, &self.match_columns)
    }

    fn insert(&mut self, row: &Row, slot: Slot) {
        let payload = self.payload(row);
        self.index.entry(payload).or_default().push(slot);
    }

    fn candidates(&self, row: &Row) -> Vec<Slot> {
        self.index.get(&self.payload(row)).cloned().unwrap_or_default()
    }

    fn row_at(&self, slot: Slot) -> Option<&Row> {
        match slot {
            Slot::Base(idx) => self.base.rows().get(idx),
            Slot::Overlay(idx) => self.overlay.rows().get(idx),
        }
    }

    fn add(&mut self, row: Row) {
        let slot = Slot::Overlay(self.overlay.len());
        self.insert(&row, slot);
        self.overlay.push_row(row);
        self.refresh_match_columns();
    }

    /// Write `row` in place of the master row at `slot`. A base row is
    /// superseded by a new overlay row; an overlay row is rewritten.
    fn update(&mut self, slot: Slot, row: Row) {
        match slot {
            Slot::Base(_) => {
                let payload = self.payload(&row);
                let new_slot = Slot::Overlay(self.overlay.len());
                if let Some(slots) = self.index.get_mut(&payload) {
                    slots.retain(|existing| *existing != slot);
                }
                self.index.entry(payload).or_default().push(new_slot);
                self.overlay.push_row(row);
            }
            Slot::Overlay(idx) => self.overlay.replace_row(idx, row),
        }
        self.refresh_match_columns();
    }
}

/// Merge an uploaded table into the overlay.
///
/// Fails without touching anything when the upload has no `Variable`
/// column. Rows are processed in file order, each against the master view
/// including the rows written earlier in the same upload.
pub fn merge_upload(
    base: &Table,
    overlay: &Table,
    upload: &CsvTable,
    policy: &MatchPolicy,
    now: DateTime<Utc>,
) -> Result<MergeOutcome> {
    if !upload.has_column(VARIABLE) {
        return Err(CoreError::validation(format!(
            "upload is missing the required column {VARIABLE:?}"
        )));
    }

    let mut upload_columns = upload.identity_columns();
    for column in hierarchy_columns() {
        if !upload_columns.contains(&column) {
            upload_columns.push(column);
        }
    }

    let mut reference = Reference::new(base, overlay, policy);
    let mut summary = MergeSummary::default();
    let mut processed = Vec::new();

    for (record, mut row) in upload.to_rows().into_iter().enumerate() {
        if row.variable().is_none() {
            summary.blank += 1;
            summary.skipped += 1;
            debug!(record, "skipped upload row without a Variable");
            continue;
        }
        fill_hierarchy(&mut row, UNKNOWN_SENTINEL);

        let candidates = reference.candidates(&row);
        let existing = match candidates.as_slice() {
            [] => None,
            [slot] => reference.row_at(*slot).cloned().map(|found| (*slot, found)),
            _ => {
                summary.ambiguous += 1;
                summary.skipped += 1;
                debug!(
                    record,
                    matches = candidates.len(),
                    "skipped ambiguous upload row"
                );
                continue;
            }
        };

        let (action, written) = match existing {
            None => {
                let mut added = row;
                added.key = Some(content_key(&added));
                added.provenance = Provenance::uploaded(now);
                reference.add(added.clone());
                summary.added += 1;
                (MergeAction::Added, added)
            }
            Some((_, found)) if found.same_values(&row, &upload_columns) => {
                summary.skipped += 1;
                (MergeAction::Duplicate, found)
            }
            Some((slot, found)) => {
                let mut updated = found.clone();
                for column in &upload_columns {
                    updated.set(column.clone(), row.get(column.as_str()).clone());
                }
                updated.key = Some(content_key(&updated));
                updated.provenance.uploaded_at = Some(now);
                if matches!(slot, Slot::Base(_)) {
                    updated.provenance.replaces = found.key.clone();
                }
                reference.update(slot, updated.clone());
                summary.updated += 1;
                (MergeAction::Updated, updated)
            }
        };

        let Some(key) = written.key.clone() else {
            continue;
        };
        debug!(record, action = ?action, row_key = %key, "classified upload row");
        trace!(record, row = ?written.cells, "upload row values");
        processed.push(ProcessedRow {
            action,
            key,
            row: written,
        });
    }

    info!(
        added = summary.added,
        updated = summary.updated,
        skipped = summary.skipped,
        ambiguous = summary.ambiguous,
        blank = summary.blank,
        "upload merged"
    );
    Ok(MergeOutcome {
        overlay: reference.overlay,
        summary,
        processed,
    })
}

/// Add one manually entered row. It is always classified as added and
/// marked as user created; an identical earlier row is replaced.
pub fn add_manual_row(
    base: &Table,
    overlay: &Table,
    new_variable: &NewVariable,
    now: DateTime<Utc>,
) -> Result<MergeOutcome> {
    let mut row = new_variable.to_row()?;
    let key = content_key(&row);
    if base.position_by_key(&key).is_some() {
        debug!(row_key = %key, "manual row supersedes base row");
    }
    row.key = Some(key.clone());
    row.provenance = Provenance::created(now);

    let mut next = overlay.clone();
    match next.position_by_key(&key) {
        Some(idx) => next.replace_row(idx, row.clone()),
        None => next.push_row(row.clone()),
    }
    info!(row_key = %key, "manual row added");
    Ok(MergeOutcome {
        overlay: next,
        summary: MergeSummary {
            added: 1,
            ..MergeSummary::default()
        },
        processed: vec![ProcessedRow {
            action: MergeAction::Added,
            key,
            row,
        }],
    })
}
