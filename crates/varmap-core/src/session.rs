//! Per-user session state: overlay, selection and the derived views.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span};

use varmap_ingest::CsvTable;
use varmap_model::{Row, RowKey, Table};

use crate::error::{CoreError, Result};
use crate::merge::{
    MatchPolicy, MergeOutcome, MergeSummary, NewVariable, ProcessedRow, add_manual_row,
    master_table, merge_upload,
};
use crate::selection::Selection;
use crate::tree::{TreeBuild, build_tree};

/// Result of applying one upload to a session.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub summary: MergeSummary,
    pub processed: Vec<ProcessedRow>,
    /// Keys newly added to the selection.
    pub selected: usize,
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    base: Arc<Table>,
    overlay: Table,
    selection: Selection,
    project_name: Option<String>,
    last_summary: Option<MergeSummary>,
    policy: MatchPolicy,
}

impl SessionContext {
    pub fn new(base: Arc<Table>) -> Self {
        Self {
            base,
            overlay: Table::default(),
            selection: Selection::new(),
            project_name: None,
            last_summary: None,
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn base(&self) -> &Table {
        &self.base
    }

    pub fn overlay(&self) -> &Table {
        &self.overlay
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    /// Blank names clear the project name.
    pub fn set_project_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        let trimmed = name.trim();
        self.project_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    pub fn last_summary(&self) -> Option<&MergeSummary> {
        self.last_summary.as_ref()
    }

    pub fn has_overlay(&self) -> bool {
        !self.overlay.is_empty()
    }

    pub fn master(&self) -> Table {
        master_table(&self.base, &self.overlay)
    }

    pub fn tree(&self) -> TreeBuild {
        build_tree(&self.master())
    }

    pub fn apply_upload(&mut self, upload: &CsvTable) -> Result<UploadReport> {
        self.apply_upload_at(upload, Utc::now())
    }

    /// Merge `upload` into the overlay and select every row it resolved to.
    /// On error the session is left untouched.
    pub fn apply_upload_at(&mut self, upload: &CsvTable, now: DateTime<Utc>) -> Result<UploadReport> {
        let span = info_span!("upload", rows = upload.rows.len());
        let _guard = span.enter();

        let MergeOutcome {
            overlay,
            summary,
            processed,
        } = merge_upload(&self.base, &self.overlay, upload, &self.policy, now)?;
        self.overlay = overlay;
        self.last_summary = Some(summary);
        let selected = self.select_processed(&processed);
        info!(selected, "upload applied to session");
        Ok(UploadReport {
            summary,
            processed,
            selected,
        })
    }

    pub fn add_variable(&mut self, new_variable: &NewVariable) -> Result<RowKey> {
        self.add_variable_at(new_variable, Utc::now())
    }

    /// Add a manually entered row and select it.
    pub fn add_variable_at(&mut self, new_variable: &NewVariable, now: DateTime<Utc>) -> Result<RowKey> {
        let outcome = add_manual_row(&self.base, &self.overlay, new_variable, now)?;
        self.overlay = outcome.overlay;
        let key = outcome
            .processed
            .into_iter()
            .next()
            .map(|processed| processed.key);
        let Some(key) = key else {
            return Err(CoreError::validation("manual row was not keyed"));
        };
        self.selection.select(key.clone());
        Ok(key)
    }

    /// Drop every uploaded and manually added row. The selection is kept;
    /// keys that no longer resolve are ignored when reading it.
    pub fn reset_overlay(&mut self) {
        debug!(rows = self.overlay.len(), "overlay reset");
        self.overlay = Table::default();
        self.last_summary = None;
    }

    /// Selected rows that resolve in the current master view, in master
    /// order (base rows first, then overlay rows).
    pub fn selected_rows(&self) -> Vec<Row> {
        let master = self.master();
        let build = build_tree(&master);
        let mut seen = HashSet::new();
        master
            .keys()
            .filter(|key| self.selection.contains(key) && seen.insert(*key))
            .filter_map(|key| build.lookup.get_by_key(key))
            .cloned()
            .collect()
    }

    fn select_processed(&mut self, processed: &[ProcessedRow]) -> usize {
        processed
            .iter()
            .filter(|row| self.selection.select(row.key.clone()))
            .count()
    }
}
