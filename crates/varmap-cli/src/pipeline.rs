//! Session assembly shared by the subcommands.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{info, info_span, warn};

use varmap_core::{MatchPolicy, NewVariable, Selection, SessionContext, UploadReport, load_base_table};
use varmap_ingest::read_csv_table;
use varmap_model::columns::{EPIC_ID, GROUP, ORGAN_SYSTEM, PDMS_ID, SOURCE, UNIT, VARIABLE};
use varmap_model::{ColumnName, RowKey};

/// Everything needed to rebuild a session from files and flags.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub base: PathBuf,
    /// Applied in order.
    pub uploads: Vec<PathBuf>,
    pub add_variables: Vec<NewVariable>,
    /// Serialized selection reference to start from.
    pub selection: Option<String>,
    pub select_all: bool,
    pub policy: MatchPolicy,
    pub project_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadStep {
    pub path: PathBuf,
    pub report: UploadReport,
}

#[derive(Debug)]
pub struct SessionBuild {
    pub session: SessionContext,
    pub uploads: Vec<UploadStep>,
    pub added: Vec<RowKey>,
    /// Keys from the starting reference that no longer resolve.
    pub unresolved: usize,
}

/// Load the base table and replay uploads, manual rows and the selection.
pub fn build_session(options: &SessionOptions) -> Result<SessionBuild> {
    let start = Instant::now();
    let base = load_base_table(&options.base)
        .with_context(|| format!("load base table {}", options.base.display()))?;
    let mut session = SessionContext::new(base).with_policy(options.policy.clone());
    if let Some(name) = &options.project_name {
        session.set_project_name(name.as_str());
    }

    let mut unresolved = 0usize;
    if let Some(reference) = &options.selection {
        let selection = Selection::deserialize(reference);
        session.selection_mut().extend(selection.keys().cloned());
    }

    let mut uploads = Vec::with_capacity(options.uploads.len());
    for path in &options.uploads {
        let report = apply_upload_file(&mut session, path)?;
        uploads.push(UploadStep {
            path: path.clone(),
            report,
        });
    }

    let mut added = Vec::with_capacity(options.add_variables.len());
    for new_variable in &options.add_variables {
        let key = session
            .add_variable(new_variable)
            .with_context(|| format!("add variable {:?}", new_variable.variable))?;
        added.push(key);
    }

    if options.select_all {
        let keys: Vec<RowKey> = session.master().keys().cloned().collect();
        session.selection_mut().extend(keys);
    }

    if options.selection.is_some() {
        let lookup = session.tree().lookup;
        let mut resolvable = session.selection().clone();
        unresolved = resolvable.retain_resolvable(&lookup);
        if unresolved > 0 {
            warn!(unresolved, "selected rows no longer present");
        }
    }

    info!(
        uploads = uploads.len(),
        added = added.len(),
        selected = session.selection().len(),
        duration_ms = start.elapsed().as_millis(),
        "session ready"
    );
    Ok(SessionBuild {
        session,
        uploads,
        added,
        unresolved,
    })
}

fn apply_upload_file(session: &mut SessionContext, path: &Path) -> Result<UploadReport> {
    let span = info_span!("upload_file", path = %path.display());
    let _guard = span.enter();
    let upload =
        read_csv_table(path).with_context(|| format!("read upload {}", path.display()))?;
    session
        .apply_upload(&upload)
        .with_context(|| format!("merge upload {}", path.display()))
}

/// Policy for `--match-on` and `--natural-key`.
pub fn match_policy(natural_key: bool, columns: &[String]) -> Result<MatchPolicy> {
    if !natural_key {
        if !columns.is_empty() {
            bail!("--natural-key requires --match-on natural-key");
        }
        return Ok(MatchPolicy::ExactIdentity);
    }
    if columns.is_empty() {
        return Ok(MatchPolicy::natural_key());
    }
    let columns = columns
        .iter()
        .map(|name| ColumnName::new(name.as_str()).with_context(|| format!("column {name:?}")))
        .collect::<Result<Vec<_>>>()?;
    Ok(MatchPolicy::NaturalKey(columns))
}

/// Parse `Field=Value;Field=Value` into a manual row.
///
/// Field names of the standard columns are matched case-insensitively;
/// anything else becomes an extra column.
pub fn parse_new_variable(raw: &str) -> Result<NewVariable> {
    let mut new_variable = NewVariable::default();
    for part in raw.split(';').map(str::trim).filter(|part| !part.is_empty()) {
        let Some((field, value)) = part.split_once('=') else {
            bail!("expected Field=Value, got {part:?}");
        };
        let field = field.trim();
        let value = value.trim().to_string();
        let slot = [
            (VARIABLE, &mut new_variable.variable),
            (ORGAN_SYSTEM, &mut new_variable.organ_system),
            (GROUP, &mut new_variable.group),
            (SOURCE, &mut new_variable.source),
            (EPIC_ID, &mut new_variable.epic_id),
            (PDMS_ID, &mut new_variable.pdms_id),
            (UNIT, &mut new_variable.unit),
        ]
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(field))
        .map(|(_, slot)| slot);
        match slot {
            Some(slot) => *slot = value,
            None if field.is_empty() => bail!("empty field name in {part:?}"),
            None => new_variable.extra.push((field.to_string(), value)),
        }
    }
    if new_variable.variable.trim().is_empty() {
        bail!("Variable is required in {raw:?}");
    }
    Ok(new_variable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_extra_fields() {
        let parsed =
            parse_new_variable("variable=Creatinine; Unit = mg/dL;Organ System=Renal;Comment=x")
                .unwrap();
        assert_eq!(parsed.variable, "Creatinine");
        assert_eq!(parsed.unit, "mg/dL");
        assert_eq!(parsed.organ_system, "Renal");
        assert_eq!(parsed.extra, vec![("Comment".to_string(), "x".to_string())]);
    }

    #[test]
    fn rejects_missing_variable_and_malformed_parts() {
        assert!(parse_new_variable("Unit=mg").is_err());
        assert!(parse_new_variable("Variable=X;Unit").is_err());
        assert!(parse_new_variable("Variable=X;=1").is_err());
    }

    #[test]
    fn natural_key_columns_need_the_natural_key_policy() {
        assert_eq!(match_policy(false, &[]).unwrap(), MatchPolicy::ExactIdentity);
        assert!(match_policy(false, &["Variable".to_string()]).is_err());
        assert_eq!(match_policy(true, &[]).unwrap(), MatchPolicy::natural_key());
        let policy = match_policy(true, &["Variable".to_string()]).unwrap();
        assert_eq!(
            policy,
            MatchPolicy::NaturalKey(vec![ColumnName::new("Variable").unwrap()])
        );
    }
}
