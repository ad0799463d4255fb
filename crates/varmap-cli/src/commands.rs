use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use varmap_cli::pipeline::{
    SessionBuild, SessionOptions, build_session, match_policy, parse_new_variable,
};
use varmap_model::RowKey;
use varmap_remote::RemoteClient;
use varmap_report::{ExportView, write_export};

use crate::cli::{ExportArgs, MatchOnArg, RemoteCommand, SessionArgs};
use crate::summary::{
    print_export_preview, print_json, print_remote_rows, print_selection_reference, print_tree,
    print_upload_summary,
};

fn session_options(args: &SessionArgs) -> Result<SessionOptions> {
    let policy = match_policy(matches!(args.match_on, MatchOnArg::NaturalKey), &args.natural_key)?;
    let add_variables = args
        .add_variable
        .iter()
        .map(|raw| parse_new_variable(raw))
        .collect::<Result<Vec<_>>>()?;
    Ok(SessionOptions {
        base: args.base.clone(),
        uploads: args.uploads.clone(),
        add_variables,
        selection: args.select.clone(),
        select_all: false,
        policy,
        project_name: args.project.clone(),
    })
}

pub fn run_tree(args: &SessionArgs) -> Result<()> {
    let build = build_session(&session_options(args)?)?;
    print_tree(&build.session);
    Ok(())
}

pub fn run_upload(args: &SessionArgs) -> Result<()> {
    let build = build_session(&session_options(args)?)?;
    print_upload_summary(&build.uploads);
    print_selection_reference(&build.session);
    Ok(())
}

#[derive(Debug)]
pub struct ExportResult {
    pub view: ExportView,
    /// `None` on a dry run.
    pub path: Option<PathBuf>,
    pub unresolved: usize,
}

pub fn run_export(args: &ExportArgs) -> Result<ExportResult> {
    let mut options = session_options(&args.session)?;
    options.select_all = args.select_all;
    let SessionBuild {
        session,
        uploads,
        unresolved,
        ..
    } = build_session(&options)?;
    if !uploads.is_empty() {
        print_upload_summary(&uploads);
    }

    let view = ExportView::from_session(&session);
    print_export_preview(&view);
    if args.dry_run {
        return Ok(ExportResult {
            view,
            path: None,
            unresolved,
        });
    }

    let dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let path = write_export(
        &dir,
        &view,
        session.project_name(),
        Local::now().naive_local(),
    )
    .with_context(|| format!("write export into {}", dir.display()))?;
    info!(rows = view.len(), path = %path.display(), "export complete");
    Ok(ExportResult {
        view,
        path: Some(path),
        unresolved,
    })
}

pub fn run_remote(command: &RemoteCommand) -> Result<()> {
    let client = RemoteClient::from_env().context("configure remote backend")?;
    match command {
        RemoteCommand::Health => {
            let body = client.health().context("remote health check")?;
            print_json(&body)?;
        }
        RemoteCommand::Pull { project_id } => {
            let rows = client
                .pull(project_id)
                .with_context(|| format!("pull project {project_id}"))?;
            print_remote_rows(&rows);
        }
        RemoteCommand::Push {
            project_id,
            session,
            dry_run,
        } => {
            let build = build_session(&session_options(session)?)?;
            let rows = build.session.selected_rows();
            let result = client
                .upsert(project_id, &rows, *dry_run)
                .with_context(|| format!("push project {project_id}"))?;
            print_json(&result)?;
        }
        RemoteCommand::Delete {
            project_id,
            row_keys,
        } => {
            let keys = row_keys
                .iter()
                .map(|raw| RowKey::parse(raw).with_context(|| format!("row key {raw:?}")))
                .collect::<Result<Vec<_>>>()?;
            let result = client
                .delete(project_id, &keys)
                .with_context(|| format!("delete rows in project {project_id}"))?;
            print_json(&result)?;
        }
    }
    Ok(())
}
