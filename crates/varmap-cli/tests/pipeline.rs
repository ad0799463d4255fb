//! Integration tests for session assembly.

use std::fs;
use std::path::PathBuf;

use varmap_cli::pipeline::{SessionOptions, build_session, match_policy, parse_new_variable};
use varmap_core::MatchPolicy;
use varmap_model::Origin;
use varmap_report::ExportView;

fn base_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/base_mapping.csv")
}

fn write_upload(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn shipped_base_table_loads() {
    let build = build_session(&SessionOptions {
        base: base_path(),
        ..SessionOptions::default()
    })
    .unwrap();
    let master = build.session.master();
    assert_eq!(master.len(), 17);
    assert!(master.keys().count() == 17);
    assert_eq!(build.session.tree().tree.leaf_count(), 17);
}

#[test]
fn uploads_are_applied_in_order_and_selected() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_upload(
        &dir,
        "first.csv",
        "Variable,Organ System,Group,Source,Unit\nProcalcitonin,Infection,Blood,EPIC,ng/mL\n",
    );
    let second = write_upload(
        &dir,
        "second.csv",
        "Variable,Organ System,Group,Source,Unit\nProcalcitonin,Infection,Blood,EPIC,ug/L\n",
    );
    let build = build_session(&SessionOptions {
        base: base_path(),
        uploads: vec![first, second],
        policy: match_policy(true, &[]).unwrap(),
        ..SessionOptions::default()
    })
    .unwrap();

    assert_eq!(build.uploads.len(), 2);
    assert_eq!(build.uploads[0].report.summary.added, 1);
    assert_eq!(build.uploads[1].report.summary.updated, 1);

    let rows = build.session.selected_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("Unit"), Some("ug/L"));
    assert_eq!(rows[0].origin(), Origin::UserUpload);
}

#[test]
fn selection_reference_and_manual_rows_feed_the_export() {
    let start = build_session(&SessionOptions {
        base: base_path(),
        ..SessionOptions::default()
    })
    .unwrap();
    let heart_rate = start
        .session
        .master()
        .rows()
        .iter()
        .find(|row| row.variable() == Some("Heart Rate"))
        .and_then(|row| row.key.clone())
        .unwrap();

    let build = build_session(&SessionOptions {
        base: base_path(),
        selection: Some(format!("{heart_rate},ffffffffff")),
        add_variables: vec![parse_new_variable("Variable=Troponin T;Unit=ng/L").unwrap()],
        project_name: Some("ICU Study".to_string()),
        ..SessionOptions::default()
    })
    .unwrap();
    assert_eq!(build.unresolved, 1);
    assert_eq!(build.added.len(), 1);

    let view = ExportView::from_session(&build.session);
    assert_eq!(view.len(), 2);
    let origin_index = view.columns().iter().position(|c| c == "Origin").unwrap();
    let origins: Vec<&str> = view
        .records()
        .iter()
        .map(|record| record[origin_index].as_str())
        .collect();
    assert_eq!(origins, vec!["Base", "User created"]);
}

#[test]
fn select_all_selects_every_master_row() {
    let build = build_session(&SessionOptions {
        base: base_path(),
        select_all: true,
        policy: MatchPolicy::default(),
        ..SessionOptions::default()
    })
    .unwrap();
    assert_eq!(build.session.selected_rows().len(), 17);
}

#[test]
fn invalid_upload_fails_the_whole_session() {
    let dir = tempfile::tempdir().unwrap();
    let upload = write_upload(&dir, "bad.csv", "Name,Unit\nX,mg\n");
    let err = build_session(&SessionOptions {
        base: base_path(),
        uploads: vec![upload],
        ..SessionOptions::default()
    })
    .unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("bad.csv"));
    assert!(message.contains("Variable"));
}

#[test]
fn missing_base_file_is_reported() {
    let err = build_session(&SessionOptions {
        base: PathBuf::from("/nonexistent/base.csv"),
        ..SessionOptions::default()
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("base.csv"));
}
