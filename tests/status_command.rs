//! `aimo status <run_id>` reconstructs a persisted run's KPI block without
//! resuming it (`SPEC_FULL.md` §6.1).

mod support;

use assert_cmd::prelude::*;
use serde_json::Value;

#[test]
fn status_reports_a_dry_run_without_requiring_the_standard_or_vendor_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = camino::Utf8Path::from_path(dir.path()).unwrap();
    support::write_config(work_dir);
    let csv_path = support::write_openai_csv(work_dir);

    let run_output = support::aimo_cmd(work_dir)
        .arg(csv_path.file_name().unwrap())
        .args(["--standard-version", "9.9.9"])
        .arg("--dry-run")
        .output()
        .unwrap();
    assert!(run_output.status.success());
    let stdout = String::from_utf8_lossy(&run_output.stdout);
    let run_id = stdout.lines().find_map(|l| l.strip_prefix("run_id: ")).unwrap().split_whitespace().next().unwrap().to_string();

    // status must work even though the dry run never resolved the Standard
    // past taxonomy/rule loading this session's fixture, and even with no
    // ANTHROPIC_API_KEY in the environment.
    let status_output = support::aimo_cmd(work_dir).args(["status", &run_id, "--json"]).output().unwrap();
    assert!(status_output.status.success(), "stderr: {}", String::from_utf8_lossy(&status_output.stderr));

    let payload: Value = serde_json::from_str(&String::from_utf8_lossy(&status_output.stdout)).unwrap();
    assert_eq!(payload["run"]["run_id"], serde_json::json!(run_id));
    assert_eq!(payload["run"]["status"], serde_json::json!("running"));
    assert_eq!(payload["kpi"]["input_rows"], serde_json::json!(2));
}

#[test]
fn status_on_an_unknown_run_id_fails() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = camino::Utf8Path::from_path(dir.path()).unwrap();
    support::write_config(work_dir);

    // Force the database file to exist by running an unrelated dry-run first.
    let csv_path = support::write_openai_csv(work_dir);
    support::aimo_cmd(work_dir)
        .arg(csv_path.file_name().unwrap())
        .args(["--standard-version", "9.9.9"])
        .arg("--dry-run")
        .assert()
        .success();

    support::aimo_cmd(work_dir).args(["status", "0000000000000000", "--json"]).assert().failure();
}
