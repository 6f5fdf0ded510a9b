//! End-to-end run against a rule-matching input: ingest -> normalize/detect
//! -> rule classify -> bundle emission -> validation (`spec.md` §4.1-§4.10,
//! S4).

mod support;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

#[test]
fn rule_matched_row_produces_a_passing_evidence_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = camino::Utf8Path::from_path(dir.path()).unwrap();
    support::write_config(work_dir);
    let csv_path = support::write_openai_csv(work_dir);

    support::aimo_cmd(work_dir)
        .arg(csv_path.file_name().unwrap())
        .args(["--standard-version", "9.9.9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("candidates (A/B/C):"))
        .stdout(predicate::str::contains("bundle:"));

    let out_dir = work_dir.join("out");
    let run_dirs: Vec<_> = std::fs::read_dir(out_dir.as_std_path()).unwrap().filter_map(|e| e.ok()).collect();
    assert_eq!(run_dirs.len(), 1, "exactly one run directory should be written");
    let bundle_dir = camino::Utf8PathBuf::from_path_buf(run_dirs[0].path()).unwrap();

    let manifest: Value = serde_json::from_str(&std::fs::read_to_string(bundle_dir.join("evidence_pack_manifest.json")).unwrap()).unwrap();
    let taxonomy_summary = manifest.get("taxonomy_summary").unwrap();
    for dim in ["FS", "IM", "UC", "DT", "CH", "RS", "EV"] {
        let codes = taxonomy_summary.get(dim).and_then(Value::as_array).unwrap_or_else(|| panic!("missing {dim} in taxonomy_summary"));
        assert!(!codes.is_empty(), "dimension {dim} must carry at least one code");
    }
    assert_eq!(taxonomy_summary.get("FS").unwrap(), &serde_json::json!(["FS-001"]));

    let validation: Value = serde_json::from_str(&std::fs::read_to_string(bundle_dir.join("validation_result.json")).unwrap()).unwrap();
    assert_eq!(validation["passed"], serde_json::json!(true));
    assert_eq!(validation["error_count"], serde_json::json!(0));

    let checksums: Value = serde_json::from_str(&std::fs::read_to_string(bundle_dir.join("checksums.json")).unwrap()).unwrap();
    let files = checksums["files"].as_object().unwrap();
    assert!(files.contains_key("evidence_pack_manifest.json"));
}

#[test]
fn rerunning_the_same_input_resumes_the_existing_run_without_duplicating_rows() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = camino::Utf8Path::from_path(dir.path()).unwrap();
    support::write_config(work_dir);
    let csv_path = support::write_openai_csv(work_dir);

    let first = support::aimo_cmd(work_dir)
        .arg(csv_path.file_name().unwrap())
        .args(["--standard-version", "9.9.9"])
        .output()
        .unwrap();
    assert!(first.status.success());
    let first_stdout = String::from_utf8_lossy(&first.stdout).to_string();
    let run_id = extract_run_id(&first_stdout);

    let second = support::aimo_cmd(work_dir)
        .arg(csv_path.file_name().unwrap())
        .args(["--standard-version", "9.9.9"])
        .output()
        .unwrap();
    assert!(second.status.success());
    let second_stdout = String::from_utf8_lossy(&second.stdout).to_string();
    let second_run_id = extract_run_id(&second_stdout);

    assert_eq!(run_id, second_run_id, "identical input + versions must resolve to the same run_id (I1)");

    let first_rows = extract_field(&first_stdout, "input_rows:");
    let second_rows = extract_field(&second_stdout, "input_rows:");
    assert_eq!(first_rows, second_rows, "a second run over the same input must not double-count rows (RT2)");
}

fn extract_run_id(stdout: &str) -> String {
    stdout
        .lines()
        .find_map(|l| l.strip_prefix("run_id: "))
        .map(|s| s.split_whitespace().next().unwrap_or(s).to_string())
        .expect("stdout should contain a run_id line")
}

fn extract_field<'a>(stdout: &'a str, label: &str) -> &'a str {
    stdout.lines().find_map(|l| l.trim().strip_prefix(label)).map(str::trim).expect("expected field not found in stdout")
}
