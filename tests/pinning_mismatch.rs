//! Resolving the compiled-in pinned Standard version against a submodule
//! tree whose artifacts don't match the recorded commit/digest fails
//! closed with the documented pinning-mismatch exit code (`spec.md` §4.2,
//! S6).

mod support;

use aimo_core::exit_codes::ExitCode;
use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn pinned_version_with_mismatched_fixture_aborts_with_pinning_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = camino::Utf8Path::from_path(dir.path()).unwrap();
    support::write_config(work_dir);
    let csv_path = support::write_openai_csv(work_dir);

    // No --standard-version override: the default resolves to the
    // compiled-in pin, which this fixture's fabricated artifacts cannot
    // legitimately match.
    support::aimo_cmd(work_dir)
        .arg(csv_path.file_name().unwrap())
        .assert()
        .failure()
        .code(ExitCode::PINNING_MISMATCH.as_i32())
        .stderr(predicate::str::contains("pin"));
}

#[test]
fn skip_pin_check_without_env_permission_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = camino::Utf8Path::from_path(dir.path()).unwrap();
    support::write_config(work_dir);
    let csv_path = support::write_openai_csv(work_dir);

    support::aimo_cmd(work_dir)
        .arg(csv_path.file_name().unwrap())
        .arg("--skip-pin-check")
        .env_remove("AIMO_ALLOW_SKIP_PINNING")
        .assert()
        .failure()
        .code(ExitCode::GUARDED_SKIP_MISUSE.as_i32());
}

#[test]
fn skip_pin_check_with_env_permission_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = camino::Utf8Path::from_path(dir.path()).unwrap();
    support::write_config(work_dir);
    let csv_path = support::write_openai_csv(work_dir);

    support::aimo_cmd(work_dir)
        .arg(csv_path.file_name().unwrap())
        .arg("--skip-pin-check")
        .env("AIMO_ALLOW_SKIP_PINNING", "1")
        .assert()
        .success();
}
