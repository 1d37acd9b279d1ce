use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    process,
};
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn project() -> PathBuf {
    fixtures().join("project")
}

fn has_node() -> bool {
    process::Command::new("node")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

/// `str` running in the fixture project, with temp dirs redirected to `tmp`.
fn str_cmd(tmp: &TempDir) -> Result<Command> {
    let mut cmd = Command::cargo_bin("str")?;
    cmd.current_dir(project())
        .env("TMPDIR", tmp.path())
        .env_remove("STR_RUNTIME")
        .arg("--node-modules")
        .arg(fixtures().join("node_modules"));
    Ok(cmd)
}

fn assert_no_leftovers(tmp: &TempDir) -> Result<()> {
    assert_eq!(fs::read_dir(tmp.path())?.count(), 0);
    Ok(())
}

#[test]
fn missing_files_argument_should_print_usage() -> Result<()> {
    Command::cargo_bin("str")?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
    Ok(())
}

#[test]
fn syntax_error_should_exit_1_with_diagnostics() -> Result<()> {
    let tmp = TempDir::new()?;
    str_cmd(&tmp)?
        .arg("broken.test.ts")
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("error:").and(predicate::str::contains("broken.test.ts:3:")),
        );
    assert_no_leftovers(&tmp)
}

#[test]
fn missing_test_file_should_exit_1() -> Result<()> {
    let tmp = TempDir::new()?;
    str_cmd(&tmp)?
        .arg("nope.test.ts")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not resolve \"./nope.test.ts\""));
    assert_no_leftovers(&tmp)
}

#[test]
fn bundle_should_be_handed_to_runtime() -> Result<()> {
    let tmp = TempDir::new()?;
    let dirname = format!("__dirname = '{}'", project().join("nested").display());
    str_cmd(&tmp)?
        .args(["--runtime", "cat", "nested/dirname.test.ts"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"./nested/dirname.test.ts\": function")
                .and(predicate::str::contains(dirname))
                .and(predicate::str::contains("require(\"str\")")),
        );
    assert_no_leftovers(&tmp)
}

#[test]
fn missing_runtime_should_abort_instead_of_reporting_a_result() -> Result<()> {
    let tmp = TempDir::new()?;
    let output = str_cmd(&tmp)?
        .args(["--runtime", "str-no-such-runtime", "pass.test.ts"])
        .output()?;

    let code = output.status.code();
    assert!(!output.status.success());
    assert_ne!(code, Some(1), "internal errors must not look like test failures");
    assert!(String::from_utf8_lossy(&output.stderr).contains("str-no-such-runtime"));
    assert_no_leftovers(&tmp)
}

#[cfg(unix)]
#[test]
fn killed_test_process_should_abort_instead_of_reporting_a_result() -> Result<()> {
    let tmp = TempDir::new()?;
    let runtime = tmp.path().join("killer.sh");
    fs::write(&runtime, "#!/bin/sh\nkill -9 $$\n")?;
    make_executable(&runtime)?;
    let tmp_root = TempDir::new()?;

    let output = str_cmd(&tmp_root)?
        .arg("--runtime")
        .arg(&runtime)
        .arg("pass.test.ts")
        .output()?;

    assert!(!output.status.success());
    assert_ne!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("without an exit status"));
    assert_no_leftovers(&tmp_root)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[test]
fn config_file_should_select_runtime() -> Result<()> {
    let tmp = TempDir::new()?;
    let config = tmp.path().join("str.yml");
    fs::write(&config, "runtime: \"false\"\n")?;
    let tmp_root = TempDir::new()?;

    str_cmd(&tmp_root)?
        .arg("--config")
        .arg(&config)
        .arg("pass.test.ts")
        .assert()
        .code(1);
    assert_no_leftovers(&tmp_root)
}

#[test]
fn passing_test_should_exit_0() -> Result<()> {
    if !has_node() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    str_cmd(&tmp)?.arg("pass.test.ts").assert().success();
    assert_no_leftovers(&tmp)
}

#[test]
fn failing_test_should_exit_non_zero() -> Result<()> {
    if !has_node() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    str_cmd(&tmp)?
        .arg("fail.test.ts")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("FAIL fail.test.ts"));
    assert_no_leftovers(&tmp)
}

#[test]
fn one_failing_file_should_fail_the_run() -> Result<()> {
    if !has_node() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    str_cmd(&tmp)?.args(["pass.test.ts", "fail.test.ts"]).assert().code(1);
    str_cmd(&tmp)?
        .args(["--isolate", "pass.test.ts", "fail.test.ts"])
        .assert()
        .code(1);
    str_cmd(&tmp)?.args(["--isolate", "pass.test.ts"]).assert().success();
    assert_no_leftovers(&tmp)
}

#[test]
fn dirname_should_be_the_test_file_directory() -> Result<()> {
    if !has_node() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    str_cmd(&tmp)?
        .env("EXPECTED_DIRNAME", project().join("nested"))
        .arg("nested/dirname.test.ts")
        .assert()
        .success();
    assert_no_leftovers(&tmp)
}
