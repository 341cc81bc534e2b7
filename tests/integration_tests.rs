use assert_cmd::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

#[test]
fn runs_without_arguments() {
    let mut cmd = Command::cargo_bin("fpc").unwrap();
    cmd.assert().success();
}

fn program_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fpc-test-{name}-{}.fpc", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn check_accepts_a_valid_program() {
    let path = program_file(
        "valid",
        "# blink the first output\nGET I 0\nMOV O 0\n",
    );
    let mut cmd = Command::cargo_bin("fpc").unwrap();
    cmd.arg("check").arg(&path).assert().success();
}

#[test]
fn check_rejects_a_broken_program() {
    let path = program_file("broken", "GET 1\nFROB O 0\n");
    let mut cmd = Command::cargo_bin("fpc").unwrap();
    cmd.arg("check").arg(&path).assert().failure();
}

#[test]
fn run_with_duration_completes() {
    let path = program_file("run", "GET 1\nMOV O 0\n");
    let mut cmd = Command::cargo_bin("fpc").unwrap();
    cmd.arg("run")
        .arg(&path)
        .args(["--duration", "1"])
        .assert()
        .success();
}

#[test]
fn run_reports_execution_fault() {
    let path = program_file("fault", "NOT\n");
    let mut cmd = Command::cargo_bin("fpc").unwrap();
    cmd.arg("run")
        .arg(&path)
        .args(["--duration", "2"])
        .assert()
        .failure();
}
