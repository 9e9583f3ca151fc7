use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn atomicwrite() -> Command {
    Command::cargo_bin("atomicwrite").unwrap()
}

#[test]
fn shows_help() {
    atomicwrite()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn shows_version() {
    atomicwrite()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn writes_stdin_to_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.txt");
    std::fs::write(&path, b"old").unwrap();
    atomicwrite()
        .arg("write")
        .arg(&path)
        .write_stdin("from stdin")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert_eq!(std::fs::read(&path).unwrap(), b"from stdin");
}

#[test]
fn reads_input_from_env() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let path = dir.path().join("out.bin");
    std::fs::write(&input, b"\x00\x01\x02").unwrap();
    atomicwrite()
        .env("ATOMICWRITE_INPUT", &input)
        .arg("write")
        .arg(&path)
        .assert()
        .success();
    assert_eq!(std::fs::read(&path).unwrap(), b"\x00\x01\x02");
}

#[test]
fn missing_directory_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("out.txt");
    atomicwrite()
        .arg("write")
        .arg(&path)
        .write_stdin("data")
        .assert()
        .failure()
        .stderr(predicate::str::contains("opening the parent directory failed"));
}

#[test]
fn check_reports_passed() {
    let dir = tempdir().unwrap();
    atomicwrite()
        .current_dir(dir.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::diff("PASSED\n"));
    assert!(dir.path().join("check.result").exists());
}
