use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("kodegen_bundler_tarballs").expect("binary builds");
    cmd.env_remove("KODEGEN_NEXT_VERSION").env_remove("OSX_KEYCHAIN");
    cmd
}

fn write_project(root: &Path, oclif: &str) {
    std::fs::create_dir_all(root).expect("mkdir");
    std::fs::write(
        root.join("package.json"),
        format!(r#"{{"name":"mycli","version":"1.0.0","oclif":{oclif}}}"#),
    )
    .expect("write package.json");
}

#[test]
fn help_lists_commands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("pack-macos"));
}

#[test]
fn missing_root_is_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    cli()
        .args(["build", "--root"])
        .arg(tmp.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn unknown_target_is_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    cli()
        .args(["build", "--targets", "linux-sparc", "--root"])
        .arg(tmp.path())
        .assert()
        .failure();
}

#[test]
fn missing_package_json_suggests_root() {
    let tmp = tempfile::tempdir().expect("tempdir");
    cli()
        .args(["build", "--root"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Fatal error"));
}

#[test]
fn pack_macos_without_identifier_writes_nothing() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path().join("mycli");
    write_project(&root, r#"{"bin":"mycli","update":{"node":{"version":"20.11.1"}}}"#);

    // Fails on the host check off macOS and on the identifier check on it.
    cli()
        .args(["pack-macos", "--root"])
        .arg(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Fatal error"));

    assert!(!root.join("dist").exists());
    assert!(!root.join("tmp").exists());
}
