use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use predicates::str::contains;

fn offload_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("offload"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn pack_then_unpack_round_trips_a_tree() {
    let home = TempDir::new().unwrap();
    let src = TempDir::new().unwrap();
    src.child("bin/run.sh").write_str("#!/bin/sh\necho run\n").unwrap();
    src.child("data/input.txt").write_str("payload").unwrap();
    let archive = home.child("work.tar.zst");
    let dest = TempDir::new().unwrap();

    offload_cmd(home.path())
        .arg("pack")
        .arg(src.path())
        .arg("-o")
        .arg(archive.path())
        .assert()
        .success()
        .stdout(contains("checksum:"));
    archive.assert(predicate::path::is_file());

    offload_cmd(home.path())
        .arg("unpack")
        .arg(archive.path())
        .arg(dest.path())
        .assert()
        .success()
        .stdout(contains("Unpacked 2 files"));

    dest.child("bin/run.sh")
        .assert(predicate::str::contains("echo run"));
    dest.child("data/input.txt").assert("payload");
}

#[cfg(unix)]
#[test]
fn unpack_restores_executable_bit() {
    use std::os::unix::fs::PermissionsExt;

    let home = TempDir::new().unwrap();
    let src = TempDir::new().unwrap();
    let script = src.child("run.sh");
    script.write_str("#!/bin/sh\n").unwrap();
    fs::set_permissions(script.path(), fs::Permissions::from_mode(0o750)).unwrap();
    let archive = home.child("a.tar.zst");
    let dest = TempDir::new().unwrap();

    offload_cmd(home.path())
        .arg("pack")
        .arg(src.path())
        .arg("-o")
        .arg(archive.path())
        .assert()
        .success();
    offload_cmd(home.path())
        .arg("unpack")
        .arg(archive.path())
        .arg(dest.path())
        .assert()
        .success();

    let mode = fs::metadata(dest.path().join("run.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o750);
}

#[test]
fn pack_of_missing_directory_fails() {
    let home = TempDir::new().unwrap();
    offload_cmd(home.path())
        .args(["pack", "/definitely/not/here", "-o"])
        .arg(home.child("x.tar.zst").path())
        .assert()
        .failure()
        .stderr(contains("failed to pack"));
}

#[test]
fn init_writes_config_once() {
    let home = TempDir::new().unwrap();

    offload_cmd(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("config.yaml"));
    home.child(".offload/config.yaml")
        .assert(predicate::str::contains("offline_status_codes"));

    offload_cmd(home.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(contains("already exists"));

    offload_cmd(home.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn init_honours_explicit_config_path() {
    let home = TempDir::new().unwrap();
    let target = home.child("custom/offload.yaml");

    offload_cmd(home.path())
        .arg("--config")
        .arg(target.path())
        .arg("init")
        .assert()
        .success();

    target.assert(predicate::path::is_file());
    home.child(".offload/config.yaml")
        .assert(predicate::path::missing());
}

#[test]
fn plan_without_config_points_at_init() {
    let home = TempDir::new().unwrap();
    offload_cmd(home.path())
        .arg("plan")
        .assert()
        .failure()
        .stderr(contains("offload init"));
}

#[test]
fn resolve_with_missing_archive_artifact_fails_before_any_network_call() {
    let home = TempDir::new().unwrap();
    let config = home.child("offload.yaml");
    config
        .write_str(
            r#"
store:
  endpoint: http://127.0.0.1:1
  region: us-east-1
  bucket: artifacts
  access_key_id: AKID
  secret_access_key: secret
provider:
  endpoint: http://127.0.0.1:1
  region: us-east-1
  access_key_id: AKID
  secret_access_key: secret
function:
  memory_mb: 512
  ephemeral_storage_mb: 1024
  role_arn: R1
  code:
    archive:
      path: build/missing.zip
      key: bundles/missing.zip
      runtime: provided.al2023
      handler: bootstrap
"#,
        )
        .unwrap();

    offload_cmd(home.path())
        .arg("--config")
        .arg(config.path())
        .arg("resolve")
        .assert()
        .failure()
        .stderr(contains("missing.zip"));
}

#[test]
fn help_lists_every_command() {
    let home = TempDir::new().unwrap();
    let output = offload_cmd(home.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["init", "plan", "resolve", "pack", "unpack", "ship", "fetch"] {
        assert!(stdout.contains(command), "missing {command} in:\n{stdout}");
    }
}
