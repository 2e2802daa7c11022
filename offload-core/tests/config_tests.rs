//! Config error-message, atomic-write-safety, and desired-function building tests.
//! Layout: ~/.offload/config.yaml

use assert_fs::prelude::*;
use offload_core::{
    config::{self, CodeConfig},
    types::CodeReference,
    ConfigError, SpecError,
};
use predicates::prelude::predicate;
use std::fs;

const ARCHIVE_CONFIG: &str = r#"
store:
  endpoint: http://localhost:9000
  region: us-east-1
  bucket: artifacts
provider:
  endpoint: http://localhost:3001
  region: us-east-1
function:
  memory_mb: 512
  ephemeral_storage_mb: 1024
  role_arn: R1
  code:
    archive:
      path: build/runtime.zip
      key: runtime/offload-runtime.zip
      runtime: java21
      handler: dev.offload.Handler::handleRequest
"#;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
    assert!(err.to_string().contains("offload init"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".offload/config.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn load_missing_section_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".offload/config.yaml")
        .write_str("store:\n  endpoint: x\n  region: y\n  bucket: z\n")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_cleans_up_tmp() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::init_at(home.path(), false).expect("init");

    home.child(".offload/config.yaml")
        .assert(predicate::path::exists());
    home.child(".offload/config.yaml.tmp")
        .assert(predicate::path::missing());
}

#[test]
fn save_then_load_roundtrips() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let cfg: config::OffloadConfig = serde_yaml::from_str(ARCHIVE_CONFIG).expect("parse");
    config::save_at(home.path(), &cfg).expect("save");
    let loaded = config::load_at(home.path()).expect("load");
    assert_eq!(loaded, cfg);
}

// ---------------------------------------------------------------------------
// 3. Desired function building
// ---------------------------------------------------------------------------

#[test]
fn archive_config_resolves_relative_path_and_hashes_artifact() {
    let base = assert_fs::TempDir::new().expect("tempdir");
    base.child("build/runtime.zip")
        .write_binary(b"PK\x03\x04runtime")
        .expect("write");

    let cfg: config::OffloadConfig = serde_yaml::from_str(ARCHIVE_CONFIG).expect("parse");
    assert!(matches!(cfg.function.code, CodeConfig::Archive { .. }));
    assert_eq!(cfg.convergence, config::ConvergenceConfig::default());

    let spec = cfg.function.to_spec(base.path()).expect("spec");
    let CodeReference::PackagedArchive(archive) = spec.code() else {
        panic!("expected archive code");
    };
    assert_eq!(archive.path, base.path().join("build/runtime.zip"));
    assert_eq!(
        archive.content_hash,
        offload_core::ContentAddress::of_bytes(b"PK\x03\x04runtime")
    );
    assert!(spec.name().0.starts_with("offload-offload-runtime-zip-"));
}

#[test]
fn archive_config_without_artifact_is_missing_artifact() {
    let base = assert_fs::TempDir::new().expect("tempdir");
    let cfg: config::OffloadConfig = serde_yaml::from_str(ARCHIVE_CONFIG).expect("parse");
    let err = cfg.function.to_spec(base.path()).unwrap_err();
    assert!(matches!(err, SpecError::MissingArtifact { .. }), "got: {err}");
}

#[test]
fn unreadable_config_dir_is_io_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    // A directory where the file should be.
    fs::create_dir_all(home.path().join(".offload/config.yaml")).expect("mkdir");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "got: {err}");
}
