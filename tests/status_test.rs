use protolock::{Commit, Config, ProtolockError, commit, init, status};
use std::fs;
use std::path::Path;

const CHANNEL_PROTO: &str = r#"
syntax = "proto3";
package api;

import "api/common.proto";

message Channel {
  int64 id = 1;
  string name = 2;
  string description = 3;
  Meta meta = 4;
}
"#;

const COMMON_PROTO: &str = r#"
syntax = "proto3";
package api;

message Meta {
  string owner = 1;
}
"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn setup() -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    write(dir.path(), "protos/api/channel.proto", CHANNEL_PROTO);
    write(dir.path(), "protos/api/common.proto", COMMON_PROTO);

    let config = Config {
        lock_dir: dir.path().to_path_buf(),
        proto_root: dir.path().join("protos"),
        ..Default::default()
    };
    (dir, config)
}

fn save(config: &Config, content: &str) {
    protolock::status::write_lock(config, content).unwrap();
}

#[test]
fn test_status_without_lock_is_missing_baseline() {
    let (_dir, config) = setup();
    let err = status(&config).unwrap_err();
    assert!(matches!(err, ProtolockError::MissingBaseline { .. }));

    let err = commit(&config).unwrap_err();
    assert!(matches!(err, ProtolockError::MissingBaseline { .. }));
}

#[test]
fn test_init_then_status_is_clean() {
    let (_dir, config) = setup();
    let content = init(&config).unwrap();
    save(&config, &content);

    let report = status(&config).unwrap();
    assert!(!report.has_warnings());

    let paths: Vec<&str> = report
        .updated
        .definitions
        .iter()
        .map(|d| d.protopath.as_str())
        .collect();
    assert_eq!(paths, vec!["api:/:channel.proto", "api:/:common.proto"]);
}

#[test]
fn test_init_refuses_existing_lock() {
    let (_dir, config) = setup();
    save(&config, &init(&config).unwrap());

    let err = init(&config).unwrap_err();
    assert!(matches!(err, ProtolockError::LockExists { .. }));
}

#[test]
fn test_commit_without_changes_is_identical() {
    let (_dir, config) = setup();
    let content = init(&config).unwrap();
    save(&config, &content);

    match commit(&config).unwrap() {
        Commit::Ready(committed) => assert_eq!(committed, content),
        Commit::Refused(report) => panic!("unexpected warnings: {:?}", report.warnings),
    }
}

#[test]
fn test_breaking_change_is_reported_and_blocks_commit() {
    let (dir, mut config) = setup();
    save(&config, &init(&config).unwrap());

    write(
        dir.path(),
        "protos/api/channel.proto",
        &CHANNEL_PROTO.replace("string description = 3;\n", ""),
    );

    let report = status(&config).unwrap();
    assert_eq!(report.warnings.len(), 2);
    assert!(report
        .warnings
        .iter()
        .all(|w| w.filepath.as_str() == "api:/:channel.proto"));

    assert!(matches!(commit(&config).unwrap(), Commit::Refused(_)));

    config.force = true;
    let Commit::Ready(content) = commit(&config).unwrap() else {
        panic!("force should always produce a lock");
    };
    save(&config, &content);
    assert!(!status(&config).unwrap().has_warnings());
}

#[test]
fn test_ignored_paths_are_not_tracked() {
    let (dir, mut config) = setup();
    write(dir.path(), "protos/vendor/other.proto", "syntax = \"proto3\";\nmessage Other {}\n");
    config.ignore = vec!["vendor".to_string()];

    let content = init(&config).unwrap();
    assert!(!content.contains("other.proto"));
    assert!(content.contains("api:/:channel.proto"));
}

#[test]
fn test_up_to_date_detects_stale_lock() {
    let (dir, mut config) = setup();
    save(&config, &init(&config).unwrap());

    // Adding a field is compatible but leaves the lock behind.
    write(
        dir.path(),
        "protos/api/common.proto",
        &COMMON_PROTO.replace("string owner = 1;", "string owner = 1;\n  string team = 2;"),
    );
    assert!(!status(&config).unwrap().has_warnings());

    config.up_to_date = true;
    let err = status(&config).unwrap_err();
    assert!(matches!(err, ProtolockError::OutOfDate));
}

#[test]
fn test_malformed_lock_file() {
    let (_dir, config) = setup();
    save(&config, "not json");

    let err = status(&config).unwrap_err();
    assert!(matches!(err, ProtolockError::MalformedSnapshot { .. }));
}

#[test]
fn test_types_from_imports_outside_the_tree() {
    let (dir, config) = setup();
    write(
        dir.path(),
        "protos/api/billing.proto",
        r#"
syntax = "proto3";
package api;

import "api/common.proto";
import "third_party/money.proto";

message Invoice {
  Meta meta = 1;
  third_party.Money total = 2;
}
"#,
    );

    let content = init(&config).unwrap();
    let lock = protolock::Protolock::from_json(&content).unwrap();
    let billing = lock
        .definitions
        .iter()
        .find(|d| d.protopath.as_str() == "api:/:billing.proto")
        .unwrap();

    let types: Vec<&str> = billing.def.messages[0]
        .fields
        .iter()
        .map(|f| f.type_name.as_str())
        .collect();
    assert_eq!(types, vec!["Meta", "third_party.Money"]);
    assert_eq!(billing.def.imports[1].path, "third_party/money.proto");
}
