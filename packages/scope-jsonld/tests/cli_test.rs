//! Tests for the `scope-jsonld` binary.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn scope_jsonld() -> Command {
    let mut cmd = Command::cargo_bin("scope-jsonld").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("SCOPE_CHANNEL_CAPACITY");
    cmd
}

#[test]
fn test_converts_to_stdout() {
    let output = scope_jsonld()
        .arg("--properties")
        .arg(fixture("properties.json"))
        .arg("--context")
        .arg(fixture("context.json"))
        .arg(fixture("archive.xml"))
        .assert()
        .success()
        .stderr(predicate::str::contains("parse scope file"))
        .get_output()
        .stdout
        .clone();

    let doc: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(doc["@graph"].as_array().unwrap().len(), 4);
    assert_eq!(doc["@graph"][1]["keywords"][1], "Trauungen");
}

#[test]
fn test_writes_output_directory() {
    let dir = tempfile::tempdir().unwrap();

    scope_jsonld()
        .arg("-o")
        .arg(dir.path())
        .arg(fixture("archive.xml"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = std::fs::read_to_string(dir.path().join("archive.jsonld")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(doc["@graph"][0]["@id"], "file-7-1");
}

#[test]
fn test_failed_file_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();

    scope_jsonld()
        .arg("-o")
        .arg(dir.path())
        .arg(fixture("truncated.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));

    assert!(!dir.path().join("truncated.jsonld").exists());
}

#[test]
fn test_inputs_sharing_an_output_name_are_rejected() {
    let inputs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    for dir in ["a", "b"] {
        std::fs::create_dir(inputs.path().join(dir)).unwrap();
    }
    let good = inputs.path().join("a").join("x.xml");
    let broken = inputs.path().join("b").join("x.xml");
    std::fs::copy(fixture("archive.xml"), &good).unwrap();
    std::fs::copy(fixture("truncated.xml"), &broken).unwrap();

    scope_jsonld()
        .arg("-o")
        .arg(out.path())
        .arg(&good)
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("would both be written to"));

    assert!(!out.path().join("x.jsonld").exists());

    scope_jsonld()
        .arg("-o")
        .arg(out.path())
        .arg(&good)
        .assert()
        .success();
    let written = std::fs::read_to_string(out.path().join("x.jsonld")).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&written).is_ok());
}

#[test]
fn test_missing_output_directory() {
    scope_jsonld()
        .arg("-o")
        .arg("/nonexistent/scope-jsonld-out")
        .arg(fixture("archive.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Output directory does not exist"));
}

#[test]
fn test_requires_input_files() {
    scope_jsonld().assert().failure();
}

#[test]
fn test_invalid_property_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let map = dir.path().join("map.json");
    std::fs::write(&map, r#"{"10": "@id"}"#).unwrap();

    scope_jsonld()
        .arg("-p")
        .arg(&map)
        .arg(fixture("archive.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("reserved property"));
}
