//! CLI tests for `hed parse` and `hed format`.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use assert_cmd::cargo;

fn hed_cmd() -> Command {
    Command::new(cargo::cargo_bin!("hed"))
}

fn schema_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../schemas")
}

fn run_json(args: &[&str], content: &str) -> (bool, serde_json::Value) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("input.txt");
    fs::write(&path, content).expect("write input");
    let schema = schema_dir().join("hed_test.json");
    let library = format!("tl={}", schema_dir().join("hed_test_lib.json").display());
    let output = hed_cmd()
        .args(args)
        .arg(&path)
        .args(["--schema", schema.to_str().unwrap(), "--library", &library])
        .args(["--output", "json"])
        .output()
        .expect("run command");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    (output.status.success(), json)
}

#[test]
fn parse_prints_tree_per_line() {
    let (success, json) = run_json(&["parse"], "Red, (Blue, {col})\ntl:Eye-blink-artifact\n");
    assert!(success);
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0]["tree"].is_object());
    assert_eq!(records[1]["line"], 2);
    assert!(records[1]["diagnostics"].as_array().unwrap().is_empty());
}

#[test]
fn parse_failure_has_null_tree() {
    let (success, json) = run_json(&["parse"], "(Red\n");
    assert!(!success);
    assert!(json[0]["tree"].is_null());
    assert_eq!(json[0]["diagnostics"][0]["id"], "HED1004");
}

#[test]
fn format_short_form() {
    let (success, json) = run_json(
        &["format"],
        "Event/Sensory-event,(Property/Sensory-property/Sensory-attribute/Visual-attribute/Color/Red)\n",
    );
    assert!(success);
    assert_eq!(json[0]["formatted"], "Sensory-event, (Red)");
}

#[test]
fn format_long_compact() {
    let (success, json) = run_json(
        &["format", "--long", "--compact"],
        "tl:Eye-blink-artifact, Event\n",
    );
    assert!(success);
    assert_eq!(json[0]["formatted"], "tl:Artifact/Eye-blink-artifact,Event");
}

#[test]
fn format_reports_unparseable_lines() {
    let (success, json) = run_json(&["format"], "Red\nFoo\n");
    assert!(!success);
    assert_eq!(json[0]["formatted"], "Red");
    assert!(json[1]["formatted"].is_null());
}
