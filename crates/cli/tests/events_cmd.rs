//! CLI tests for `hed events`.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use assert_cmd::cargo;

fn hed_cmd() -> Command {
    Command::new(cargo::cargo_bin!("hed"))
}

fn run_events(tsv: &str, extra: &[&str]) -> (bool, serde_json::Value) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.tsv");
    fs::write(&path, tsv).expect("write events");
    let schema = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../schemas/hed_test.json");
    let output = hed_cmd()
        .arg("events")
        .arg(&path)
        .args(["--schema", schema.to_str().unwrap(), "--output", "json"])
        .args(extra)
        .output()
        .expect("run events command");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    (output.status.success(), json)
}

#[test]
fn consistent_timeline() {
    let tsv = "onset\tduration\tHED\n\
               2.0\tn/a\t(Offset, Def/Foo)\n\
               1.0\tn/a\t(Onset, Def/Foo), Red\n\
               1.5\tn/a\tBlue\n";
    let (success, json) = run_events(tsv, &[]);
    assert!(success, "{json}");
    let events = json["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["kind"], "Onset");
    assert_eq!(events[0]["definition"], "foo");
    assert_eq!(events[0]["line"], 3);
    assert_eq!(events[1]["kind"], "Offset");
}

#[test]
fn offset_without_onset() {
    let tsv = "onset\tHED\n3.0\t(Offset, Def/Bar)\n";
    let (success, json) = run_events(tsv, &[]);
    assert!(!success);
    assert_eq!(json["diagnostics"][0]["id"], "HED5003");
}

#[test]
fn marker_in_row_without_onset() {
    let tsv = "onset\tHED\nn/a\t(Onset, Def/Foo)\n";
    let (success, json) = run_events(tsv, &[]);
    assert!(!success);
    assert_eq!(json["diagnostics"][0]["id"], "HED5002");
}

#[test]
fn tolerance_flag() {
    let tsv = "onset\tHED\n1.0\t(Onset, Def/Foo)\n1.2\t(Offset, Def/Foo)\n";
    assert!(run_events(tsv, &[]).0);
    let (success, json) = run_events(tsv, &["--tolerance", "0.5"]);
    assert!(!success);
    assert_eq!(json["diagnostics"][0]["id"], "HED5004");
}

#[test]
fn parse_errors_stop_the_timeline() {
    let tsv = "onset\tHED\n1.0\t(Onset, Def/Foo)\n2.0\tFoo\n";
    let (success, json) = run_events(tsv, &[]);
    assert!(!success);
    assert_eq!(json["diagnostics"][0]["id"], "HED2003");
    assert!(json["events"].as_array().unwrap().is_empty());
}
