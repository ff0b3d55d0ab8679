//! Ensure CLI command failures honor `--output json`.

use std::path::PathBuf;
use std::process::Command;

use assert_cmd::cargo;

fn hed_cmd() -> Command {
    Command::new(cargo::cargo_bin!("hed"))
}

fn schema_path() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../schemas/hed_test.json")
        .to_string_lossy()
        .to_string()
}

fn envelope(output: &std::process::Output) -> serde_json::Value {
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid json envelope");
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "command_failed");
    json
}

#[test]
fn missing_input_file_emits_json_error_envelope() {
    let schema = schema_path();
    let output = hed_cmd()
        .args(["parse", "nope-does-not-exist.txt", "--schema", &schema, "--output", "json"])
        .output()
        .expect("run parse command");

    let json = envelope(&output);
    assert!(
        json["message"]
            .as_str()
            .is_some_and(|m| m.contains("failed to read")),
        "unexpected message: {}",
        json["message"]
    );
}

#[test]
fn missing_schema_emits_json_error_envelope() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input.txt");
    std::fs::write(&input, "Red\n").expect("write input");

    let output = hed_cmd()
        .args([
            "validate",
            input.to_str().unwrap(),
            "--schema",
            "missing-schema.json",
            "--output",
            "json",
        ])
        .output()
        .expect("run validate command");

    let json = envelope(&output);
    assert!(
        json["message"]
            .as_str()
            .is_some_and(|m| m.contains("failed to load schema")),
        "unexpected message: {}",
        json["message"]
    );
}

#[test]
fn malformed_library_argument_is_rejected() {
    let schema = schema_path();
    let output = hed_cmd()
        .args(["parse", "-", "--schema", &schema, "--library", "nolibpath"])
        .output()
        .expect("run parse command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("<prefix>=<path>"), "unexpected stderr: {stderr}");
}
