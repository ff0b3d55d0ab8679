//! Build script for generating diagnostic code data structures at compile time.
//!
//! This script reads `data/diagnostics.json` and generates Rust files:
//! - `generated_codes.rs`: public constants mapping diagnostic constant names to their IDs
//! - `generated_explain.rs`: a match expression mapping diagnostic IDs to their descriptions
//! - `generated_severity.rs`: code → default severity lookup
//! - `generated_hed_codes.rs`: code → standard HED issue code lookup

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;

fn main() {
    let catalogue_path = Path::new("data/diagnostics.json");
    println!("cargo:rerun-if-changed={}", catalogue_path.display());

    let raw = fs::read_to_string(catalogue_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", catalogue_path.display()));

    let catalogue: serde_json::Value =
        serde_json::from_str(&raw).expect("failed to parse diagnostics.json");

    let diagnostics = catalogue["diagnostics"]
        .as_array()
        .expect("diagnostics.json: expected `diagnostics` array");

    let out_dir = env::var("OUT_DIR").unwrap();
    let out_path = Path::new(&out_dir);

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_names: HashSet<String> = HashSet::new();

    // ── generated_codes.rs ──────────────────────────────────────────────
    let mut codes =
        String::from("// Auto-generated from data/diagnostics.json. DO NOT EDIT.\n\n");

    for (i, entry) in diagnostics.iter().enumerate() {
        let id = entry["id"]
            .as_str()
            .unwrap_or_else(|| panic!("diagnostics[{i}] missing `id`"));
        let const_name = entry["constName"]
            .as_str()
            .unwrap_or_else(|| panic!("diagnostics[{i}] (id={id}) missing `constName`"));
        let summary = entry["summary"]
            .as_str()
            .unwrap_or_else(|| panic!("diagnostics[{i}] (id={id}) missing `summary`"));

        assert!(
            id.len() == 7 && id.starts_with("HED") && id[3..].bytes().all(|b| b.is_ascii_digit()),
            "diagnostics[{i}]: id '{id}' must look like HED####"
        );
        assert!(
            !const_name.is_empty()
                && const_name
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
                && const_name.as_bytes()[0].is_ascii_uppercase(),
            "diagnostics[{i}] (id={id}): constName '{const_name}' is not a valid SCREAMING_SNAKE_CASE identifier"
        );
        assert!(
            seen_ids.insert(id.to_string()),
            "diagnostics[{i}]: duplicate id '{id}'"
        );
        assert!(
            seen_names.insert(const_name.to_string()),
            "diagnostics[{i}] (id={id}): duplicate constName '{const_name}'"
        );

        codes.push_str(&format!("/// {summary}\n"));
        codes.push_str(&format!("pub const {const_name}: &str = \"{id}\";\n\n"));
    }

    codes.push_str("/// Every diagnostic code, in catalogue order.\n");
    codes.push_str("pub const ALL: &[&str] = &[\n");
    for entry in diagnostics {
        let const_name = entry["constName"].as_str().unwrap();
        codes.push_str(&format!("    {const_name},\n"));
    }
    codes.push_str("];\n");

    fs::write(out_path.join("generated_codes.rs"), &codes)
        .expect("failed to write generated_codes.rs");

    // ── generated_explain.rs ────────────────────────────────────────────
    let mut explain = String::from("match id {\n");
    for (i, entry) in diagnostics.iter().enumerate() {
        let id = entry["id"].as_str().unwrap();
        let description = entry["description"]
            .as_str()
            .unwrap_or_else(|| panic!("diagnostics[{i}] (id={id}) missing `description`"));
        let escaped = escape_rust_string_literal(description);
        explain.push_str(&format!("    \"{id}\" => Some(\"{escaped}\"),\n"));
    }
    explain.push_str("    _ => None,\n}\n");
    fs::write(out_path.join("generated_explain.rs"), &explain)
        .expect("failed to write generated_explain.rs");

    // ── generated_severity.rs ───────────────────────────────────────────
    let mut severity = String::from("match id {\n");
    for (i, entry) in diagnostics.iter().enumerate() {
        let id = entry["id"].as_str().unwrap();
        let sev = entry["severity"]
            .as_str()
            .unwrap_or_else(|| panic!("diagnostics[{i}] (id={id}) missing `severity`"));
        let sev_rs = match sev {
            "error" => "Severity::Error",
            "warn" => "Severity::Warn",
            other => panic!("diagnostics[{i}] (id={id}): invalid severity '{other}'"),
        };
        severity.push_str(&format!("    \"{id}\" => Some({sev_rs}),\n"));
    }
    severity.push_str("    _ => None,\n}\n");
    fs::write(out_path.join("generated_severity.rs"), &severity)
        .expect("failed to write generated_severity.rs");

    // ── generated_hed_codes.rs ──────────────────────────────────────────
    let mut hed_codes = String::from("match id {\n");
    for (i, entry) in diagnostics.iter().enumerate() {
        let id = entry["id"].as_str().unwrap();
        let hed_code = entry["hedCode"]
            .as_str()
            .unwrap_or_else(|| panic!("diagnostics[{i}] (id={id}) missing `hedCode`"));
        assert!(
            hed_code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b == b'_'),
            "diagnostics[{i}] (id={id}): hedCode '{hed_code}' must be SCREAMING_SNAKE_CASE"
        );
        hed_codes.push_str(&format!("    \"{id}\" => Some(\"{hed_code}\"),\n"));
    }
    hed_codes.push_str("    _ => None,\n}\n");
    fs::write(out_path.join("generated_hed_codes.rs"), &hed_codes)
        .expect("failed to write generated_hed_codes.rs");
}

fn escape_rust_string_literal(value: &str) -> String {
    value.chars().flat_map(char::escape_default).collect()
}
