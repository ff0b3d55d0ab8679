//! Shared test helpers for `hed_toolchain_core` integration tests.

#![allow(unreachable_pub)]

use hed_toolchain_core::{
    Diagnostic, HedSchema, HedSchemas, ParseOptions, ParsedHedString, parse_hed_string,
    validate_hed_string,
};
use std::path::Path;
use std::sync::LazyLock;

fn load_schema(file: &str) -> HedSchema {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../schemas")
        .join(file);
    HedSchema::from_path(&path)
        .unwrap_or_else(|e| panic!("failed to load {}: {}", path.display(), e))
}

/// Test schemas loaded once per test binary: the base schema plus the
/// `testlib` library under the `tl` prefix.
pub static SCHEMAS: LazyLock<HedSchemas> = LazyLock::new(|| {
    let mut schemas = HedSchemas::with_base(load_schema("hed_test.json"));
    schemas.insert("tl", load_schema("hed_test_lib.json"));
    schemas
});

// ─── Parse helpers ───────────────────────────────────────────────────────────

/// Parse a string that must be valid.
#[allow(dead_code)]
pub fn parse_ok(input: &str) -> ParsedHedString<'static> {
    let result = parse_hed_string(input, &SCHEMAS);
    match result.parsed {
        Some(parsed) => parsed,
        None => panic!("{input:?} failed to parse: {:?}", result.diagnostics),
    }
}

/// Diagnostic codes from parsing `input`.
#[allow(dead_code)]
pub fn parse_codes(input: &str) -> Vec<String> {
    diag_codes(&parse_hed_string(input, &SCHEMAS).diagnostics)
}

/// Error codes from validating `input` with `options`.
#[allow(dead_code)]
pub fn validate_codes(input: &str, options: &ParseOptions) -> Vec<String> {
    diag_codes(&validate_hed_string(input, &SCHEMAS, options).errors)
}

// ─── Diagnostic helpers ──────────────────────────────────────────────────────

/// Collect diagnostic codes in order.
#[allow(dead_code)]
pub fn diag_codes(diags: &[Diagnostic]) -> Vec<String> {
    diags.iter().map(|d| d.id.to_string()).collect()
}

/// First diagnostic with the given code.
#[allow(dead_code)]
pub fn find_diag<'a>(diags: &'a [Diagnostic], code: &str) -> &'a Diagnostic {
    diags
        .iter()
        .find(|d| d.id == code)
        .unwrap_or_else(|| panic!("no {code} diagnostic in {diags:?}"))
}

/// Assert that `diags` holds exactly one diagnostic with the given code.
#[allow(dead_code)]
pub fn assert_single(diags: &[Diagnostic], code: &str) {
    assert_eq!(diag_codes(diags), vec![code.to_string()], "{diags:?}");
}
