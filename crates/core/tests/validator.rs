//! Tests for structural validation of parsed HED strings.
//!
//! Covers: uniqueness, top-level group placement (quick and full modes),
//! reserved group shapes, definition and placeholder context, warnings,
//! custom reserved tables, and batch validation.

mod common;

use common::{SCHEMAS, assert_single, validate_codes};
use hed_toolchain_core::{
    ParseOptions, ReservedTag, ReservedTagTable, Severity, check_parsed_string, codes,
    parse_hed_string, validate_hed_string, validate_hed_strings, validate_with_table,
};

fn quick() -> ParseOptions {
    ParseOptions::default()
}

fn full() -> ParseOptions {
    ParseOptions::default().with_full_validation(true)
}

fn with_definitions() -> ParseOptions {
    ParseOptions::default().with_definitions(true)
}

fn valid(input: &str, options: &ParseOptions) {
    let result = validate_hed_string(input, &SCHEMAS, options);
    assert!(result.is_ok(), "{input:?}: {:?}", result.errors);
    assert!(result.parsed.is_some());
}

fn single(input: &str, options: &ParseOptions, code: &str) {
    assert_eq!(validate_codes(input, options), vec![code.to_string()], "{input:?}");
}

// ─── Uniqueness and placement ────────────────────────────────────────────────

#[test]
fn unique_tags() {
    single(
        "(Event-context, (Red)), (Event-context, (Blue))",
        &quick(),
        codes::MULTIPLE_UNIQUE_TAGS,
    );
}

#[test]
fn bare_top_level_tags_are_tolerated_in_quick_mode() {
    valid("Onset, Red", &quick());
    single("Onset, Red", &full(), codes::INVALID_TOP_LEVEL_TAG_GROUP_TAG);
}

#[test]
fn top_level_tags_may_not_nest() {
    single("(Red, (Onset, Def/A))", &quick(), codes::INVALID_TOP_LEVEL_TAG_GROUP_TAG);
    single("(Red, (Blue, (Delay/2 s)))", &quick(), codes::INVALID_TOP_LEVEL_TAG_GROUP_TAG);
}

#[test]
fn group_required() {
    single("Def-expand/A", &quick(), codes::MISSING_TAG_GROUP);
    single("Red, Definition/A", &with_definitions(), codes::MISSING_TAG_GROUP);
}

// ─── Reserved group shapes ───────────────────────────────────────────────────

#[test]
fn temporal_groups() {
    valid("(Onset, Def/A)", &full());
    valid("(Onset, Def/A, (Red, Blue))", &full());
    valid("(Offset, Def/A)", &full());
    valid("(Inset, Def/A, Delay/2 s)", &full());
}

#[test]
fn temporal_group_needs_one_definition() {
    single("(Onset, Red)", &quick(), codes::TEMPORAL_DEF_COUNT);
    single("(Onset)", &quick(), codes::TEMPORAL_DEF_COUNT);
    single("(Onset, Def/A, Def/B)", &quick(), codes::TEMPORAL_DEF_COUNT);
}

#[test]
fn def_expand_fills_the_definition_slot() {
    valid("(Onset, (Def-expand/A, (Red)), (Blue))", &full());
    single(
        "(Onset, (Def-expand/A, (Red)), (Blue), (Green))",
        &quick(),
        codes::INVALID_NUMBER_OF_SUBGROUPS,
    );
}

#[test]
fn subgroup_counts() {
    single("(Onset, Def/A, (Red), (Blue))", &quick(), codes::INVALID_NUMBER_OF_SUBGROUPS);
    single("(Offset, Def/A, (Red))", &quick(), codes::INVALID_NUMBER_OF_SUBGROUPS);
    single("(Duration/2 s)", &quick(), codes::INVALID_NUMBER_OF_SUBGROUPS);
    valid("(Duration/2 s, (Red))", &full());
    valid("(Duration/2 s, Delay/1 s, (Red))", &full());
}

#[test]
fn disallowed_top_tags() {
    single("(Onset, Def/A, Red)", &quick(), codes::INVALID_GROUP_TOP_TAGS);
    single("(Onset, Def/A, Inset)", &quick(), codes::INVALID_GROUP_TOP_TAGS);
}

#[test]
fn exclusive_groups() {
    single("(Def-expand/A, Red, (Blue))", &quick(), codes::INVALID_GROUP_TOP_TAGS);
    single("(Def-expand/A, {col})", &quick(), codes::INVALID_GROUP_TOP_TAGS);
    single("(Def-expand/A, (Red), (Blue))", &quick(), codes::INVALID_NUMBER_OF_SUBGROUPS);
}

#[test]
fn forbidden_subgroup_tags() {
    single("(Def-expand/A, (Def/B, Red))", &quick(), codes::FORBIDDEN_SUBGROUP_TAG);
    single(
        "(Definition/A, (Def-expand/B, (Red)))",
        &with_definitions(),
        codes::FORBIDDEN_SUBGROUP_TAG,
    );
}

#[test]
fn nested_def_expand_groups_are_checked() {
    single(
        "(Onset, (Def-expand/A, Red, (Blue)))",
        &quick(),
        codes::INVALID_GROUP_TOP_TAGS,
    );
}

#[test]
fn custom_reserved_table() {
    let table = ReservedTagTable::from_entries(
        ReservedTagTable::standard()
            .iter()
            .map(|entry| match entry.name {
                "Onset" => ReservedTag {
                    max_subgroups: Some(3),
                    ..*entry
                },
                _ => *entry,
            })
            .collect(),
    );
    let input = "(Onset, Def/A, (Red), (Blue))";
    assert!(validate_with_table(input, &SCHEMAS, &quick(), &table).is_ok());
    assert!(!validate_hed_string(input, &SCHEMAS, &quick()).is_ok());
}

// ─── Definition context ──────────────────────────────────────────────────────

#[test]
fn definitions_need_permission() {
    single("(Definition/A, (Red))", &quick(), codes::ILLEGAL_DEFINITION_CONTEXT);
    valid("(Definition/A, (Red))", &with_definitions());
    valid("(Definition/A, (Red)), (Definition/B, (Blue))", &with_definitions());
}

#[test]
fn definitions_are_exclusive() {
    single(
        "(Definition/A, (Red)), Blue",
        &with_definitions(),
        codes::ILLEGAL_IN_EXCLUSIVE_CONTEXT,
    );
    single(
        "(Definition/A, (Red)), (Blue)",
        &with_definitions(),
        codes::ILLEGAL_IN_EXCLUSIVE_CONTEXT,
    );
}

#[test]
fn definitions_may_not_hold_splices() {
    single(
        "(Definition/A, (Red, {col}))",
        &with_definitions(),
        codes::CURLY_BRACES_IN_DEFINITION,
    );
    single("(Def-expand/A, (Red, {col}))", &quick(), codes::CURLY_BRACES_IN_DEFINITION);
}

#[test]
fn definition_names() {
    single("(Definition/A/3, (Red))", &with_definitions(), codes::INVALID_DEFINITION);
    single("(Definition/#, (Red))", &with_definitions(), codes::INVALID_DEFINITION);
}

#[test]
fn definition_placeholder_counts() {
    valid("(Definition/A/#, (Item-count/#))", &with_definitions());
    single("(Definition/A/#, (Red))", &with_definitions(), codes::INVALID_PLACEHOLDER_COUNT);
    single("(Definition/A, (Item-count/#))", &with_definitions(), codes::INVALID_PLACEHOLDER_COUNT);
    single(
        "(Definition/A/#, (Item-count/#, Label/#))",
        &with_definitions(),
        codes::INVALID_PLACEHOLDER_COUNT,
    );
}

// ─── Placeholders ────────────────────────────────────────────────────────────

#[test]
fn placeholders_need_permission() {
    single("Item-count/#", &quick(), codes::INVALID_PLACEHOLDER_CONTEXT);
    valid("Item-count/#", &ParseOptions::default().with_placeholders(true));
}

#[test]
fn at_most_one_placeholder() {
    single(
        "Item-count/#, Label/#",
        &ParseOptions::default().with_placeholders(true),
        codes::INVALID_PLACEHOLDER_COUNT,
    );
}

// ─── Warnings ────────────────────────────────────────────────────────────────

#[test]
fn extension_warning() {
    let result = validate_hed_string("Item/Widget, Red", &SCHEMAS, &quick());
    assert!(result.is_ok());
    assert_single(&result.warnings, codes::EXTENDED_TAG);
    assert_eq!(result.warnings[0].severity, Severity::Warn);
}

#[test]
fn deprecation_warning() {
    let result = validate_hed_string("Sensory-presentation", &SCHEMAS, &quick());
    assert!(result.is_ok());
    assert_single(&result.warnings, codes::DEPRECATED_TAG);
    assert_eq!(result.diagnostics().count(), 1);
}

#[test]
fn errors_suppress_warnings() {
    let result = validate_hed_string("Item/Widget, (Onset)", &SCHEMAS, &quick());
    assert!(!result.is_ok());
    assert!(result.warnings.is_empty());
    assert!(result.parsed.is_none());
}

// ─── Entry points ────────────────────────────────────────────────────────────

#[test]
fn parse_errors_are_returned_as_errors() {
    let result = validate_hed_string("Foo", &SCHEMAS, &quick());
    assert_single(&result.errors, codes::INVALID_TAG);
}

#[test]
fn already_parsed_strings() {
    let parsed = parse_hed_string("(Onset, Def/A, Red)", &SCHEMAS).parsed.unwrap();
    let result = check_parsed_string(parsed, &quick());
    assert_single(&result.errors, codes::INVALID_GROUP_TOP_TAGS);
}

#[test]
fn batch_keeps_input_order() {
    let inputs = ["Red", "Foo", "(Onset)", "Blue"];
    let results = validate_hed_strings(&inputs, &SCHEMAS, &quick());
    let ok: Vec<bool> = results.iter().map(|r| r.is_ok()).collect();
    assert_eq!(ok, vec![true, false, false, true]);
    assert_single(&results[2].errors, codes::TEMPORAL_DEF_COUNT);
}
