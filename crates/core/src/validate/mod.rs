//! Structural validation of parsed HED strings.
//!
//! Validation runs after a successful parse. The passes run in a fixed
//! order (reserved tag structure, definition context, placeholders) and the
//! first pass to find a violation ends validation; each pass itself stops at
//! its first violation. Warnings are collected only for strings without
//! errors.

mod context;
mod reserved;

pub use crate::grammar::diag::Diagnostic;
pub use reserved::ReservedChecker;

use crate::grammar::ast::ParsedHedString;
use crate::grammar::parser::parse_with_table;
use crate::reserved::ReservedTagTable;
use hed_toolchain_schema::HedSchemas;
use rayon::prelude::*;
use serde::Serialize;

/// Which constructs a string may contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// `Definition` groups are permitted.
    pub definitions_allowed: bool,
    /// `#` placeholders are permitted outside definitions.
    pub placeholders_allowed: bool,
    /// Tags requiring a top-level group may not appear bare at the top level.
    pub full_validation: bool,
}

impl ParseOptions {
    /// Options for definition strings: definitions and placeholders allowed,
    /// full validation.
    pub fn definitions() -> Self {
        Self {
            definitions_allowed: true,
            placeholders_allowed: true,
            full_validation: true,
        }
    }

    /// Set whether definitions are allowed.
    pub fn with_definitions(mut self, allowed: bool) -> Self {
        self.definitions_allowed = allowed;
        self
    }

    /// Set whether placeholders are allowed.
    pub fn with_placeholders(mut self, allowed: bool) -> Self {
        self.placeholders_allowed = allowed;
        self
    }

    /// Set whether full validation is performed.
    pub fn with_full_validation(mut self, full: bool) -> Self {
        self.full_validation = full;
        self
    }
}

/// Result of validating one HED string.
#[derive(Debug, Serialize)]
pub struct ValidationResult<'s> {
    /// The parse tree; `None` when any error was found.
    pub parsed: Option<ParsedHedString<'s>>,
    /// Errors.
    pub errors: Vec<Diagnostic>,
    /// Warnings. Only reported for strings without errors.
    pub warnings: Vec<Diagnostic>,
}

impl ValidationResult<'_> {
    /// Whether no error was found.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors followed by warnings.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().chain(&self.warnings)
    }

    fn failed(errors: Vec<Diagnostic>) -> Self {
        Self {
            parsed: None,
            errors,
            warnings: Vec::new(),
        }
    }
}

/// Parse and validate a HED string using the standard reserved tag table.
pub fn validate_hed_string<'s>(
    input: &str,
    schemas: &'s HedSchemas,
    options: &ParseOptions,
) -> ValidationResult<'s> {
    validate_with_table(input, schemas, options, ReservedTagTable::standard())
}

/// Parse and validate a HED string against an explicit reserved tag table.
pub fn validate_with_table<'s>(
    input: &str,
    schemas: &'s HedSchemas,
    options: &ParseOptions,
    table: &ReservedTagTable,
) -> ValidationResult<'s> {
    let result = parse_with_table(input, schemas, table);
    match result.parsed {
        Some(parsed) => check_with_table(parsed, options, table),
        None => ValidationResult::failed(result.diagnostics),
    }
}

/// Validate an already parsed string using the standard reserved tag table.
pub fn check_parsed_string<'s>(
    parsed: ParsedHedString<'s>,
    options: &ParseOptions,
) -> ValidationResult<'s> {
    check_with_table(parsed, options, ReservedTagTable::standard())
}

/// Validate an already parsed string against an explicit reserved tag table.
pub fn check_with_table<'s>(
    parsed: ParsedHedString<'s>,
    options: &ParseOptions,
    table: &ReservedTagTable,
) -> ValidationResult<'s> {
    let checked = ReservedChecker::new(table)
        .check_hed_string(&parsed, options.full_validation)
        .and_then(|()| context::check_definitions(&parsed, options))
        .and_then(|()| context::check_placeholders(&parsed, options));
    match checked {
        Ok(()) => {
            let warnings = context::collect_warnings(&parsed);
            tracing::debug!(warnings = warnings.len(), "validated HED string");
            ValidationResult {
                parsed: Some(parsed),
                errors: Vec::new(),
                warnings,
            }
        }
        Err(diag) => {
            tracing::debug!(code = %diag.id, "HED string failed validation");
            ValidationResult::failed(vec![diag])
        }
    }
}

/// Validate many strings in parallel. Results are in input order.
pub fn validate_hed_strings<'s, S>(
    inputs: &[S],
    schemas: &'s HedSchemas,
    options: &ParseOptions,
) -> Vec<ValidationResult<'s>>
where
    S: AsRef<str> + Sync,
{
    inputs
        .par_iter()
        .map(|input| validate_hed_string(input.as_ref(), schemas, options))
        .collect()
}
