//! HED toolchain core library.
//!
//! Tokenizes, parses, and validates HED (Hierarchical Event Descriptor)
//! annotation strings against a loaded schema. The main entry points are
//! [`parse_hed_string`] for building a parse tree, [`validate_hed_string`]
//! for structural validation, [`DefinitionManager`] for definition
//! registration and `Def`/`Def-expand` checking, and [`EventManager`] for
//! temporal consistency across a timeline.

#![warn(missing_docs)]

/// Shorthand for building a `BTreeMap<String, String>` context from key-value pairs.
macro_rules! ctx {
    ($($k:expr => $v:expr),+ $(,)?) => {
        std::collections::BTreeMap::from([$(($k.into(), $v.into())),+])
    };
}

/// Definition registry and `Def`/`Def-expand` expansion.
pub mod definitions;
/// Temporal event extraction and onset/offset consistency.
pub mod events;
/// HED grammar: tokenizer, parse tree, tag resolution, and formatting.
pub mod grammar;
/// Reserved tag table.
pub mod reserved;
/// Structural validation of parsed HED strings.
pub mod validate;

// ── Convenience re-exports ──────────────────────────────────────────────────

// Tokenizer
pub use grammar::tokenizer::{
    ColumnSpliceSpec, GroupSpec, SubstringSpec, TagSpec, TokenizeResult, tokenize,
};

// Parser
pub use grammar::parser::{ParseResult, parse_hed_string, parse_with_table};

// Parse tree
pub use grammar::ast::{
    ParsedHedColumnSplice, ParsedHedGroup, ParsedHedString, ParsedHedSubstring, ParsedHedTag,
};

// Tag resolution errors
pub use grammar::resolve::TagError;

// Emitter
pub use grammar::emit::{EmitConfig, TagForm, emit_hed};

// Diagnostics (re-exported from the diagnostics crate)
pub use grammar::diag::{Diagnostic, Severity, Span, codes};

// Validator
pub use validate::{
    ParseOptions, ReservedChecker, ValidationResult, check_parsed_string, check_with_table,
    validate_hed_string, validate_hed_strings, validate_with_table,
};

// Reserved tags
pub use reserved::{ReservedTag, ReservedTagTable};

// Definitions
pub use definitions::{Definition, DefinitionManager};

// Events
pub use events::{AnnotatedRow, Event, EventManager, TOLERANCE, TemporalKind};

// Schemas (re-exported from the schema crate)
pub use hed_toolchain_schema::{HedSchema, HedSchemas, SchemaError};

// Serialization helpers
pub use grammar::dump::to_pretty_json;
