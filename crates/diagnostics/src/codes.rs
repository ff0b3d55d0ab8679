//! Diagnostic ID constants.
//!
//! Auto-generated from `data/diagnostics.json` at build time. Codes are
//! grouped by pipeline stage: `HED1xxx` tokenizer, `HED2xxx` tag resolution,
//! `HED3xxx` group structure, `HED4xxx` definitions and placeholders,
//! `HED5xxx` temporal events, `HED9xxx` internal.

include!(concat!(env!("OUT_DIR"), "/generated_codes.rs"));
