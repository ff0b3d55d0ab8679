/// HED parse tree types.
pub mod ast;
/// Re-exports from the diagnostics crate.
pub mod diag;
/// JSON serialization helpers for parse trees.
pub mod dump;
/// HED emitter: renders a parse tree back to text in short or long form.
pub mod emit;
/// HED parser: builds a parse tree from tokenizer output.
pub mod parser;
/// Tag resolution against a schema.
pub mod resolve;
/// HED tokenizer: splits a raw string into tag, group, and column-splice specs.
pub mod tokenizer;
