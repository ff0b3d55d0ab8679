use super::{
    ast::{ParsedHedColumnSplice, ParsedHedGroup, ParsedHedString, ParsedHedSubstring, ParsedHedTag},
    diag::Diagnostic,
    resolve::resolve_tag,
    tokenizer::{GroupSpec, SubstringSpec, TagSpec, tokenize},
};
use crate::reserved::ReservedTagTable;
use hed_toolchain_schema::HedSchemas;

/// Result of parsing a HED string.
#[derive(Debug, serde::Serialize)]
pub struct ParseResult<'s> {
    /// The parse tree; `None` when any lexical or resolution error occurred.
    pub parsed: Option<ParsedHedString<'s>>,
    /// Errors that prevented the tree from being built.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult<'_> {
    /// Whether the string parsed cleanly.
    pub fn is_ok(&self) -> bool {
        self.parsed.is_some()
    }
}

// ─── Public API ─────────────────────────────────────────────────────────────

/// Parse a HED string using the standard reserved tag table.
pub fn parse_hed_string<'s>(input: &str, schemas: &'s HedSchemas) -> ParseResult<'s> {
    parse_with_table(input, schemas, ReservedTagTable::standard())
}

/// Parse a HED string, recognising reserved tags from `table`.
///
/// Tokenization stops at its first issue. Tag resolution errors are collected
/// for every tag before the parse is abandoned.
pub fn parse_with_table<'s>(
    input: &str,
    schemas: &'s HedSchemas,
    table: &ReservedTagTable,
) -> ParseResult<'s> {
    let tokens = tokenize(input);
    let Some(root) = tokens.root else {
        return ParseResult {
            parsed: None,
            diagnostics: tokens.diagnostics,
        };
    };
    let mut builder = TreeBuilder {
        input,
        schemas,
        table,
        diagnostics: Vec::new(),
    };
    let parsed = builder.build(&root);
    tracing::debug!(
        ok = parsed.is_some(),
        errors = builder.diagnostics.len(),
        "parsed HED string"
    );
    ParseResult {
        parsed,
        diagnostics: builder.diagnostics,
    }
}

// ─── Tree Builder ──────────────────────────────────────────────────────────

struct TreeBuilder<'s, 'a> {
    input: &'a str,
    schemas: &'s HedSchemas,
    table: &'a ReservedTagTable,
    diagnostics: Vec<Diagnostic>,
}

impl<'s> TreeBuilder<'s, '_> {
    fn build(&mut self, root: &GroupSpec) -> Option<ParsedHedString<'s>> {
        let tree = self.build_children(&root.children)?;
        ParsedHedString::new(self.input, tree)
            .map_err(|diag| self.diagnostics.push(diag))
            .ok()
    }

    /// Build every child, even after a failure, so all resolution errors are
    /// reported. Returns `None` if any child failed.
    fn build_children(&mut self, specs: &[SubstringSpec]) -> Option<Vec<ParsedHedSubstring<'s>>> {
        let mut children = Vec::with_capacity(specs.len());
        let mut failed = false;
        for spec in specs {
            match self.build_node(spec) {
                Some(node) => children.push(node),
                None => failed = true,
            }
        }
        (!failed).then_some(children)
    }

    fn build_node(&mut self, spec: &SubstringSpec) -> Option<ParsedHedSubstring<'s>> {
        match spec {
            SubstringSpec::Tag(tag) => self.build_tag(tag).map(ParsedHedSubstring::Tag),
            SubstringSpec::ColumnSplice(splice) => Some(ParsedHedSubstring::ColumnSplice(
                ParsedHedColumnSplice::from_spec(self.input, splice),
            )),
            SubstringSpec::Group(group) => self.build_group(group).map(ParsedHedSubstring::Group),
        }
    }

    fn build_tag(&mut self, spec: &TagSpec) -> Option<ParsedHedTag<'s>> {
        match resolve_tag(spec, self.schemas, self.table) {
            Ok(resolved) => Some(ParsedHedTag::from_resolved(spec, resolved, self.table)),
            Err(err) => {
                self.diagnostics.push(err.into_diagnostic(spec.bounds));
                None
            }
        }
    }

    fn build_group(&mut self, spec: &GroupSpec) -> Option<ParsedHedGroup<'s>> {
        let children = self.build_children(&spec.children)?;
        let text = &self.input[spec.bounds.start..spec.bounds.end];
        ParsedHedGroup::new(text, spec.bounds, children)
            .map_err(|diag| self.diagnostics.push(diag))
            .ok()
    }
}
