//! HED formatter: renders a parse tree back into HED text.
//!
//! Tags keep their library prefix and remainder verbatim; only the schema
//! part of the path changes between short and long form.

use crate::grammar::ast::{
    ParsedHedColumnSplice, ParsedHedGroup, ParsedHedString, ParsedHedSubstring, ParsedHedTag,
};

// ── Configuration ───────────────────────────────────────────────────────

/// Which form of the schema path to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagForm {
    /// The tag's own name (`Sensory-event`).
    #[default]
    Short,
    /// The full path from the schema root (`Event/Sensory-event`).
    Long,
}

/// Configuration for the HED formatter.
#[derive(Debug, Clone, Default)]
pub struct EmitConfig {
    /// Tag path form.
    pub form: TagForm,
    /// Separate nodes with `,` instead of `, `.
    pub compact: bool,
}

impl EmitConfig {
    fn separator(&self) -> &'static str {
        if self.compact { "," } else { ", " }
    }
}

// ── Public API ──────────────────────────────────────────────────────────

/// Render a parsed string as HED text.
pub fn emit_hed(parsed: &ParsedHedString<'_>, config: &EmitConfig) -> String {
    let mut out = String::new();
    emit_nodes(&mut out, parsed.children(), config);
    out
}

fn config_for(long: bool) -> EmitConfig {
    EmitConfig {
        form: if long { TagForm::Long } else { TagForm::Short },
        compact: false,
    }
}

impl ParsedHedString<'_> {
    /// Render in long (`true`) or short form with `, ` separators.
    pub fn format(&self, long: bool) -> String {
        emit_hed(self, &config_for(long))
    }
}

impl ParsedHedGroup<'_> {
    /// Render in long (`true`) or short form, parentheses included.
    pub fn format(&self, long: bool) -> String {
        let mut out = String::new();
        emit_group(&mut out, self, &config_for(long));
        out
    }
}

impl ParsedHedTag<'_> {
    /// Render in long (`true`) or short form.
    pub fn format(&self, long: bool) -> String {
        let mut out = String::new();
        emit_tag(&mut out, self, if long { TagForm::Long } else { TagForm::Short });
        out
    }
}

impl ParsedHedSubstring<'_> {
    /// Render in long (`true`) or short form.
    pub fn format(&self, long: bool) -> String {
        let mut out = String::new();
        emit_node(&mut out, self, &config_for(long));
        out
    }
}

// ── Node emission ───────────────────────────────────────────────────────

fn emit_nodes(out: &mut String, nodes: &[ParsedHedSubstring<'_>], config: &EmitConfig) {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push_str(config.separator());
        }
        emit_node(out, node, config);
    }
}

fn emit_node(out: &mut String, node: &ParsedHedSubstring<'_>, config: &EmitConfig) {
    match node {
        ParsedHedSubstring::Tag(tag) => emit_tag(out, tag, config.form),
        ParsedHedSubstring::Group(group) => emit_group(out, group, config),
        ParsedHedSubstring::ColumnSplice(splice) => emit_splice(out, splice),
    }
}

fn emit_group(out: &mut String, group: &ParsedHedGroup<'_>, config: &EmitConfig) {
    out.push('(');
    emit_nodes(out, group.children(), config);
    out.push(')');
}

fn emit_splice(out: &mut String, splice: &ParsedHedColumnSplice) {
    out.push('{');
    out.push_str(splice.column_name());
    out.push('}');
}

fn emit_tag(out: &mut String, tag: &ParsedHedTag<'_>, form: TagForm) {
    if !tag.prefix().is_empty() {
        out.push_str(tag.prefix());
        out.push(':');
    }
    out.push_str(match form {
        TagForm::Short => tag.name(),
        TagForm::Long => tag.long_name(),
    });
    if !tag.remainder().is_empty() {
        out.push('/');
        out.push_str(tag.remainder());
    }
}
