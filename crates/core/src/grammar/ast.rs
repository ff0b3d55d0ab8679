//! Parse tree for HED strings.
//!
//! Nodes are immutable once built. Every node computes its normal form at
//! construction; groups also classify their children (top tags, subgroups,
//! splices, reserved tags) up front so validators never re-scan.

use super::diag::{Diagnostic, Span, codes};
use super::resolve::ResolvedTag;
use super::tokenizer::{ColumnSpliceSpec, TagSpec};
use crate::reserved::{self, ReservedTagTable};
use hed_toolchain_schema::{HedSchema, TagId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A tag resolved against its schema.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedHedTag<'s> {
    original_tag: String,
    bounds: Span,
    #[serde(skip)]
    schema: &'s HedSchema,
    #[serde(skip)]
    schema_tag: TagId,
    #[serde(skip_serializing_if = "String::is_empty")]
    schema_prefix: String,
    name: String,
    long_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    remainder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    split_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(skip)]
    conversion_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reserved: Option<&'static str>,
    normalized: String,
}

impl fmt::Debug for ParsedHedTag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedHedTag")
            .field("original_tag", &self.original_tag)
            .field("bounds", &self.bounds)
            .field("long_name", &self.long_name)
            .field("remainder", &self.remainder)
            .field("normalized", &self.normalized)
            .finish_non_exhaustive()
    }
}

impl<'s> ParsedHedTag<'s> {
    pub(crate) fn from_resolved(
        spec: &TagSpec,
        resolved: ResolvedTag<'s>,
        table: &ReservedTagTable,
    ) -> Self {
        let schema = resolved.schema;
        let schema_tag = schema.base_tag(resolved.tag);
        let name = schema.tag(schema_tag).name.clone();
        let long_name = schema.long_name(schema_tag);
        let reserved = if spec.library.is_empty() {
            table.get(&name).map(|entry| entry.name)
        } else {
            None
        };

        let mut normalized = prefixed(&spec.library, &long_name.to_lowercase());
        if let Some(extension) = &resolved.extension {
            normalized.push('/');
            normalized.push_str(&extension.to_lowercase());
        } else if !resolved.remainder.is_empty() {
            normalized.push('/');
            normalized.push_str(&resolved.remainder);
        }

        Self {
            original_tag: prefixed(&spec.library, &spec.tag),
            bounds: spec.bounds,
            schema,
            schema_tag,
            schema_prefix: spec.library.clone(),
            name,
            long_name,
            remainder: resolved.remainder,
            value: resolved.value,
            split_value: resolved.split_value,
            unit: resolved.unit,
            conversion_factor: resolved.conversion_factor,
            extension: resolved.extension,
            reserved,
            normalized,
        }
    }

    /// Tag text as written, library prefix included.
    pub fn original_tag(&self) -> &str {
        &self.original_tag
    }

    /// Bounds in the source string.
    pub fn bounds(&self) -> Span {
        self.bounds
    }

    /// Schema the tag was resolved against.
    pub fn schema(&self) -> &'s HedSchema {
        self.schema
    }

    /// Matched schema tag. For values this is the tag owning the `#` child.
    pub fn schema_tag(&self) -> TagId {
        self.schema_tag
    }

    /// Library prefix without the colon; empty for the base schema.
    pub fn prefix(&self) -> &str {
        &self.schema_prefix
    }

    /// Short name of the matched schema tag.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full schema path of the matched schema tag.
    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    /// Text after the matched schema tag: the extension or the value with
    /// its unit and split value.
    pub fn remainder(&self) -> &str {
        &self.remainder
    }

    /// Value with the unit removed.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Second value level of two-level tags (`Def/Name/Value`).
    pub fn split_value(&self) -> Option<&str> {
        self.split_value.as_deref()
    }

    /// Unit text.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Factor converting the value into the unit class's base unit.
    pub fn conversion_factor(&self) -> f64 {
        self.conversion_factor
    }

    /// Extension levels beyond the schema.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Whether the tag extends the schema.
    pub fn is_extended(&self) -> bool {
        self.extension.is_some()
    }

    /// Whether the value or split value is a `#` placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.value.as_deref() == Some("#") || self.split_value.as_deref() == Some("#")
    }

    /// Whether the matched schema tag carries `attribute`.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.schema.has_attribute(self.schema_tag, attribute)
    }

    /// Whether the tag is the schema tag `name` (case-insensitive).
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Schema version the tag was deprecated in.
    pub fn deprecated_from(&self) -> Option<&str> {
        self.schema.tag(self.schema_tag).deprecated_from.as_deref()
    }

    /// Canonical name of the reserved tag this is, if any.
    pub fn reserved_name(&self) -> Option<&'static str> {
        self.reserved
    }

    /// Whether the tag is the reserved tag `name`.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved == Some(name)
    }

    /// Definition name of a `Definition`, `Def`, or `Def-expand` tag.
    pub fn def_name(&self) -> Option<&str> {
        match self.reserved {
            Some(reserved::DEFINITION | reserved::DEF | reserved::DEF_EXPAND) => self.value(),
            _ => None,
        }
    }

    /// Value parsed as a number, before unit conversion.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_deref()?.trim().parse().ok()
    }

    /// Canonical form: prefix, lower-case long name, then the remainder.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Whether both tags have the same canonical form.
    pub fn equivalent(&self, other: &ParsedHedTag<'_>) -> bool {
        self.normalized == other.normalized
    }
}

fn prefixed(prefix: &str, text: &str) -> String {
    if prefix.is_empty() {
        text.to_string()
    } else {
        format!("{prefix}:{text}")
    }
}

/// A `{column}` splice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedHedColumnSplice {
    original_tag: String,
    bounds: Span,
    column_name: String,
    normalized: String,
}

impl ParsedHedColumnSplice {
    pub(crate) fn from_spec(input: &str, spec: &ColumnSpliceSpec) -> Self {
        Self {
            original_tag: input[spec.bounds.start..spec.bounds.end].to_string(),
            bounds: spec.bounds,
            column_name: spec.column_name.clone(),
            normalized: format!("{{{}}}", spec.column_name),
        }
    }

    /// Splice text as written, braces included.
    pub fn original_tag(&self) -> &str {
        &self.original_tag
    }

    /// Bounds in the source string.
    pub fn bounds(&self) -> Span {
        self.bounds
    }

    /// Referenced column name.
    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// `{name}`.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

/// A parenthesized group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedHedGroup<'s> {
    original_tag: String,
    bounds: Span,
    children: Vec<ParsedHedSubstring<'s>>,
    /// Reserved name to indices of top tags in `children`.
    #[serde(skip)]
    reserved: BTreeMap<&'static str, Vec<usize>>,
    /// Indices of subgroups headed by `Def-expand`.
    #[serde(skip)]
    def_expand_children: Vec<usize>,
    #[serde(skip)]
    def_count: usize,
    normalized: String,
}

impl<'s> ParsedHedGroup<'s> {
    pub(crate) fn new(
        original_tag: &str,
        bounds: Span,
        children: Vec<ParsedHedSubstring<'s>>,
    ) -> Result<Self, Diagnostic> {
        let normalized = format!("({})", normalize_children(&children)?);
        let mut reserved: BTreeMap<&'static str, Vec<usize>> = BTreeMap::new();
        let mut def_expand_children = Vec::new();
        for (i, child) in children.iter().enumerate() {
            match child {
                ParsedHedSubstring::Tag(tag) => {
                    if let Some(name) = tag.reserved_name() {
                        reserved.entry(name).or_default().push(i);
                    }
                }
                ParsedHedSubstring::Group(group) if group.is_def_expand_group() => {
                    def_expand_children.push(i);
                }
                _ => {}
            }
        }
        let def_count =
            reserved.get(reserved::DEF).map_or(0, Vec::len) + def_expand_children.len();
        Ok(Self {
            original_tag: original_tag.to_string(),
            bounds,
            children,
            reserved,
            def_expand_children,
            def_count,
            normalized,
        })
    }

    /// Group text as written, parentheses included.
    pub fn original_tag(&self) -> &str {
        &self.original_tag
    }

    /// Bounds in the source string.
    pub fn bounds(&self) -> Span {
        self.bounds
    }

    /// Direct children in source order.
    pub fn children(&self) -> &[ParsedHedSubstring<'s>] {
        &self.children
    }

    /// Tags directly inside this group.
    pub fn top_tags(&self) -> impl Iterator<Item = &ParsedHedTag<'s>> {
        self.children.iter().filter_map(ParsedHedSubstring::as_tag)
    }

    /// Groups directly inside this group.
    pub fn top_groups(&self) -> impl Iterator<Item = &ParsedHedGroup<'s>> {
        self.children.iter().filter_map(ParsedHedSubstring::as_group)
    }

    /// Column splices directly inside this group.
    pub fn top_splices(&self) -> impl Iterator<Item = &ParsedHedColumnSplice> {
        self.children
            .iter()
            .filter_map(ParsedHedSubstring::as_column_splice)
    }

    /// Every tag in this group and its descendants.
    pub fn all_tags(&self) -> Vec<&ParsedHedTag<'s>> {
        let mut tags = Vec::new();
        collect_tags(&self.children, &mut tags);
        tags
    }

    /// This group and every descendant group.
    pub fn all_groups(&self) -> Vec<&ParsedHedGroup<'s>> {
        let mut groups = vec![self];
        collect_groups(&self.children, &mut groups);
        groups
    }

    /// Every column splice in this group and its descendants.
    pub fn column_splices(&self) -> Vec<&ParsedHedColumnSplice> {
        let mut splices = Vec::new();
        collect_splices(&self.children, &mut splices);
        splices
    }

    /// Top tags that are the reserved tag `name`.
    pub fn reserved_tags(&self, name: &str) -> impl Iterator<Item = &ParsedHedTag<'s>> {
        self.reserved
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.children[i].as_tag())
    }

    /// Whether a top tag is the reserved tag `name`.
    pub fn has_reserved(&self, name: &str) -> bool {
        self.reserved.contains_key(name)
    }

    /// Names of the reserved tags among the top tags.
    pub fn reserved_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.reserved.keys().copied()
    }

    /// `Def` top tags plus `Def-expand` subgroups.
    pub fn def_count(&self) -> usize {
        self.def_count
    }

    /// `Def` top tags.
    pub fn def_tags(&self) -> impl Iterator<Item = &ParsedHedTag<'s>> {
        self.reserved_tags(reserved::DEF)
    }

    /// `Def-expand` top tags.
    pub fn def_expand_tags(&self) -> impl Iterator<Item = &ParsedHedTag<'s>> {
        self.reserved_tags(reserved::DEF_EXPAND)
    }

    /// Subgroups headed by `Def-expand`.
    pub fn def_expand_children(&self) -> impl Iterator<Item = &ParsedHedGroup<'s>> {
        self.def_expand_children
            .iter()
            .filter_map(|&i| self.children[i].as_group())
    }

    /// Whether a top tag is `Definition`.
    pub fn is_definition_group(&self) -> bool {
        self.has_reserved(reserved::DEFINITION)
    }

    /// Whether a top tag is `Def-expand`.
    pub fn is_def_expand_group(&self) -> bool {
        self.has_reserved(reserved::DEF_EXPAND)
    }

    /// The first `Definition` top tag.
    pub fn definition_tag(&self) -> Option<&ParsedHedTag<'s>> {
        self.reserved_tags(reserved::DEFINITION).next()
    }

    /// Number of placeholder tags in this group and its descendants.
    pub fn placeholder_count(&self) -> usize {
        self.all_tags()
            .into_iter()
            .filter(|t| t.is_placeholder())
            .count()
    }

    /// Whether this group or a descendant holds a column splice.
    pub fn has_column_splices(&self) -> bool {
        !self.column_splices().is_empty()
    }

    /// Canonical form: `(` + sorted child forms + `)`.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Whether both groups have the same canonical form.
    pub fn equivalent(&self, other: &ParsedHedGroup<'_>) -> bool {
        self.normalized == other.normalized
    }
}

/// Any node of the parse tree.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParsedHedSubstring<'s> {
    /// A resolved tag.
    Tag(ParsedHedTag<'s>),
    /// A group.
    Group(ParsedHedGroup<'s>),
    /// A column splice.
    ColumnSplice(ParsedHedColumnSplice),
}

impl<'s> ParsedHedSubstring<'s> {
    /// Node text as written.
    pub fn original_tag(&self) -> &str {
        match self {
            ParsedHedSubstring::Tag(t) => t.original_tag(),
            ParsedHedSubstring::Group(g) => g.original_tag(),
            ParsedHedSubstring::ColumnSplice(c) => c.original_tag(),
        }
    }

    /// Bounds in the source string.
    pub fn bounds(&self) -> Span {
        match self {
            ParsedHedSubstring::Tag(t) => t.bounds(),
            ParsedHedSubstring::Group(g) => g.bounds(),
            ParsedHedSubstring::ColumnSplice(c) => c.bounds(),
        }
    }

    /// Canonical form.
    pub fn normalized(&self) -> &str {
        match self {
            ParsedHedSubstring::Tag(t) => t.normalized(),
            ParsedHedSubstring::Group(g) => g.normalized(),
            ParsedHedSubstring::ColumnSplice(c) => c.normalized(),
        }
    }

    /// Whether both nodes have the same canonical form.
    pub fn equivalent(&self, other: &ParsedHedSubstring<'_>) -> bool {
        self.normalized() == other.normalized()
    }

    /// The tag, if this node is one.
    pub fn as_tag(&self) -> Option<&ParsedHedTag<'s>> {
        match self {
            ParsedHedSubstring::Tag(t) => Some(t),
            _ => None,
        }
    }

    /// The group, if this node is one.
    pub fn as_group(&self) -> Option<&ParsedHedGroup<'s>> {
        match self {
            ParsedHedSubstring::Group(g) => Some(g),
            _ => None,
        }
    }

    /// The column splice, if this node is one.
    pub fn as_column_splice(&self) -> Option<&ParsedHedColumnSplice> {
        match self {
            ParsedHedSubstring::ColumnSplice(c) => Some(c),
            _ => None,
        }
    }
}

/// A fully parsed HED string.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedHedString<'s> {
    hed_string: String,
    tree: Vec<ParsedHedSubstring<'s>>,
    normalized: String,
}

impl<'s> ParsedHedString<'s> {
    pub(crate) fn new(
        hed_string: &str,
        tree: Vec<ParsedHedSubstring<'s>>,
    ) -> Result<Self, Diagnostic> {
        let normalized = normalize_children(&tree)?;
        Ok(Self {
            hed_string: hed_string.to_string(),
            tree,
            normalized,
        })
    }

    /// Source string.
    pub fn hed_string(&self) -> &str {
        &self.hed_string
    }

    /// Top-level nodes in source order.
    pub fn children(&self) -> &[ParsedHedSubstring<'s>] {
        &self.tree
    }

    /// Consume the string, returning its top-level nodes.
    pub fn into_children(self) -> Vec<ParsedHedSubstring<'s>> {
        self.tree
    }

    /// Tags outside any group.
    pub fn top_level_tags(&self) -> impl Iterator<Item = &ParsedHedTag<'s>> {
        self.tree.iter().filter_map(ParsedHedSubstring::as_tag)
    }

    /// Top-level groups.
    pub fn tag_groups(&self) -> impl Iterator<Item = &ParsedHedGroup<'s>> {
        self.tree.iter().filter_map(ParsedHedSubstring::as_group)
    }

    /// Every tag: top-level tags first, then the tags of each group.
    pub fn tags(&self) -> Vec<&ParsedHedTag<'s>> {
        let mut tags: Vec<_> = self.top_level_tags().collect();
        for group in self.tag_groups() {
            tags.extend(group.all_tags());
        }
        tags
    }

    /// Every group at any depth.
    pub fn all_groups(&self) -> Vec<&ParsedHedGroup<'s>> {
        let mut groups = Vec::new();
        collect_groups(&self.tree, &mut groups);
        groups
    }

    /// Every column splice at any depth.
    pub fn column_splices(&self) -> Vec<&ParsedHedColumnSplice> {
        let mut splices = Vec::new();
        collect_splices(&self.tree, &mut splices);
        splices
    }

    /// Top-level groups headed by `Definition`.
    pub fn definitions(&self) -> impl Iterator<Item = &ParsedHedGroup<'s>> {
        self.tag_groups().filter(|g| g.is_definition_group())
    }

    /// Canonical form: sorted top-level node forms joined by `,`.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Whether both strings have the same canonical form.
    pub fn equivalent(&self, other: &ParsedHedString<'_>) -> bool {
        self.normalized == other.normalized
    }
}

// ─── Tree helpers ──────────────────────────────────────────────────────────

fn collect_tags<'a, 's>(nodes: &'a [ParsedHedSubstring<'s>], out: &mut Vec<&'a ParsedHedTag<'s>>) {
    out.extend(nodes.iter().filter_map(ParsedHedSubstring::as_tag));
    for group in nodes.iter().filter_map(ParsedHedSubstring::as_group) {
        collect_tags(&group.children, out);
    }
}

fn collect_groups<'a, 's>(
    nodes: &'a [ParsedHedSubstring<'s>],
    out: &mut Vec<&'a ParsedHedGroup<'s>>,
) {
    for group in nodes.iter().filter_map(ParsedHedSubstring::as_group) {
        out.push(group);
        collect_groups(&group.children, out);
    }
}

fn collect_splices<'a>(
    nodes: &'a [ParsedHedSubstring<'_>],
    out: &mut Vec<&'a ParsedHedColumnSplice>,
) {
    for node in nodes {
        match node {
            ParsedHedSubstring::ColumnSplice(c) => out.push(c),
            ParsedHedSubstring::Group(g) => collect_splices(&g.children, out),
            ParsedHedSubstring::Tag(_) => {}
        }
    }
}

/// Sort the children's normal forms and join them with `,`. Two equal forms
/// are a duplicate, reported on the one that appears later in the source.
fn normalize_children(children: &[ParsedHedSubstring<'_>]) -> Result<String, Diagnostic> {
    let mut forms: Vec<(&str, usize)> = children
        .iter()
        .enumerate()
        .map(|(i, c)| (c.normalized(), i))
        .collect();
    forms.sort_unstable();
    for pair in forms.windows(2) {
        let [(a, _), (b, later)] = pair else { continue };
        if a == b {
            let node = &children[*later];
            return Err(Diagnostic::error(
                codes::DUPLICATE_TAG,
                format!("duplicate tag or group '{}'", node.original_tag()),
                Some(node.bounds()),
            )
            .with_context(ctx!("tag" => node.original_tag())));
        }
    }
    Ok(forms
        .into_iter()
        .map(|(form, _)| form)
        .collect::<Vec<_>>()
        .join(","))
}
