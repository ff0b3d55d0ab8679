//! Definitions and the registry that expands `Def` and `Def-expand`.
//!
//! A definition string looks like `(Definition/Name/#, (Item-count/#))`. The
//! optional `#` makes it take one value, which replaces the single
//! placeholder in its contents when a `Def/Name/3` reference is expanded.

use crate::grammar::ast::{ParsedHedGroup, ParsedHedString, ParsedHedSubstring, ParsedHedTag};
use crate::grammar::diag::{Diagnostic, codes};
use crate::grammar::parser::parse_hed_string;
use crate::reserved;
use crate::validate::{ParseOptions, validate_hed_string, validate_hed_strings};
use hed_toolchain_schema::HedSchemas;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// A registered definition.
#[derive(Debug, Clone)]
pub struct Definition<'s> {
    name: String,
    def_tag: ParsedHedTag<'s>,
    def_group: ParsedHedGroup<'s>,
    contents: Option<ParsedHedGroup<'s>>,
    placeholder: bool,
}

impl<'s> Definition<'s> {
    /// Build a definition from a group headed by a `Definition` tag.
    /// Returns `None` for any other group.
    pub fn from_group(group: &ParsedHedGroup<'s>) -> Option<Self> {
        let def_tag = group.definition_tag()?;
        Some(Self {
            name: def_tag.def_name()?.to_string(),
            def_tag: def_tag.clone(),
            def_group: group.clone(),
            contents: group.top_groups().next().cloned(),
            placeholder: def_tag.split_value().is_some(),
        })
    }

    /// Parse and validate a string holding exactly one definition.
    pub fn create(input: &str, schemas: &'s HedSchemas) -> Result<Self, Vec<Diagnostic>> {
        let result = validate_hed_string(input, schemas, &ParseOptions::definitions());
        let Some(parsed) = result.parsed else {
            return Err(result.errors);
        };
        let mut groups = parsed.definitions();
        match (groups.next(), groups.next()) {
            (Some(group), None) => Self::from_group(group).ok_or_else(|| {
                vec![Diagnostic::error(
                    codes::INTERNAL_ERROR,
                    "definition group has no definition name",
                    Some(group.bounds()),
                )]
            }),
            _ => Err(vec![Diagnostic::error(
                codes::INVALID_DEFINITION,
                "string must hold exactly one definition",
                None,
            )
            .with_context(ctx!("string" => input))]),
        }
    }

    /// Name as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `Definition` tag.
    pub fn def_tag(&self) -> &ParsedHedTag<'s> {
        &self.def_tag
    }

    /// The whole definition group.
    pub fn def_group(&self) -> &ParsedHedGroup<'s> {
        &self.def_group
    }

    /// The contents subgroup, if any.
    pub fn contents(&self) -> Option<&ParsedHedGroup<'s>> {
        self.contents.as_ref()
    }

    /// Whether the definition takes a value.
    pub fn has_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Same name (ignoring case), same placeholder shape, and equivalent contents.
    pub fn equivalent(&self, other: &Definition<'_>) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.placeholder == other.placeholder
            && match (&self.contents, &other.contents) {
                (None, None) => true,
                (Some(a), Some(b)) => a.equivalent(b),
                _ => false,
            }
    }

    /// Expand a `Def` or `Def-expand` reference into this definition's
    /// contents, substituting the reference's value for the placeholder.
    ///
    /// Errors from re-parsing the substituted contents are reported at the
    /// reference's bounds.
    pub fn evaluate<'a>(
        &self,
        tag: &ParsedHedTag<'_>,
        schemas: &'a HedSchemas,
    ) -> Result<Option<ParsedHedGroup<'a>>, Diagnostic> {
        let value = tag.split_value();
        if value.is_some() != self.placeholder {
            let (code, expected) = match (tag.is_reserved(reserved::DEF_EXPAND), self.placeholder) {
                (false, true) => (codes::MISSING_DEFINITION_FOR_DEF, "takes a value"),
                (false, false) => (codes::MISSING_DEFINITION_FOR_DEF, "takes no value"),
                (true, true) => (codes::MISSING_DEFINITION_FOR_DEF_EXPAND, "takes a value"),
                (true, false) => (codes::MISSING_DEFINITION_FOR_DEF_EXPAND, "takes no value"),
            };
            return Err(Diagnostic::error(
                code,
                format!("'{}': definition '{}' {expected}", tag.original_tag(), self.name),
                Some(tag.bounds()),
            )
            .with_context(ctx!("tag" => tag.original_tag(), "definition" => self.name.as_str())));
        }
        let Some(contents) = &self.contents else {
            return Ok(None);
        };
        let text = match value {
            Some(value) => contents.original_tag().replacen('#', value, 1),
            None => contents.original_tag().to_string(),
        };

        let result = parse_hed_string(&text, schemas);
        let group = result.parsed.and_then(|parsed| {
            match parsed.into_children().pop() {
                Some(ParsedHedSubstring::Group(group)) => Some(group),
                _ => None,
            }
        });
        match group {
            Some(group) => Ok(Some(group)),
            None => {
                let mut diag = result.diagnostics.into_iter().next().unwrap_or_else(|| {
                    Diagnostic::error(
                        codes::INTERNAL_ERROR,
                        format!("expanded contents '{text}' are not a group"),
                        None,
                    )
                });
                diag.span = Some(tag.bounds());
                Err(diag)
            }
        }
    }
}

/// Registry of definitions keyed by lower-case name.
///
/// Registration takes `&mut self`; callers sharing a manager across threads
/// must serialize writes.
#[derive(Debug, Clone, Default)]
pub struct DefinitionManager<'s> {
    definitions: HashMap<String, Definition<'s>>,
}

impl<'s> DefinitionManager<'s> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse definition strings (in parallel) and extract their definitions.
    /// Strings that fail validation contribute their errors instead.
    pub fn create_definitions<S>(
        strings: &[S],
        schemas: &'s HedSchemas,
    ) -> (Vec<Definition<'s>>, Vec<Diagnostic>)
    where
        S: AsRef<str> + Sync,
    {
        let mut definitions = Vec::new();
        let mut issues = Vec::new();
        for (input, result) in strings
            .iter()
            .zip(validate_hed_strings(strings, schemas, &ParseOptions::definitions()))
        {
            let Some(parsed) = result.parsed else {
                issues.extend(result.errors);
                continue;
            };
            let before = definitions.len();
            definitions.extend(parsed.definitions().filter_map(Definition::from_group));
            if definitions.len() == before {
                issues.push(
                    Diagnostic::error(
                        codes::INVALID_DEFINITION,
                        "string holds no definition",
                        None,
                    )
                    .with_context(ctx!("string" => input.as_ref())),
                );
            }
        }
        (definitions, issues)
    }

    /// Register a definition. A second definition with the same name is
    /// accepted only if it is equivalent to the first.
    pub fn add_definition(&mut self, definition: Definition<'s>) -> Vec<Diagnostic> {
        match self.definitions.entry(definition.name.to_lowercase()) {
            Entry::Vacant(slot) => {
                tracing::debug!(name = %definition.name, "registered definition");
                slot.insert(definition);
                Vec::new()
            }
            Entry::Occupied(existing) if existing.get().equivalent(&definition) => Vec::new(),
            Entry::Occupied(existing) => vec![
                Diagnostic::error(
                    codes::CONFLICTING_DEFINITIONS,
                    format!(
                        "definition '{}' conflicts with an earlier definition",
                        definition.name
                    ),
                    Some(definition.def_group.bounds()),
                )
                .with_context(ctx!(
                    "definition" => definition.name.as_str(),
                    "existing" => existing.get().def_group.original_tag(),
                )),
            ],
        }
    }

    /// Register several definitions, collecting every conflict.
    pub fn add_definitions(
        &mut self,
        definitions: impl IntoIterator<Item = Definition<'s>>,
    ) -> Vec<Diagnostic> {
        definitions
            .into_iter()
            .flat_map(|d| self.add_definition(d))
            .collect()
    }

    /// Definition registered under `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Definition<'s>> {
        self.definitions.get(&name.to_lowercase())
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no definition is registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Registered definitions in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Definition<'s>> {
        self.definitions.values()
    }

    fn lookup(
        &self,
        tag: &ParsedHedTag<'_>,
        missing: &'static str,
    ) -> Result<&Definition<'s>, Diagnostic> {
        let name = tag.def_name().unwrap_or_default();
        self.get(name).ok_or_else(|| {
            Diagnostic::error(
                missing,
                format!("no definition named '{name}'"),
                Some(tag.bounds()),
            )
            .with_context(ctx!("tag" => tag.original_tag(), "definition" => name))
        })
    }

    /// Resolve every `Def` tag in `parsed`. Stops at the first failure.
    pub fn validate_defs(
        &self,
        parsed: &ParsedHedString<'_>,
        schemas: &HedSchemas,
        placeholders_allowed: bool,
    ) -> Vec<Diagnostic> {
        let check = || -> Result<(), Diagnostic> {
            for tag in parsed.tags() {
                if !tag.is_reserved(reserved::DEF) {
                    continue;
                }
                check_placeholder(tag, placeholders_allowed)?;
                let definition = self.lookup(tag, codes::MISSING_DEFINITION_FOR_DEF)?;
                definition.evaluate(tag, schemas)?;
            }
            Ok(())
        };
        check().err().into_iter().collect()
    }

    /// Resolve every `Def-expand` group in `parsed` and verify its inline
    /// contents match the expanded definition. Stops at the first failure.
    pub fn validate_def_expands(
        &self,
        parsed: &ParsedHedString<'_>,
        schemas: &HedSchemas,
        placeholders_allowed: bool,
    ) -> Vec<Diagnostic> {
        let check = || -> Result<(), Diagnostic> {
            for group in parsed.all_groups() {
                let Some(tag) = group.def_expand_tags().next() else {
                    continue;
                };
                check_placeholder(tag, placeholders_allowed)?;
                let definition = self.lookup(tag, codes::MISSING_DEFINITION_FOR_DEF_EXPAND)?;
                let expanded = definition.evaluate(tag, schemas)?;
                let matches = match (group.top_groups().next(), &expanded) {
                    (None, None) => true,
                    (Some(inline), Some(expanded)) => inline.equivalent(expanded),
                    _ => false,
                };
                if !matches {
                    return Err(Diagnostic::error(
                        codes::DEF_EXPAND_CONTENTS_MISMATCH,
                        format!(
                            "contents of '{}' do not match definition '{}'",
                            group.original_tag(),
                            definition.name()
                        ),
                        Some(group.bounds()),
                    )
                    .with_context(ctx!(
                        "group" => group.original_tag(),
                        "definition" => definition.name(),
                    )));
                }
            }
            Ok(())
        };
        check().err().into_iter().collect()
    }
}

fn check_placeholder(
    tag: &ParsedHedTag<'_>,
    placeholders_allowed: bool,
) -> Result<(), Diagnostic> {
    if tag.is_placeholder() && !placeholders_allowed {
        return Err(Diagnostic::error(
            codes::INVALID_PLACEHOLDER_CONTEXT,
            format!("placeholder in '{}' is not allowed here", tag.original_tag()),
            Some(tag.bounds()),
        )
        .with_context(ctx!("tag" => tag.original_tag())));
    }
    Ok(())
}
