//! Context rules: where definitions and placeholders may appear, plus the
//! non-blocking warnings.

use super::ParseOptions;
use crate::grammar::ast::{ParsedHedString, ParsedHedSubstring, ParsedHedTag};
use crate::grammar::diag::{Diagnostic, codes};
use crate::reserved;

type Check = Result<(), Diagnostic>;

pub(super) fn check_definitions(parsed: &ParsedHedString<'_>, options: &ParseOptions) -> Check {
    if let Some(group) = parsed
        .all_groups()
        .into_iter()
        .find(|g| g.is_def_expand_group() && g.has_column_splices())
    {
        return Err(Diagnostic::error(
            codes::CURLY_BRACES_IN_DEFINITION,
            "Def-expand group contains a column splice",
            Some(group.bounds()),
        )
        .with_context(ctx!("group" => group.original_tag())));
    }

    let tags = parsed.tags();
    let mut definition_tags = tags.iter().filter(|t| t.is_reserved(reserved::DEFINITION));
    let Some(first) = definition_tags.next() else {
        return Ok(());
    };
    if !options.definitions_allowed {
        return Err(Diagnostic::error(
            codes::ILLEGAL_DEFINITION_CONTEXT,
            "definitions are not allowed here",
            Some(first.bounds()),
        )
        .with_context(ctx!("tag" => first.original_tag())));
    }

    let placed: Vec<&ParsedHedTag<'_>> = parsed
        .tag_groups()
        .flat_map(|g| g.reserved_tags(reserved::DEFINITION))
        .collect();
    if let Some(stray) = std::iter::once(first)
        .chain(definition_tags)
        .find(|t| !placed.iter().any(|p| std::ptr::eq(*p, **t)))
    {
        return Err(Diagnostic::error(
            codes::INVALID_DEFINITION,
            format!(
                "'{}' must head a top-level definition group",
                stray.original_tag()
            ),
            Some(stray.bounds()),
        )
        .with_context(ctx!("tag" => stray.original_tag())));
    }

    for node in parsed.children() {
        if let ParsedHedSubstring::Group(g) = node
            && g.is_definition_group()
        {
            continue;
        }
        return Err(Diagnostic::error(
            codes::ILLEGAL_IN_EXCLUSIVE_CONTEXT,
            format!(
                "'{}' cannot appear in a string holding definitions",
                node.original_tag()
            ),
            Some(node.bounds()),
        )
        .with_context(ctx!("tag" => node.original_tag())));
    }

    for group in parsed.definitions() {
        if group.has_column_splices() {
            return Err(Diagnostic::error(
                codes::CURLY_BRACES_IN_DEFINITION,
                "definition contains a column splice",
                Some(group.bounds()),
            )
            .with_context(ctx!("group" => group.original_tag())));
        }
        let Some(tag) = group.definition_tag() else {
            continue;
        };
        let invalid_name = tag.value() == Some("#")
            || tag.split_value().is_some_and(|split| split != "#");
        if invalid_name {
            return Err(Diagnostic::error(
                codes::INVALID_DEFINITION,
                format!("'{}' is not a valid definition name", tag.remainder()),
                Some(tag.bounds()),
            )
            .with_context(ctx!("tag" => tag.original_tag())));
        }
        let expected = usize::from(tag.split_value().is_some());
        let found = group.top_groups().next().map_or(0, |c| c.placeholder_count());
        if found != expected {
            return Err(Diagnostic::error(
                codes::INVALID_PLACEHOLDER_COUNT,
                format!(
                    "definition '{}' has {found} placeholders in its contents, expected {expected}",
                    tag.value().unwrap_or_default()
                ),
                Some(group.bounds()),
            )
            .with_context(ctx!(
                "definition" => tag.value().unwrap_or_default(),
                "count" => found.to_string(),
            )));
        }
    }
    Ok(())
}

pub(super) fn check_placeholders(parsed: &ParsedHedString<'_>, options: &ParseOptions) -> Check {
    let mut candidates: Vec<&ParsedHedTag<'_>> = parsed.top_level_tags().collect();
    for group in parsed.tag_groups().filter(|g| !g.is_definition_group()) {
        candidates.extend(group.all_tags());
    }
    let mut placeholders = candidates.into_iter().filter(|t| t.is_placeholder());
    let Some(first) = placeholders.next() else {
        return Ok(());
    };
    if !options.placeholders_allowed {
        return Err(Diagnostic::error(
            codes::INVALID_PLACEHOLDER_CONTEXT,
            format!("placeholder in '{}' is not allowed here", first.original_tag()),
            Some(first.bounds()),
        )
        .with_context(ctx!("tag" => first.original_tag())));
    }
    if let Some(second) = placeholders.next() {
        return Err(Diagnostic::error(
            codes::INVALID_PLACEHOLDER_COUNT,
            "a string may hold at most one placeholder outside definitions",
            Some(second.bounds()),
        )
        .with_context(ctx!("tag" => second.original_tag(), "count" => "2")));
    }
    Ok(())
}

pub(super) fn collect_warnings(parsed: &ParsedHedString<'_>) -> Vec<Diagnostic> {
    let mut warnings = Vec::new();
    for tag in parsed.tags() {
        if let Some(extension) = tag.extension() {
            warnings.push(
                Diagnostic::coded(
                    codes::EXTENDED_TAG,
                    format!("'{}' extends '{}'", tag.original_tag(), tag.long_name()),
                    Some(tag.bounds()),
                )
                .with_context(ctx!("tag" => tag.original_tag(), "extension" => extension)),
            );
        }
        if let Some(version) = tag.deprecated_from() {
            warnings.push(
                Diagnostic::coded(
                    codes::DEPRECATED_TAG,
                    format!(
                        "'{}' is deprecated since schema version {version}",
                        tag.long_name()
                    ),
                    Some(tag.bounds()),
                )
                .with_context(ctx!("tag" => tag.original_tag(), "version" => version)),
            );
        }
    }
    warnings
}
