//! Reserved tag structure: uniqueness, group placement, and group shape.

use crate::grammar::ast::{ParsedHedGroup, ParsedHedString, ParsedHedTag};
use crate::grammar::diag::{Diagnostic, codes};
use crate::reserved::{self, ReservedTag, ReservedTagTable};
use hed_toolchain_schema::attributes;
use std::collections::HashSet;

type Check = Result<(), Diagnostic>;

fn tag_error(id: &'static str, message: String, tag: &ParsedHedTag<'_>) -> Diagnostic {
    Diagnostic::error(id, message, Some(tag.bounds()))
        .with_context(ctx!("tag" => tag.original_tag()))
}

fn group_error(id: &'static str, message: String, group: &ParsedHedGroup<'_>) -> Diagnostic {
    Diagnostic::error(id, message, Some(group.bounds()))
        .with_context(ctx!("group" => group.original_tag()))
}

/// Checks parsed strings against a [`ReservedTagTable`].
#[derive(Debug, Clone, Copy)]
pub struct ReservedChecker<'t> {
    table: &'t ReservedTagTable,
}

impl<'t> ReservedChecker<'t> {
    /// A checker consulting `table`.
    pub fn new(table: &'t ReservedTagTable) -> Self {
        Self { table }
    }

    /// Run every structural check, stopping at the first violation.
    ///
    /// With `full` unset, tags that belong in a top-level group are tolerated
    /// bare at the top level; such strings may still be combined with others.
    pub fn check_hed_string(&self, parsed: &ParsedHedString<'_>, full: bool) -> Check {
        self.check_unique(parsed)?;
        self.check_group_levels(parsed, full)?;
        self.check_top_groups(parsed)?;
        self.check_nested_groups(parsed)
    }

    fn entry(&self, tag: &ParsedHedTag<'_>) -> Option<&'t ReservedTag> {
        tag.reserved_name().and_then(|name| self.table.get(name))
    }

    fn requires_top_level(&self, tag: &ParsedHedTag<'_>) -> bool {
        tag.has_attribute(attributes::TOP_LEVEL_TAG_GROUP)
            || self.entry(tag).is_some_and(|e| e.top_level)
    }

    fn requires_group(&self, tag: &ParsedHedTag<'_>) -> bool {
        tag.has_attribute(attributes::TAG_GROUP)
            || self.entry(tag).is_some_and(|e| e.requires_group)
    }

    fn check_unique(&self, parsed: &ParsedHedString<'_>) -> Check {
        let mut seen = HashSet::new();
        for tag in parsed.tags() {
            if !tag.has_attribute(attributes::UNIQUE) {
                continue;
            }
            let key = (tag.prefix(), tag.long_name().to_lowercase());
            if !seen.insert(key) {
                return Err(tag_error(
                    codes::MULTIPLE_UNIQUE_TAGS,
                    format!("'{}' may appear only once", tag.long_name()),
                    tag,
                ));
            }
        }
        Ok(())
    }

    fn check_group_levels(&self, parsed: &ParsedHedString<'_>, full: bool) -> Check {
        for tag in parsed.top_level_tags() {
            if self.requires_group(tag) {
                return Err(tag_error(
                    codes::MISSING_TAG_GROUP,
                    format!("'{}' must appear inside a tag group", tag.original_tag()),
                    tag,
                ));
            }
            if full && self.requires_top_level(tag) {
                return Err(tag_error(
                    codes::INVALID_TOP_LEVEL_TAG_GROUP_TAG,
                    format!("'{}' must be in a top-level tag group", tag.original_tag()),
                    tag,
                ));
            }
        }
        for group in parsed.tag_groups() {
            for subgroup in group.top_groups() {
                if let Some(tag) = subgroup
                    .all_tags()
                    .into_iter()
                    .find(|t| self.requires_top_level(t))
                {
                    return Err(tag_error(
                        codes::INVALID_TOP_LEVEL_TAG_GROUP_TAG,
                        format!(
                            "'{}' must be directly inside a top-level tag group",
                            tag.original_tag()
                        ),
                        tag,
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_top_groups(&self, parsed: &ParsedHedString<'_>) -> Check {
        for group in parsed.tag_groups() {
            for name in group.reserved_names() {
                if let Some(entry) = self.table.get(name)
                    && entry.group_rules
                {
                    self.check_group(group, entry)?;
                }
            }
        }
        Ok(())
    }

    /// Groups below the top level headed by a reserved tag that may appear
    /// there (`Def-expand`).
    fn check_nested_groups(&self, parsed: &ParsedHedString<'_>) -> Check {
        for top in parsed.tag_groups() {
            for group in top.all_groups().into_iter().skip(1) {
                for name in group.reserved_names() {
                    if let Some(entry) = self.table.get(name)
                        && entry.group_rules
                        && !entry.top_level
                    {
                        self.check_group(group, entry)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn check_group(&self, group: &ParsedHedGroup<'_>, entry: &ReservedTag) -> Check {
        if entry.exclusive
            && (group.top_tags().count() != 1 || group.top_splices().next().is_some())
        {
            return Err(group_error(
                codes::INVALID_GROUP_TOP_TAGS,
                format!("'{}' must be the only tag at the top of its group", entry.name),
                group,
            ));
        }

        if entry.requires_def && group.def_count() != 1 {
            return Err(group_error(
                codes::TEMPORAL_DEF_COUNT,
                format!(
                    "'{}' group must reference exactly one definition, found {}",
                    entry.name,
                    group.def_count()
                ),
                group,
            )
            .with_context(ctx!(
                "group" => group.original_tag(),
                "count" => group.def_count().to_string(),
            )));
        }

        let mut subgroups = group.top_groups().count();
        if entry.requires_def {
            subgroups -= group.def_expand_children().count();
        }
        if subgroups < entry.min_subgroups
            || entry.max_subgroups.is_some_and(|max| subgroups > max)
        {
            let expected = match entry.max_subgroups {
                Some(max) if max == entry.min_subgroups => max.to_string(),
                Some(max) => format!("{}..={max}", entry.min_subgroups),
                None => format!("at least {}", entry.min_subgroups),
            };
            return Err(group_error(
                codes::INVALID_NUMBER_OF_SUBGROUPS,
                format!(
                    "'{}' group has {subgroups} subgroups, expected {expected}",
                    entry.name
                ),
                group,
            )
            .with_context(ctx!(
                "group" => group.original_tag(),
                "count" => subgroups.to_string(),
            )));
        }

        for tag in group.top_tags() {
            if tag.is_reserved(entry.name) || tag.is_reserved(reserved::DEF) {
                continue;
            }
            let allowed = tag
                .reserved_name()
                .is_some_and(|name| entry.other_allowed.contains(&name));
            if !allowed {
                return Err(group_error(
                    codes::INVALID_GROUP_TOP_TAGS,
                    format!(
                        "'{}' cannot appear at the top of a '{}' group",
                        tag.original_tag(),
                        entry.name
                    ),
                    group,
                )
                .with_context(ctx!(
                    "group" => group.original_tag(),
                    "tag" => tag.original_tag(),
                )));
            }
        }

        for subgroup in group.top_groups() {
            if let Some(tag) = subgroup.all_tags().into_iter().find(|t| {
                t.reserved_name()
                    .is_some_and(|name| entry.forbidden_subgroup_tags.contains(&name))
            }) {
                return Err(tag_error(
                    codes::FORBIDDEN_SUBGROUP_TAG,
                    format!(
                        "'{}' cannot appear inside a '{}' group",
                        tag.original_tag(),
                        entry.name
                    ),
                    tag,
                ));
            }
        }
        Ok(())
    }
}
