//! Reserved tags: tags with structural meaning beyond their schema attributes.
//!
//! The [`ReservedTagTable`] is immutable configuration. The parser consults
//! it to recognise reserved tags (and two-level values such as
//! `Def/Name/Value`); the reserved checker consults it for group-shape rules.
//! [`ReservedTagTable::standard`] is built once; callers may construct their
//! own table with [`ReservedTagTable::from_entries`] and pass it explicitly.

use std::collections::HashMap;
use std::sync::OnceLock;

/// `Definition` tag name.
pub const DEFINITION: &str = "Definition";
/// `Def` tag name.
pub const DEF: &str = "Def";
/// `Def-expand` tag name.
pub const DEF_EXPAND: &str = "Def-expand";
/// `Onset` tag name.
pub const ONSET: &str = "Onset";
/// `Inset` tag name.
pub const INSET: &str = "Inset";
/// `Offset` tag name.
pub const OFFSET: &str = "Offset";
/// `Delay` tag name.
pub const DELAY: &str = "Delay";
/// `Duration` tag name.
pub const DURATION: &str = "Duration";
/// `Event-context` tag name.
pub const EVENT_CONTEXT: &str = "Event-context";

/// Requirements attached to one reserved tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedTag {
    /// Canonical tag name.
    pub name: &'static str,
    /// Must be a top tag of a top-level group.
    pub top_level: bool,
    /// Must appear inside some group.
    pub requires_group: bool,
    /// The group the tag heads is checked against the fields below.
    pub group_rules: bool,
    /// Must be the only top tag of its group.
    pub exclusive: bool,
    /// The group must reference exactly one definition (`Def` or a `Def-expand` subgroup).
    pub requires_def: bool,
    /// Minimum number of non-definition subgroups.
    pub min_subgroups: usize,
    /// Maximum number of non-definition subgroups; `None` is unbounded.
    pub max_subgroups: Option<usize>,
    /// Other non-`Def` tags allowed at the top of the group.
    pub other_allowed: &'static [&'static str],
    /// Tags that may not appear anywhere inside the group's subgroups.
    pub forbidden_subgroup_tags: &'static [&'static str],
    /// Schema extension of the tag is forbidden.
    pub no_extension: bool,
    /// The value may carry a second level (`Def/Name/Value`).
    pub two_level_value: bool,
}

const NESTED_FORBIDDEN: &[&str] = &[
    DEFINITION,
    DEF,
    DEF_EXPAND,
    ONSET,
    INSET,
    OFFSET,
    DELAY,
    DURATION,
    EVENT_CONTEXT,
];

const BASE: ReservedTag = ReservedTag {
    name: "",
    top_level: false,
    requires_group: false,
    group_rules: false,
    exclusive: false,
    requires_def: false,
    min_subgroups: 0,
    max_subgroups: None,
    other_allowed: &[],
    forbidden_subgroup_tags: &[],
    no_extension: true,
    two_level_value: false,
};

const RESERVED_TAG_REGISTRY: &[ReservedTag] = &[
    ReservedTag {
        name: DEFINITION,
        top_level: true,
        requires_group: true,
        group_rules: true,
        exclusive: true,
        max_subgroups: Some(1),
        forbidden_subgroup_tags: NESTED_FORBIDDEN,
        two_level_value: true,
        ..BASE
    },
    ReservedTag {
        name: DEF,
        two_level_value: true,
        ..BASE
    },
    ReservedTag {
        name: DEF_EXPAND,
        requires_group: true,
        group_rules: true,
        exclusive: true,
        max_subgroups: Some(1),
        forbidden_subgroup_tags: NESTED_FORBIDDEN,
        two_level_value: true,
        ..BASE
    },
    ReservedTag {
        name: ONSET,
        top_level: true,
        group_rules: true,
        requires_def: true,
        max_subgroups: Some(1),
        other_allowed: &[DELAY],
        ..BASE
    },
    ReservedTag {
        name: INSET,
        top_level: true,
        group_rules: true,
        requires_def: true,
        max_subgroups: Some(1),
        other_allowed: &[DELAY],
        ..BASE
    },
    ReservedTag {
        name: OFFSET,
        top_level: true,
        group_rules: true,
        requires_def: true,
        max_subgroups: Some(0),
        other_allowed: &[DELAY],
        ..BASE
    },
    ReservedTag {
        name: DELAY,
        top_level: true,
        group_rules: true,
        max_subgroups: Some(1),
        other_allowed: &[ONSET, INSET, OFFSET, DURATION],
        ..BASE
    },
    ReservedTag {
        name: DURATION,
        top_level: true,
        group_rules: true,
        min_subgroups: 1,
        max_subgroups: Some(1),
        other_allowed: &[DELAY],
        ..BASE
    },
    ReservedTag {
        name: EVENT_CONTEXT,
        top_level: true,
        group_rules: true,
        ..BASE
    },
];

/// Lookup table of reserved tags by name.
#[derive(Debug, Clone)]
pub struct ReservedTagTable {
    entries: Vec<ReservedTag>,
    by_name: HashMap<String, usize>,
}

static STANDARD_TABLE: OnceLock<ReservedTagTable> = OnceLock::new();

impl ReservedTagTable {
    /// The reserved tags of the standard HED schema.
    pub fn standard() -> &'static ReservedTagTable {
        STANDARD_TABLE.get_or_init(|| Self::from_entries(RESERVED_TAG_REGISTRY.to_vec()))
    }

    /// Build a table from explicit entries. Later entries replace earlier
    /// ones with the same (case-insensitive) name.
    pub fn from_entries(entries: Vec<ReservedTag>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            by_name.insert(entry.name.to_lowercase(), i);
        }
        Self { entries, by_name }
    }

    /// Entry for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&ReservedTag> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&i| &self.entries[i])
    }

    /// Whether the reserved entry for `name` forbids schema extension.
    pub fn forbids_extension(&self, name: &str) -> bool {
        self.get(name).is_some_and(|e| e.no_extension)
    }

    /// Whether `name` takes a two-level value.
    pub fn allows_two_level_value(&self, name: &str) -> bool {
        self.get(name).is_some_and(|e| e.two_level_value)
    }

    /// All entries.
    pub fn iter(&self) -> impl Iterator<Item = &ReservedTag> {
        self.entries.iter()
    }
}
