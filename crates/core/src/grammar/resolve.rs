//! Tag resolution: matching a tag token against the schema hierarchy.
//!
//! A tag is split on `/` and walked level by level. The walk ends at a
//! value tag (the rest is a value, possibly with a unit), at an unknown
//! level (the rest is an extension), or after the last level.

use super::diag::{Diagnostic, Span, codes};
use super::tokenizer::TagSpec;
use crate::reserved::ReservedTagTable;
use hed_toolchain_schema::{HedSchema, HedSchemas, NAME_CLASS, TagId, attributes};
use thiserror::Error;

/// Why a tag could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// The tag has no prefix and no base schema is loaded.
    #[error("no base schema is loaded for tag '{tag}'")]
    UnmatchedBaseSchema {
        /// Tag text.
        tag: String,
    },
    /// The tag's library prefix names no loaded schema.
    #[error("library prefix '{prefix}' of tag '{tag}' names no loaded schema")]
    UnmatchedLibrarySchema {
        /// Tag text.
        tag: String,
        /// Library prefix.
        prefix: String,
    },
    /// The first level is unknown or a level is blank-padded or empty.
    #[error("'{tag}' is not a valid tag")]
    InvalidTag {
        /// Tag text.
        tag: String,
    },
    /// An extension level is not allowed or is not a valid name.
    #[error("'{extension}' is not a valid extension of '{parent}'")]
    InvalidExtension {
        /// Offending level.
        extension: String,
        /// Long name of the extended tag.
        parent: String,
    },
    /// A schema tag appears under the wrong parent.
    #[error("'{tag}' cannot appear under '{parent}'; its schema path is '{expected}'")]
    InvalidParentNode {
        /// Offending level.
        tag: String,
        /// Levels preceding it as written.
        parent: String,
        /// The level's schema long name.
        expected: String,
    },
    /// A `requireChild` tag was used bare.
    #[error("'{tag}' requires a child")]
    ChildRequired {
        /// Long name of the tag.
        tag: String,
    },
    /// The value matches none of the tag's value classes.
    #[error("'{value}' is not a valid value for '{tag}'")]
    InvalidValue {
        /// Long name of the tag.
        tag: String,
        /// Offending value.
        value: String,
    },
    /// The unit belongs to none of the tag's unit classes.
    #[error("'{unit}' is not a valid unit for '{tag}'")]
    InvalidUnit {
        /// Long name of the tag.
        tag: String,
        /// Offending unit text.
        unit: String,
    },
}

impl TagError {
    /// Diagnostic code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            TagError::UnmatchedBaseSchema { .. } => codes::UNMATCHED_BASE_SCHEMA,
            TagError::UnmatchedLibrarySchema { .. } => codes::UNMATCHED_LIBRARY_SCHEMA,
            TagError::InvalidTag { .. } => codes::INVALID_TAG,
            TagError::InvalidExtension { .. } => codes::INVALID_EXTENSION,
            TagError::InvalidParentNode { .. } => codes::INVALID_PARENT_NODE,
            TagError::ChildRequired { .. } => codes::CHILD_REQUIRED,
            TagError::InvalidValue { .. } => codes::INVALID_VALUE,
            TagError::InvalidUnit { .. } => codes::INVALID_UNIT,
        }
    }

    /// Convert into a diagnostic located at `span`.
    pub fn into_diagnostic(self, span: Span) -> Diagnostic {
        let message = self.to_string();
        let context = match &self {
            TagError::UnmatchedBaseSchema { tag } | TagError::InvalidTag { tag } => {
                ctx!("tag" => tag.as_str())
            }
            TagError::UnmatchedLibrarySchema { tag, prefix } => {
                ctx!("tag" => tag.as_str(), "prefix" => prefix.as_str())
            }
            TagError::InvalidExtension { extension, parent } => {
                ctx!("extension" => extension.as_str(), "parent" => parent.as_str())
            }
            TagError::InvalidParentNode {
                tag,
                parent,
                expected,
            } => ctx!(
                "tag" => tag.as_str(),
                "parent" => parent.as_str(),
                "expected" => expected.as_str(),
            ),
            TagError::ChildRequired { tag } => ctx!("tag" => tag.as_str()),
            TagError::InvalidValue { tag, value } => {
                ctx!("tag" => tag.as_str(), "value" => value.as_str())
            }
            TagError::InvalidUnit { tag, unit } => {
                ctx!("tag" => tag.as_str(), "unit" => unit.as_str())
            }
        };
        Diagnostic::error(self.code(), message, Some(span)).with_context(context)
    }
}

/// Outcome of resolving one tag.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedTag<'s> {
    pub(crate) schema: &'s HedSchema,
    /// Last matched schema tag, or the value tag for values.
    pub(crate) tag: TagId,
    pub(crate) remainder: String,
    pub(crate) value: Option<String>,
    pub(crate) split_value: Option<String>,
    pub(crate) unit: Option<String>,
    pub(crate) conversion_factor: f64,
    pub(crate) extension: Option<String>,
}

impl<'s> ResolvedTag<'s> {
    fn plain(schema: &'s HedSchema, tag: TagId) -> Self {
        Self {
            schema,
            tag,
            remainder: String::new(),
            value: None,
            split_value: None,
            unit: None,
            conversion_factor: 1.0,
            extension: None,
        }
    }
}

/// Resolve a tag token against the schema selected by its library prefix.
pub(crate) fn resolve_tag<'s>(
    spec: &TagSpec,
    schemas: &'s HedSchemas,
    table: &ReservedTagTable,
) -> Result<ResolvedTag<'s>, TagError> {
    let Some(schema) = schemas.get(&spec.library) else {
        return Err(if spec.library.is_empty() {
            TagError::UnmatchedBaseSchema {
                tag: spec.tag.clone(),
            }
        } else {
            TagError::UnmatchedLibrarySchema {
                tag: spec.tag.clone(),
                prefix: spec.library.clone(),
            }
        });
    };
    TagResolver {
        schema,
        table,
        tag: &spec.tag,
        levels: spec.tag.split('/').collect(),
    }
    .resolve()
}

// ─── Resolver Implementation ───────────────────────────────────────────────

struct TagResolver<'s, 'a> {
    schema: &'s HedSchema,
    table: &'a ReservedTagTable,
    tag: &'a str,
    levels: Vec<&'a str>,
}

fn is_blank_padded(level: &str) -> bool {
    level.is_empty() || level.trim() != level
}

/// Values of tags without value classes: non-empty, no braces or commas.
fn default_value_ok(value: &str) -> bool {
    !value.is_empty() && !value.contains(['{', '}', ','])
}

impl<'s> TagResolver<'s, '_> {
    fn resolve(&self) -> Result<ResolvedTag<'s>, TagError> {
        let mut matched: Option<TagId> = None;
        for index in 0..self.levels.len() {
            if let Some(parent) = matched
                && let Some(value_tag) = self.schema.tag(parent).value_tag
            {
                return self.finish_value(value_tag, index);
            }
            match self.match_level(matched, index)? {
                Some(id) => matched = Some(id),
                None => {
                    let Some(parent) = matched else {
                        return Err(self.invalid_tag());
                    };
                    return self.finish_extension(parent, index);
                }
            }
        }
        let Some(tag) = matched else {
            return Err(self.invalid_tag());
        };
        if self.schema.has_attribute(tag, attributes::REQUIRE_CHILD) {
            return Err(TagError::ChildRequired {
                tag: self.schema.long_name(tag),
            });
        }
        Ok(ResolvedTag::plain(self.schema, tag))
    }

    fn invalid_tag(&self) -> TagError {
        TagError::InvalidTag {
            tag: self.tag.to_string(),
        }
    }

    fn written_parent(&self, index: usize) -> String {
        self.levels[..index].join("/")
    }

    /// Match level `index` against the schema. `None` means the level is
    /// unknown and starts an extension.
    fn match_level(&self, parent: Option<TagId>, index: usize) -> Result<Option<TagId>, TagError> {
        let level = self.levels[index];
        if is_blank_padded(level) {
            return Err(self.invalid_tag());
        }
        match self.schema.lookup_tag(level) {
            Some(id) if index > 0 && self.schema.tag(id).parent != parent => {
                Err(TagError::InvalidParentNode {
                    tag: level.to_string(),
                    parent: self.written_parent(index),
                    expected: self.schema.long_name(id),
                })
            }
            Some(id) => Ok(Some(id)),
            None if index == 0 => Err(self.invalid_tag()),
            None => Ok(None),
        }
    }

    fn valid_name(&self, level: &str) -> bool {
        self.schema
            .validate_value_class(NAME_CLASS, level)
            .unwrap_or_else(|| {
                level
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
            })
    }

    fn finish_extension(&self, parent: TagId, index: usize) -> Result<ResolvedTag<'s>, TagError> {
        let parent_name = &self.schema.tag(parent).name;
        if !self.schema.allows_extension(parent) || self.table.forbids_extension(parent_name) {
            return Err(TagError::InvalidExtension {
                extension: self.levels[index].to_string(),
                parent: self.schema.long_name(parent),
            });
        }
        for (offset, level) in self.levels[index..].iter().enumerate() {
            if is_blank_padded(level) {
                return Err(self.invalid_tag());
            }
            if let Some(id) = self.schema.lookup_tag(level) {
                return Err(TagError::InvalidParentNode {
                    tag: level.to_string(),
                    parent: self.written_parent(index + offset),
                    expected: self.schema.long_name(id),
                });
            }
            if !self.valid_name(level) {
                return Err(TagError::InvalidExtension {
                    extension: level.to_string(),
                    parent: self.schema.long_name(parent),
                });
            }
        }
        let extension = self.levels[index..].join("/");
        Ok(ResolvedTag {
            remainder: extension.clone(),
            extension: Some(extension),
            ..ResolvedTag::plain(self.schema, parent)
        })
    }

    fn finish_value(&self, value_tag: TagId, index: usize) -> Result<ResolvedTag<'s>, TagError> {
        let remainder = self.levels[index..].join("/");
        let base = self.schema.base_tag(value_tag);
        let base_name = &self.schema.tag(base).name;

        let (value_text, split_value) = match remainder.split_once('/') {
            Some((value, split)) if self.table.allows_two_level_value(base_name) => {
                (value.to_string(), Some(split.to_string()))
            }
            _ => (remainder.clone(), None),
        };

        let (value, unit, conversion_factor) = self.split_units(value_tag, &value_text)?;
        self.check_value(value_tag, &value)?;
        if let Some(split) = &split_value
            && split != "#"
            && !default_value_ok(split)
        {
            return Err(TagError::InvalidValue {
                tag: self.schema.long_name(base),
                value: split.clone(),
            });
        }

        Ok(ResolvedTag {
            remainder,
            value: Some(value),
            split_value,
            unit,
            conversion_factor,
            ..ResolvedTag::plain(self.schema, value_tag)
        })
    }

    /// Split a unit off `text` using the value tag's unit classes.
    fn split_units(
        &self,
        value_tag: TagId,
        text: &str,
    ) -> Result<(String, Option<String>, f64), TagError> {
        let classes = &self.schema.tag(value_tag).unit_classes;
        let mut unknown_unit = None;
        for class in classes {
            let Some(split) = self.schema.extract_unit(class, text) else {
                continue;
            };
            if split.unit.is_some() {
                return Ok((split.value, split.unit_text, split.conversion_factor));
            }
            if unknown_unit.is_none() {
                unknown_unit = split.unit_text;
            }
        }
        if let Some(unit) = unknown_unit {
            return Err(TagError::InvalidUnit {
                tag: self.schema.long_name(value_tag),
                unit,
            });
        }
        Ok((text.to_string(), None, 1.0))
    }

    fn check_value(&self, value_tag: TagId, value: &str) -> Result<(), TagError> {
        if value == "#" {
            return Ok(());
        }
        let classes = &self.schema.tag(value_tag).value_classes;
        let valid = if classes.is_empty() {
            default_value_ok(value)
        } else {
            classes
                .iter()
                .any(|class| self.schema.validate_value_class(class, value) == Some(true))
        };
        if valid {
            Ok(())
        } else {
            Err(TagError::InvalidValue {
                tag: self.schema.long_name(value_tag),
                value: value.to_string(),
            })
        }
    }
}
