//! HED schema tables.
//!
//! Defines the tag hierarchy, unit classes, unit modifiers, and value classes
//! of a HED schema. Schemas are deserialized from JSON ([`SchemaSource`]),
//! validated, and indexed into an immutable [`HedSchema`] whose tags live in
//! an arena addressed by [`TagId`]. A [`HedSchemas`] collection maps library
//! prefixes to schemas and is shared by reference across the parser and
//! validators.

mod error;
pub mod source;
pub mod units;

pub use error::SchemaError;
pub use source::{SCHEMA_FORMAT_VERSION, SchemaSource};
pub use units::{Unit, UnitClass, UnitModifier, UnitSplit};

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Schema attribute names the toolchain interprets.
pub mod attributes {
    /// Unknown child levels may extend this tag (inherited by descendants).
    pub const EXTENSION_ALLOWED: &str = "extensionAllowed";
    /// The tag cannot be used without a child, extension, or value.
    pub const REQUIRE_CHILD: &str = "requireChild";
    /// The tag may appear at most once per string.
    pub const UNIQUE: &str = "unique";
    /// The tag must be a top tag of a top-level group.
    pub const TOP_LEVEL_TAG_GROUP: &str = "topLevelTagGroup";
    /// The tag must appear inside a group.
    pub const TAG_GROUP: &str = "tagGroup";
    /// The tag has special meaning to the validator.
    pub const RESERVED: &str = "reserved";
}

/// Name of the value class extension levels are checked against.
pub const NAME_CLASS: &str = "nameClass";

/// Index of a tag within its [`HedSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TagId(u32);

impl TagId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A tag of the schema hierarchy.
#[derive(Debug, Clone)]
pub struct SchemaTag {
    /// Short name (`#` for value tags).
    pub name: String,
    /// Parent tag.
    pub parent: Option<TagId>,
    /// Attributes set directly on the tag.
    pub attributes: Vec<String>,
    /// Unit classes (value tags only).
    pub unit_classes: Vec<String>,
    /// Value classes (value tags only).
    pub value_classes: Vec<String>,
    /// Version the tag was deprecated in.
    pub deprecated_from: Option<String>,
    /// The `#` child, when this tag takes a value.
    pub value_tag: Option<TagId>,
}

impl SchemaTag {
    /// Whether this is a `#` value tag.
    pub fn is_value_tag(&self) -> bool {
        self.name == "#"
    }

    /// Whether the attribute is set directly on this tag.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }
}

/// A compiled value class.
#[derive(Debug, Clone)]
pub struct ValueClass {
    /// Class name.
    pub name: String,
    regex: Regex,
}

impl ValueClass {
    /// Whether `value` matches the class pattern in full.
    pub fn validate(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// A loaded, validated schema.
#[derive(Debug, Clone)]
pub struct HedSchema {
    version: String,
    library: Option<String>,
    tags: Vec<SchemaTag>,
    by_name: HashMap<String, TagId>,
    unit_classes: HashMap<String, UnitClass>,
    unit_modifiers: Vec<UnitModifier>,
    value_classes: HashMap<String, ValueClass>,
}

impl HedSchema {
    /// Parse and validate a schema from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let source: SchemaSource = serde_json::from_str(json)?;
        Self::from_source(source)
    }

    /// Read, parse, and validate a schema file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Index and validate an already-deserialized schema.
    pub fn from_source(source: SchemaSource) -> Result<Self, SchemaError> {
        let mut value_classes = HashMap::with_capacity(source.value_classes.len());
        for entry in source.value_classes {
            let anchored = format!("^(?:{})$", entry.pattern);
            let regex = Regex::new(&anchored).map_err(|e| SchemaError::InvalidPattern {
                class: entry.name.clone(),
                source: e,
            })?;
            value_classes.insert(
                entry.name.clone(),
                ValueClass {
                    name: entry.name,
                    regex,
                },
            );
        }

        let unit_classes: HashMap<String, UnitClass> = source
            .unit_classes
            .into_iter()
            .map(|entry| (entry.name.clone(), UnitClass::from(entry)))
            .collect();
        let unit_modifiers = source
            .unit_modifiers
            .into_iter()
            .flat_map(UnitModifier::from_entry)
            .collect();

        // First pass: assign ids and index names.
        let mut by_name = HashMap::with_capacity(source.tags.len());
        for (i, entry) in source.tags.iter().enumerate() {
            if entry.name == "#" {
                continue;
            }
            let key = entry.name.to_lowercase();
            if by_name.insert(key, TagId(i as u32)).is_some() {
                return Err(SchemaError::DuplicateTag(entry.name.clone()));
            }
        }

        // Second pass: resolve parents and class references.
        let mut tags = Vec::with_capacity(source.tags.len());
        for entry in &source.tags {
            let parent = match &entry.parent {
                Some(parent) => Some(*by_name.get(&parent.to_lowercase()).ok_or_else(|| {
                    SchemaError::UnknownParent {
                        tag: entry.name.clone(),
                        parent: parent.clone(),
                    }
                })?),
                None => None,
            };
            for class in &entry.unit_classes {
                if !unit_classes.contains_key(class) {
                    return Err(SchemaError::UnknownUnitClass {
                        tag: entry.name.clone(),
                        class: class.clone(),
                    });
                }
            }
            for class in &entry.value_classes {
                if !value_classes.contains_key(class) {
                    return Err(SchemaError::UnknownValueClass {
                        tag: entry.name.clone(),
                        class: class.clone(),
                    });
                }
            }
            tags.push(SchemaTag {
                name: entry.name.clone(),
                parent,
                attributes: entry.attributes.clone(),
                unit_classes: entry.unit_classes.clone(),
                value_classes: entry.value_classes.clone(),
                deprecated_from: entry.deprecated_from.clone(),
                value_tag: None,
            });
        }

        // Third pass: link value tags to their parents.
        for i in 0..tags.len() {
            if !tags[i].is_value_tag() {
                continue;
            }
            let Some(parent) = tags[i].parent else {
                return Err(SchemaError::MisplacedValueTag("<root>".to_string()));
            };
            let parent_tag = &mut tags[parent.index()];
            if parent_tag.value_tag.is_some() {
                return Err(SchemaError::MisplacedValueTag(parent_tag.name.clone()));
            }
            parent_tag.value_tag = Some(TagId(i as u32));
        }

        let schema = Self {
            version: source.version,
            library: source.library,
            tags,
            by_name,
            unit_classes,
            unit_modifiers,
            value_classes,
        };
        schema.check_acyclic()?;
        Ok(schema)
    }

    fn check_acyclic(&self) -> Result<(), SchemaError> {
        for (i, tag) in self.tags.iter().enumerate() {
            let mut steps = 0;
            let mut cursor = tag.parent;
            while let Some(p) = cursor {
                steps += 1;
                if p.index() == i || steps > self.tags.len() {
                    return Err(SchemaError::Cycle(tag.name.clone()));
                }
                cursor = self.tags[p.index()].parent;
            }
        }
        Ok(())
    }

    /// Schema version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Library name, `None` for the standard schema.
    pub fn library(&self) -> Option<&str> {
        self.library.as_deref()
    }

    /// Number of tags, value tags included.
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Look up a tag by short name, case-insensitively. Value tags are not indexed.
    pub fn lookup_tag(&self, name: &str) -> Option<TagId> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// The tag with the given id.
    ///
    /// Ids are only meaningful for the schema that issued them; an id from
    /// another schema may panic or name an unrelated tag.
    pub fn tag(&self, id: TagId) -> &SchemaTag {
        &self.tags[id.index()]
    }

    /// Iterate over `id` and its ancestors, nearest first.
    pub fn ancestors(&self, id: TagId) -> impl Iterator<Item = TagId> + '_ {
        std::iter::successors(Some(id), move |current| self.tag(*current).parent)
    }

    /// Whether the attribute is set directly on the tag.
    pub fn has_attribute(&self, id: TagId, attribute: &str) -> bool {
        self.tag(id).has_attribute(attribute)
    }

    /// Whether unknown child levels may extend the tag, either through its own
    /// `extensionAllowed` attribute or an ancestor's.
    pub fn allows_extension(&self, id: TagId) -> bool {
        self.ancestors(id)
            .any(|a| self.has_attribute(a, attributes::EXTENSION_ALLOWED))
    }

    /// The tag a value tag belongs to; other tags map to themselves.
    pub fn base_tag(&self, id: TagId) -> TagId {
        match self.tag(id).parent {
            Some(parent) if self.tag(id).is_value_tag() => parent,
            _ => id,
        }
    }

    /// Full path from the root (`Event/Sensory-event`). Value tags are
    /// rendered as their parent's path.
    pub fn long_name(&self, id: TagId) -> String {
        let mut names: Vec<&str> = self
            .ancestors(self.base_tag(id))
            .map(|a| self.tag(a).name.as_str())
            .collect();
        names.reverse();
        names.join("/")
    }

    /// Unit class by name.
    pub fn unit_class(&self, name: &str) -> Option<&UnitClass> {
        self.unit_classes.get(name)
    }

    /// Value class by name.
    pub fn value_class(&self, name: &str) -> Option<&ValueClass> {
        self.value_classes.get(name)
    }

    /// SI unit modifiers.
    pub fn unit_modifiers(&self) -> &[UnitModifier] {
        &self.unit_modifiers
    }

    /// Validate `value` against the named value class. `None` when the class is unknown.
    pub fn validate_value_class(&self, class: &str, value: &str) -> Option<bool> {
        self.value_class(class).map(|c| c.validate(value))
    }

    /// Split `text` into value and unit using the named unit class. `None`
    /// when the class is unknown.
    pub fn extract_unit(&self, class: &str, text: &str) -> Option<UnitSplit<'_>> {
        self.unit_class(class)
            .map(|c| c.split(text, &self.unit_modifiers))
    }
}

/// Schemas keyed by library prefix. The empty prefix is the base schema.
#[derive(Debug, Clone, Default)]
pub struct HedSchemas {
    schemas: HashMap<String, HedSchema>,
}

impl HedSchemas {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection holding only a base schema.
    pub fn with_base(schema: HedSchema) -> Self {
        let mut schemas = Self::new();
        schemas.insert("", schema);
        schemas
    }

    /// Register a schema under `prefix` (without the trailing colon),
    /// replacing any previous one.
    pub fn insert(&mut self, prefix: impl Into<String>, schema: HedSchema) {
        self.schemas.insert(prefix.into(), schema);
    }

    /// Schema registered under `prefix`.
    pub fn get(&self, prefix: &str) -> Option<&HedSchema> {
        self.schemas.get(prefix)
    }

    /// The base schema.
    pub fn base(&self) -> Option<&HedSchema> {
        self.get("")
    }

    /// Registered prefixes, sorted.
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        prefixes.sort_unstable();
        prefixes
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether no schema is registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SCHEMA: &str = include_str!("../../../schemas/hed_test.json");

    fn schema() -> HedSchema {
        HedSchema::from_json_str(TEST_SCHEMA).unwrap()
    }

    #[test]
    fn loads_test_schema() {
        let s = schema();
        assert_eq!(s.version(), "8.3.0");
        assert!(s.library().is_none());
        assert!(s.tag_count() > 40);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let s = schema();
        let a = s.lookup_tag("Sensory-event").unwrap();
        let b = s.lookup_tag("sensory-EVENT").unwrap();
        assert_eq!(a, b);
        assert!(s.lookup_tag("#").is_none());
        assert!(s.lookup_tag("Nonexistent-tag").is_none());
    }

    #[test]
    fn long_name_walks_parents() {
        let s = schema();
        let id = s.lookup_tag("Sensory-event").unwrap();
        assert_eq!(s.long_name(id), "Event/Sensory-event");
        let duration = s.lookup_tag("Duration").unwrap();
        let value = s.tag(duration).value_tag.unwrap();
        assert!(s.tag(value).is_value_tag());
        assert_eq!(s.long_name(value), s.long_name(duration));
        assert_eq!(s.base_tag(value), duration);
    }

    #[test]
    fn extension_is_inherited() {
        let s = schema();
        let device = s.lookup_tag("Device").unwrap();
        assert!(!s.has_attribute(device, attributes::EXTENSION_ALLOWED));
        assert!(s.allows_extension(device));
        let event = s.lookup_tag("Sensory-event").unwrap();
        assert!(!s.allows_extension(event));
    }

    #[test]
    fn value_classes_are_anchored() {
        let s = schema();
        assert_eq!(s.validate_value_class("numericClass", "4.5"), Some(true));
        assert_eq!(s.validate_value_class("numericClass", "4.5x"), Some(false));
        assert_eq!(s.validate_value_class("nameClass", "My-name_2"), Some(true));
        assert_eq!(s.validate_value_class("nameClass", "two words"), Some(false));
        assert_eq!(s.validate_value_class("noSuchClass", "x"), None);
    }

    #[test]
    fn extract_unit_with_modifier() {
        let s = schema();
        let split = s.extract_unit("timeUnits", "300 ms").unwrap();
        assert_eq!(split.value, "300");
        assert!((split.conversion_factor - 1e-3).abs() < 1e-12);
        assert!(s.extract_unit("noSuchUnits", "3 s").is_none());
    }

    #[test]
    fn rejects_unknown_parent() {
        let json = r#"{"version":"1.0.0","tags":[{"name":"Child","parent":"Missing"}]}"#;
        let err = HedSchema::from_json_str(json).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownParent { .. }), "{err}");
    }

    #[test]
    fn rejects_duplicate_names() {
        let json = r#"{"version":"1.0.0","tags":[{"name":"Event"},{"name":"event"}]}"#;
        let err = HedSchema::from_json_str(json).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateTag(_)), "{err}");
    }

    #[test]
    fn rejects_unknown_value_class() {
        let json = r##"{"version":"1.0.0","tags":[
            {"name":"Label"},
            {"name":"#","parent":"Label","valueClasses":["missingClass"]}
        ]}"##;
        let err = HedSchema::from_json_str(json).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownValueClass { .. }), "{err}");
    }

    #[test]
    fn rejects_invalid_pattern() {
        let json = r#"{"version":"1.0.0","tags":[],"valueClasses":[{"name":"bad","pattern":"("}]}"#;
        let err = HedSchema::from_json_str(json).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }), "{err}");
    }

    #[test]
    fn rejects_cycles() {
        let json = r#"{"version":"1.0.0","tags":[
            {"name":"A","parent":"B"},
            {"name":"B","parent":"A"}
        ]}"#;
        let err = HedSchema::from_json_str(json).unwrap_err();
        assert!(matches!(err, SchemaError::Cycle(_)), "{err}");
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = HedSchema::from_json_str("{not json").unwrap_err();
        assert!(err.to_string().starts_with("invalid schema JSON"));
    }

    #[test]
    fn schemas_by_prefix() {
        let mut schemas = HedSchemas::with_base(schema());
        assert!(schemas.base().is_some());
        assert!(schemas.get("sc").is_none());
        schemas.insert("sc", schema());
        assert_eq!(schemas.prefixes(), vec!["", "sc"]);
        assert_eq!(schemas.len(), 2);
    }
}
