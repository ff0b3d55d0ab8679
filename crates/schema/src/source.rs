//! Serialized schema representation.
//!
//! These types mirror the JSON a schema is distributed as. They are plain
//! data; [`crate::HedSchema::from_source`] turns them into the indexed,
//! validated form the parser consumes.

use serde::{Deserialize, Serialize};

/// Current format version for the schema JSON.
pub const SCHEMA_FORMAT_VERSION: &str = "1.0.0";

/// Top-level container of a serialized schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSource {
    /// Schema version (e.g. `"8.3.0"`).
    pub version: String,
    /// Library name, absent for the standard schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    /// JSON format version for compatibility checks.
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// All tag entries, in any order.
    pub tags: Vec<TagEntry>,
    /// Unit classes referenced by value tags.
    #[serde(default)]
    pub unit_classes: Vec<UnitClassEntry>,
    /// SI unit modifiers (prefixes such as `k` or `milli`).
    #[serde(default)]
    pub unit_modifiers: Vec<UnitModifierEntry>,
    /// Value classes referenced by value tags.
    #[serde(default)]
    pub value_classes: Vec<ValueClassEntry>,
}

fn default_format_version() -> String {
    SCHEMA_FORMAT_VERSION.to_string()
}

/// One node of the tag hierarchy.
///
/// An entry named `#` is the value tag of its parent: the parent takes a
/// value, and the `#` entry carries the unit and value classes for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEntry {
    /// Short name of the tag (`Sensory-event`), or `#` for a value tag.
    pub name: String,
    /// Short name of the parent tag; absent for root tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Boolean attributes such as `extensionAllowed` or `requireChild`.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Unit classes accepted by a value tag.
    #[serde(default)]
    pub unit_classes: Vec<String>,
    /// Value classes accepted by a value tag.
    #[serde(default)]
    pub value_classes: Vec<String>,
    /// Schema version in which the tag was deprecated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_from: Option<String>,
}

/// A named group of interchangeable units (e.g. `timeUnits`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitClassEntry {
    /// Class name.
    pub name: String,
    /// Unit assumed when a value carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_units: Option<String>,
    /// Units belonging to the class.
    pub units: Vec<UnitEntry>,
}

/// A single unit of a unit class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitEntry {
    /// Unit name or symbol (`s`, `second`, `$`).
    pub name: String,
    /// Accepts SI modifiers.
    #[serde(default)]
    pub si_unit: bool,
    /// Written as a case-sensitive symbol rather than a word.
    #[serde(default)]
    pub unit_symbol: bool,
    /// Written before the value (`$ 5`) rather than after it.
    #[serde(default)]
    pub unit_prefix: bool,
    /// Factor converting the unit into the class's base unit.
    #[serde(default = "default_conversion_factor")]
    pub conversion_factor: f64,
}

/// An SI prefix applicable to SI units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitModifierEntry {
    /// Modifier text (`k`, `kilo`).
    pub name: String,
    /// The modifier applies to unit symbols (`k` in `km`).
    #[serde(default)]
    pub si_unit_symbol_modifier: bool,
    /// The modifier applies to unit words (`kilo` in `kilometre`).
    #[serde(default)]
    pub si_unit_modifier: bool,
    /// Multiplier the modifier applies.
    #[serde(default = "default_conversion_factor")]
    pub conversion_factor: f64,
}

fn default_conversion_factor() -> f64 {
    1.0
}

/// A named value class and the pattern values of that class must match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueClassEntry {
    /// Class name (`numericClass`).
    pub name: String,
    /// Regular expression a value must match in full.
    pub pattern: String,
}
