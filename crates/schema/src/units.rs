//! Unit classes and the value/unit split.

use crate::source::{UnitClassEntry, UnitEntry, UnitModifierEntry};

/// A unit of a [`UnitClass`].
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Unit name or symbol as written in the schema.
    pub name: String,
    /// Accepts SI modifiers.
    pub si_unit: bool,
    /// Case-sensitive symbol (`Hz`) rather than a word (`hertz`).
    pub unit_symbol: bool,
    /// Written before the value.
    pub unit_prefix: bool,
    /// Factor converting this unit into the class's base unit.
    pub conversion_factor: f64,
}

/// A named collection of units.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitClass {
    /// Class name.
    pub name: String,
    /// Unit assumed when a value carries none.
    pub default_units: Option<String>,
    /// Member units.
    pub units: Vec<Unit>,
}

/// An SI prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitModifier {
    /// Modifier text. Word modifiers are stored lower-cased.
    pub name: String,
    /// Applies to unit symbols.
    pub symbol: bool,
    /// Multiplier applied.
    pub conversion_factor: f64,
}

/// A value string split into value text and unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSplit<'a> {
    /// Value text with the unit removed.
    pub value: String,
    /// Unit text as written, if any was present.
    pub unit_text: Option<String>,
    /// The matched unit. `None` with `unit_text` set means the text named no unit of the class.
    pub unit: Option<&'a Unit>,
    /// Combined unit and modifier conversion factor.
    pub conversion_factor: f64,
}

impl UnitSplit<'_> {
    fn bare(value: &str) -> Self {
        Self {
            value: value.to_string(),
            unit_text: None,
            unit: None,
            conversion_factor: 1.0,
        }
    }
}

impl From<UnitEntry> for Unit {
    fn from(entry: UnitEntry) -> Self {
        Self {
            name: entry.name,
            si_unit: entry.si_unit,
            unit_symbol: entry.unit_symbol,
            unit_prefix: entry.unit_prefix,
            conversion_factor: entry.conversion_factor,
        }
    }
}

impl From<UnitClassEntry> for UnitClass {
    fn from(entry: UnitClassEntry) -> Self {
        Self {
            name: entry.name,
            default_units: entry.default_units,
            units: entry.units.into_iter().map(Unit::from).collect(),
        }
    }
}

impl UnitModifier {
    pub(crate) fn from_entry(entry: UnitModifierEntry) -> Vec<Self> {
        let mut out = Vec::with_capacity(2);
        if entry.si_unit_symbol_modifier {
            out.push(Self {
                name: entry.name.clone(),
                symbol: true,
                conversion_factor: entry.conversion_factor,
            });
        }
        if entry.si_unit_modifier {
            out.push(Self {
                name: entry.name.to_lowercase(),
                symbol: false,
                conversion_factor: entry.conversion_factor,
            });
        }
        out
    }
}

impl Unit {
    /// Returns the conversion factor if `text` names this unit, possibly
    /// with an SI modifier or (for word units) in plural form.
    pub fn matches(&self, text: &str, modifiers: &[UnitModifier]) -> Option<f64> {
        if self.unit_symbol {
            if text == self.name {
                return Some(self.conversion_factor);
            }
            if self.si_unit {
                for m in modifiers.iter().filter(|m| m.symbol) {
                    if text.strip_prefix(m.name.as_str()) == Some(self.name.as_str()) {
                        return Some(self.conversion_factor * m.conversion_factor);
                    }
                }
            }
            return None;
        }

        let lower = text.to_lowercase();
        let name = self.name.to_lowercase();
        let is_unit = |candidate: &str| {
            candidate == name || candidate.strip_suffix('s') == Some(name.as_str())
        };
        if is_unit(&lower) {
            return Some(self.conversion_factor);
        }
        if self.si_unit {
            for m in modifiers.iter().filter(|m| !m.symbol) {
                if let Some(rest) = lower.strip_prefix(m.name.as_str())
                    && is_unit(rest)
                {
                    return Some(self.conversion_factor * m.conversion_factor);
                }
            }
        }
        None
    }
}

impl UnitClass {
    /// Split `text` into value and unit according to this class.
    ///
    /// Prefix units (`$`) are matched at the start of the text; other units
    /// follow the value after the first blank.
    pub fn split<'a>(&'a self, text: &str, modifiers: &[UnitModifier]) -> UnitSplit<'a> {
        for unit in self.units.iter().filter(|u| u.unit_prefix) {
            if let Some(rest) = text.strip_prefix(unit.name.as_str()) {
                return UnitSplit {
                    value: rest.trim_start().to_string(),
                    unit_text: Some(unit.name.clone()),
                    unit: Some(unit),
                    conversion_factor: unit.conversion_factor,
                };
            }
        }

        let Some((value, unit_text)) = text.split_once(' ') else {
            return UnitSplit::bare(text);
        };
        let unit_text = unit_text.trim();
        for unit in self.units.iter().filter(|u| !u.unit_prefix) {
            if let Some(conversion_factor) = unit.matches(unit_text, modifiers) {
                return UnitSplit {
                    value: value.to_string(),
                    unit_text: Some(unit_text.to_string()),
                    unit: Some(unit),
                    conversion_factor,
                };
            }
        }
        UnitSplit {
            value: value.to_string(),
            unit_text: Some(unit_text.to_string()),
            unit: None,
            conversion_factor: 1.0,
        }
    }
}
