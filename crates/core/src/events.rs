//! Temporal events: `Onset`, `Inset`, and `Offset` groups tied to a
//! definition, ordered along a timeline and checked for consistency.

use crate::grammar::ast::{ParsedHedGroup, ParsedHedString, ParsedHedTag};
use crate::grammar::diag::{Diagnostic, codes};
use crate::reserved;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Two events for one definition closer than this (in seconds) are simultaneous.
pub const TOLERANCE: f64 = 1e-7;

/// Kind of temporal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemporalKind {
    /// Start of the definition's activity.
    Onset,
    /// Point inside the activity.
    Inset,
    /// End of the activity.
    Offset,
}

impl TemporalKind {
    fn from_reserved(name: &str) -> Option<Self> {
        match name {
            reserved::ONSET => Some(TemporalKind::Onset),
            reserved::INSET => Some(TemporalKind::Inset),
            reserved::OFFSET => Some(TemporalKind::Offset),
            _ => None,
        }
    }

    /// The reserved tag name.
    pub fn as_str(self) -> &'static str {
        match self {
            TemporalKind::Onset => reserved::ONSET,
            TemporalKind::Inset => reserved::INSET,
            TemporalKind::Offset => reserved::OFFSET,
        }
    }
}

impl fmt::Display for TemporalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A temporal marker placed on the timeline.
#[derive(Debug, Clone)]
pub struct Event<'s> {
    /// Lower-case definition name.
    pub definition: String,
    /// Marker kind.
    pub kind: TemporalKind,
    /// Row onset plus any `Delay`, in seconds.
    pub onset: f64,
    /// The group holding the marker.
    pub group: ParsedHedGroup<'s>,
    /// Source line of the row.
    pub line: usize,
}

/// One timeline row: an onset time and its annotation.
#[derive(Debug, Clone)]
pub struct AnnotatedRow<'s> {
    /// Row onset in seconds; rows without one cannot hold temporal markers.
    pub onset: Option<f64>,
    /// The row's parsed annotation.
    pub hed: ParsedHedString<'s>,
    /// Source line, for diagnostics.
    pub line: usize,
}

/// Builds and checks event timelines.
#[derive(Debug, Clone, Copy)]
pub struct EventManager {
    tolerance: f64,
}

impl Default for EventManager {
    fn default() -> Self {
        Self {
            tolerance: TOLERANCE,
        }
    }
}

fn row_error(
    id: &'static str,
    message: String,
    group: &ParsedHedGroup<'_>,
    line: usize,
) -> Diagnostic {
    Diagnostic::error(id, message, Some(group.bounds())).with_context(ctx!(
        "group" => group.original_tag(),
        "line" => line.to_string(),
    ))
}

impl EventManager {
    /// A manager using [`TOLERANCE`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager using a custom simultaneity tolerance.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Simultaneity tolerance in seconds.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Extract the temporal events of every row, sorted by onset. Rows are
    /// scanned in parallel; ties keep row order.
    pub fn parse_events<'s>(
        &self,
        rows: &[AnnotatedRow<'s>],
    ) -> Result<Vec<Event<'s>>, Vec<Diagnostic>> {
        let per_row: Vec<Result<Vec<Event<'s>>, Diagnostic>> =
            rows.par_iter().map(row_events).collect();
        let mut events = Vec::new();
        for row in per_row {
            events.extend(row.map_err(|diag| vec![diag])?);
        }
        events.sort_by(|a, b| a.onset.total_cmp(&b.onset));
        tracing::debug!(
            rows = rows.len(),
            events = events.len(),
            "extracted temporal events"
        );
        Ok(events)
    }

    /// Walk a sorted timeline, tracking the active event of each definition.
    /// Stops at the first violation.
    pub fn validate(&self, events: &[Event<'_>]) -> Vec<Diagnostic> {
        let mut active: HashMap<&str, &Event<'_>> = HashMap::new();
        for event in events {
            let Some(current) = active.get(event.definition.as_str()) else {
                if event.kind != TemporalKind::Onset {
                    return vec![row_error(
                        codes::INACTIVE_ONSET,
                        format!(
                            "{} of '{}' at {}s has no active onset",
                            event.kind, event.definition, event.onset
                        ),
                        &event.group,
                        event.line,
                    )];
                }
                active.insert(&event.definition, event);
                continue;
            };
            if (event.onset - current.onset).abs() < self.tolerance {
                return vec![row_error(
                    codes::SIMULTANEOUS_DUPLICATE_EVENTS,
                    format!(
                        "{} of '{}' at {}s coincides with {} on line {}",
                        event.kind, event.definition, event.onset, current.kind, current.line
                    ),
                    &event.group,
                    event.line,
                )];
            }
            let supersedes = match event.kind {
                TemporalKind::Onset => true,
                TemporalKind::Inset | TemporalKind::Offset => {
                    current.kind != TemporalKind::Offset
                }
            };
            if supersedes {
                active.insert(&event.definition, event);
            }
        }
        Vec::new()
    }
}

fn def_name<'a>(group: &'a ParsedHedGroup<'_>) -> Option<&'a str> {
    if let Some(tag) = group.def_tags().next() {
        return tag.def_name();
    }
    group
        .def_expand_children()
        .find_map(|child| child.def_expand_tags().next())
        .and_then(ParsedHedTag::def_name)
}

fn delay(group: &ParsedHedGroup<'_>, line: usize) -> Result<f64, Diagnostic> {
    let Some(tag) = group.reserved_tags(reserved::DELAY).next() else {
        return Ok(0.0);
    };
    tag.numeric_value()
        .map(|value| value * tag.conversion_factor())
        .ok_or_else(|| {
            row_error(
                codes::INVALID_VALUE,
                format!("'{}' does not hold a numeric delay", tag.original_tag()),
                group,
                line,
            )
        })
}

fn row_events<'s>(row: &AnnotatedRow<'s>) -> Result<Vec<Event<'s>>, Diagnostic> {
    let mut events = Vec::new();
    for group in row.hed.tag_groups() {
        let Some(kind) = group.reserved_names().find_map(TemporalKind::from_reserved) else {
            continue;
        };
        if group.def_count() != 1 {
            return Err(row_error(
                codes::TEMPORAL_DEF_COUNT,
                format!(
                    "{kind} group must reference exactly one definition, found {}",
                    group.def_count()
                ),
                group,
                row.line,
            ));
        }
        let Some(onset) = row.onset else {
            return Err(row_error(
                codes::TEMPORAL_WITHOUT_ONSET,
                format!("{kind} appears in a row without an onset"),
                group,
                row.line,
            ));
        };
        let Some(name) = def_name(group) else {
            return Err(row_error(
                codes::INTERNAL_ERROR,
                "definition reference has no name".to_string(),
                group,
                row.line,
            ));
        };
        events.push(Event {
            definition: name.to_lowercase(),
            kind,
            onset: onset + delay(group, row.line)?,
            group: group.clone(),
            line: row.line,
        });
    }
    Ok(events)
}
