//! Tests for temporal event extraction and timeline checks.
//!
//! Covers: ordering, `Delay` offsets, `Def-expand` references, row errors,
//! and the active-event rules of [`EventManager::validate`].

mod common;

use common::{assert_single, parse_ok};
use hed_toolchain_core::{AnnotatedRow, Event, EventManager, TOLERANCE, TemporalKind, codes};

fn row(onset: Option<f64>, hed: &str, line: usize) -> AnnotatedRow<'static> {
    AnnotatedRow {
        onset,
        hed: parse_ok(hed),
        line,
    }
}

fn rows(timeline: &[(f64, &str)]) -> Vec<AnnotatedRow<'static>> {
    timeline
        .iter()
        .enumerate()
        .map(|(i, &(onset, hed))| row(Some(onset), hed, i + 2))
        .collect()
}

fn extract(timeline: &[(f64, &str)]) -> Vec<Event<'static>> {
    EventManager::new()
        .parse_events(&rows(timeline))
        .unwrap_or_else(|e| panic!("failed to extract events: {e:?}"))
}

fn summary(events: &[Event<'_>]) -> Vec<(String, TemporalKind, f64)> {
    events
        .iter()
        .map(|e| (e.definition.clone(), e.kind, e.onset))
        .collect()
}

// ─── Extraction ──────────────────────────────────────────────────────────────

#[test]
fn events_are_sorted_by_onset() {
    let events = extract(&[
        (3.0, "(Offset, Def/Foo)"),
        (1.0, "Red, (Onset, Def/Foo, (Blue))"),
        (2.0, "(Inset, Def/Foo)"),
    ]);
    assert_eq!(
        summary(&events),
        vec![
            ("foo".to_string(), TemporalKind::Onset, 1.0),
            ("foo".to_string(), TemporalKind::Inset, 2.0),
            ("foo".to_string(), TemporalKind::Offset, 3.0),
        ]
    );
    assert_eq!(events[0].line, 3);
    assert_eq!(events[0].group.original_tag(), "(Onset, Def/Foo, (Blue))");
}

#[test]
fn rows_without_markers_contribute_nothing() {
    let timeline = vec![row(None, "Red, (Blue, Green)", 2), row(Some(1.0), "Event", 3)];
    let events = EventManager::new().parse_events(&timeline).unwrap();
    assert!(events.is_empty());
}

#[test]
fn ties_keep_row_order() {
    let events = extract(&[
        (1.0, "(Onset, Def/B), (Onset, Def/A)"),
        (1.0, "(Onset, Def/C)"),
    ]);
    let names: Vec<&str> = events.iter().map(|e| e.definition.as_str()).collect();
    assert_eq!(names, vec!["b", "a", "c"]);
}

#[test]
fn delay_shifts_onset() {
    let events = extract(&[
        (1.0, "(Onset, Def/C, Delay/3)"),
        (1.0, "(Onset, Def/B, Delay/2 s)"),
        (1.0, "(Onset, Def/A, Delay/500 ms)"),
    ]);
    let expected = [("a", 1.5), ("b", 3.0), ("c", 4.0)];
    assert_eq!(events.len(), expected.len());
    for (event, (name, onset)) in events.iter().zip(expected) {
        assert_eq!(event.definition, name);
        assert!((event.onset - onset).abs() < 1e-12, "{} at {}", name, event.onset);
    }
}

#[test]
fn def_expand_names_the_definition() {
    let events = extract(&[(1.0, "(Onset, (Def-expand/Foo, (Red)), (Blue))")]);
    assert_eq!(events[0].definition, "foo");
    assert_eq!(events[0].kind, TemporalKind::Onset);
}

#[test]
fn marker_without_onset() {
    let timeline = vec![row(None, "(Onset, Def/A)", 7)];
    let errors = EventManager::new().parse_events(&timeline).unwrap_err();
    assert_single(&errors, codes::TEMPORAL_WITHOUT_ONSET);
    assert_eq!(errors[0].context.as_ref().unwrap()["line"], "7");
}

#[test]
fn marker_needs_one_definition() {
    let timeline = rows(&[(1.0, "(Onset, Red)")]);
    let errors = EventManager::new().parse_events(&timeline).unwrap_err();
    assert_single(&errors, codes::TEMPORAL_DEF_COUNT);

    let timeline = rows(&[(1.0, "(Offset, Def/A, Def/B)")]);
    let errors = EventManager::new().parse_events(&timeline).unwrap_err();
    assert_single(&errors, codes::TEMPORAL_DEF_COUNT);
}

// ─── Timeline checks ─────────────────────────────────────────────────────────

#[test]
fn consistent_timeline() {
    let events = extract(&[
        (1.0, "(Onset, Def/A)"),
        (1.5, "(Onset, Def/B)"),
        (2.0, "(Inset, Def/A)"),
        (3.0, "(Offset, Def/A)"),
        (4.0, "(Onset, Def/A)"),
        (5.0, "(Offset, Def/B)"),
    ]);
    assert!(EventManager::new().validate(&events).is_empty());
}

#[test]
fn nearly_simultaneous_events_are_distinct() {
    let events = extract(&[(5.0, "(Onset, Def/A)"), (5.000_000_1, "(Offset, Def/A)")]);
    assert!(EventManager::new().validate(&events).is_empty());
}

#[test]
fn marker_without_active_onset() {
    let events = extract(&[(1.0, "(Offset, Def/A)")]);
    let issues = EventManager::new().validate(&events);
    assert_single(&issues, codes::INACTIVE_ONSET);
    assert_eq!(issues[0].context.as_ref().unwrap()["line"], "2");

    let events = extract(&[(1.0, "(Onset, Def/A)"), (2.0, "(Inset, Def/B)")]);
    assert_single(&EventManager::new().validate(&events), codes::INACTIVE_ONSET);
}

#[test]
fn simultaneous_events() {
    let events = extract(&[(1.0, "(Onset, Def/A)"), (1.0, "(Offset, Def/A)")]);
    assert_single(
        &EventManager::new().validate(&events),
        codes::SIMULTANEOUS_DUPLICATE_EVENTS,
    );

    let events = extract(&[(1.0, "(Onset, Def/A)"), (1.0, "(Onset, Def/B)")]);
    assert!(EventManager::new().validate(&events).is_empty());
}

#[test]
fn definition_names_ignore_case() {
    let events = extract(&[(1.0, "(Onset, Def/Foo)"), (1.0, "(Offset, Def/FOO)")]);
    assert_single(
        &EventManager::new().validate(&events),
        codes::SIMULTANEOUS_DUPLICATE_EVENTS,
    );
}

#[test]
fn markers_after_offset_do_not_reopen() {
    let events = extract(&[
        (1.0, "(Onset, Def/A)"),
        (2.0, "(Offset, Def/A)"),
        (3.0, "(Inset, Def/A)"),
        (3.5, "(Offset, Def/A)"),
    ]);
    assert!(EventManager::new().validate(&events).is_empty());
}

#[test]
fn custom_tolerance() {
    let events = extract(&[(1.0, "(Onset, Def/A)"), (1.3, "(Offset, Def/A)")]);
    assert!(EventManager::new().validate(&events).is_empty());
    let manager = EventManager::with_tolerance(0.5);
    assert_eq!(manager.tolerance(), 0.5);
    assert_single(&manager.validate(&events), codes::SIMULTANEOUS_DUPLICATE_EVENTS);
    assert_eq!(EventManager::default().tolerance(), TOLERANCE);
}
