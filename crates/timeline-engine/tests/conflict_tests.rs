//! Tests for conflict detection over the event store.

use indexmap::IndexMap;
use timeline_engine::conflict::{conflict_id, intervals_overlap};
use timeline_engine::{
    CalendarFields, ConflictType, DateValue, DetectorConfig, EventType, Severity, TimelineDate,
    TimelineEvent, TimelineManager,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn event(id: &str, start: TimelineDate) -> TimelineEvent {
    TimelineEvent::new(id, id.to_uppercase(), EventType::Scene, start)
}

fn with_characters(mut event: TimelineEvent, ids: &[&str]) -> TimelineEvent {
    event.character_ids = ids.iter().map(|s| s.to_string()).collect();
    event
}

fn with_end(mut event: TimelineEvent, end: TimelineDate) -> TimelineEvent {
    event.end_date = Some(end);
    event
}

fn with_parent(mut event: TimelineEvent, parent: &str) -> TimelineEvent {
    event.parent_event_id = Some(parent.to_string());
    event
}

fn store(events: Vec<TimelineEvent>) -> TimelineManager {
    let map: IndexMap<String, TimelineEvent> =
        events.into_iter().map(|e| (e.id.clone(), e)).collect();
    let mut timeline = TimelineManager::new();
    timeline.load_events(map);
    timeline
}

fn raw_day(year: i32, month: i64, day: i64) -> TimelineDate {
    TimelineDate::new(DateValue::Day(CalendarFields {
        year: Some(year),
        month: Some(month),
        day: Some(day),
        ..CalendarFields::default()
    }))
}

fn of_type(timeline: &TimelineManager, kind: ConflictType) -> Vec<timeline_engine::TimelineConflict> {
    timeline
        .conflicts()
        .into_iter()
        .filter(|c| c.conflict_type == kind)
        .collect()
}

// ── Overlap ─────────────────────────────────────────────────────────────────

#[test]
fn overlapping_events_sharing_a_character_detected() {
    // X: instant on 2024-01-01. Y: 2024-01-01 to 2024-01-05. Both feature c1.
    let x = with_characters(event("x", TimelineDate::day(2024, 1, 1)), &["c1"]);
    let y = with_characters(
        with_end(event("y", TimelineDate::day(2024, 1, 1)), TimelineDate::day(2024, 1, 5)),
        &["c1"],
    );
    let mut timeline = store(vec![x, y]);

    let found = timeline.detect_all_conflicts();

    assert_eq!(found.len(), 1, "one distinct finding");
    let conflict = &found[0];
    assert_eq!(conflict.conflict_type, ConflictType::OverlappingEvents);
    assert_eq!(conflict.severity, Severity::Warning);
    assert_eq!(conflict.event_ids, vec!["x", "y"]);
    assert_eq!(
        conflict.details.as_ref().unwrap()["sharedCharacterIds"],
        serde_json::json!(["c1"])
    );

    // Attached to both sides.
    assert_eq!(timeline.get_event("x").unwrap().conflicts.len(), 1);
    assert_eq!(timeline.get_event("y").unwrap().conflicts.len(), 1);
}

#[test]
fn later_event_does_not_overlap() {
    // Z on 2024-02-01 against X on 2024-01-01.
    let x = with_characters(event("x", TimelineDate::day(2024, 1, 1)), &["c1"]);
    let z = with_characters(event("z", TimelineDate::day(2024, 2, 1)), &["c1"]);
    let mut timeline = store(vec![x, z]);

    assert!(timeline.detect_all_conflicts().is_empty());
}

#[test]
fn overlap_without_shared_character_is_fine() {
    let x = with_characters(event("x", TimelineDate::day(2024, 1, 1)), &["c1"]);
    let y = with_characters(event("y", TimelineDate::day(2024, 1, 1)), &["c2"]);
    let loner = event("loner", TimelineDate::day(2024, 1, 1));
    let mut timeline = store(vec![x, y, loner]);

    assert!(timeline.detect_all_conflicts().is_empty());
}

#[test]
fn incomparable_dates_never_overlap() {
    let x = with_characters(event("x", TimelineDate::unknown()), &["c1"]);
    let y = with_characters(event("y", TimelineDate::day(2024, 1, 1)), &["c1"]);
    assert!(!intervals_overlap(&x, &y));

    let mut timeline = store(vec![x, y]);
    assert!(timeline.detect_all_conflicts().is_empty());
}

#[test]
fn contained_interval_overlaps() {
    let outer = with_end(event("outer", TimelineDate::day(1939, 9, 1)), TimelineDate::day(1945, 9, 2));
    let inner = event("inner", TimelineDate::day(1942, 6, 4));
    assert!(intervals_overlap(&outer, &inner));
    assert!(intervals_overlap(&inner, &outer));
}

// ── Impossible dates ────────────────────────────────────────────────────────

#[test]
fn february_30_in_leap_year_is_impossible() {
    let mut timeline = store(vec![event("e", raw_day(2024, 2, 30))]);
    let found = timeline.detect_all_conflicts();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].conflict_type, ConflictType::ImpossibleDate);
    assert_eq!(found[0].severity, Severity::Error);
    assert_eq!(found[0].event_ids, vec!["e"]);
}

#[test]
fn february_29_outside_leap_year_is_impossible() {
    let mut timeline = store(vec![event("e", raw_day(2023, 2, 29))]);
    let found = timeline.detect_all_conflicts();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].conflict_type, ConflictType::ImpossibleDate);
}

#[test]
fn february_29_in_leap_year_is_fine() {
    let mut timeline = store(vec![event("e", raw_day(2024, 2, 29))]);
    assert!(timeline.detect_all_conflicts().is_empty());
}

#[test]
fn month_13_is_impossible() {
    let mut timeline = store(vec![event("e", TimelineDate::month(2024, 13))]);
    timeline.detect_all_conflicts();

    let found = of_type(&timeline, ConflictType::ImpossibleDate);
    assert_eq!(found.len(), 1);
    assert!(found[0].message.contains("month 13"));
}

#[test]
fn impossible_end_date_detected_once_with_start() {
    let bad = with_end(event("e", raw_day(2023, 4, 31)), raw_day(2023, 6, 31));
    let mut timeline = store(vec![bad]);
    timeline.detect_all_conflicts();

    let found = of_type(&timeline, ConflictType::ImpossibleDate);
    assert_eq!(found.len(), 1, "start and end problems fold into one finding");
    assert!(found[0].message.contains("start date"));
    assert!(found[0].message.contains("end date"));
}

#[test]
fn dates_without_standard_year_are_not_checked() {
    let custom = TimelineDate::new(DateValue::Day(CalendarFields {
        month: Some(14),
        day: Some(40),
        custom_year: Some(12),
        ..CalendarFields::default()
    }));
    let mut timeline = store(vec![event("e", custom)]);
    assert!(timeline.detect_all_conflicts().is_empty());
}

// ── Date order ──────────────────────────────────────────────────────────────

#[test]
fn end_before_start_detected() {
    let backwards = with_end(event("e", TimelineDate::day(2024, 5, 10)), TimelineDate::day(2024, 5, 1));
    let mut timeline = store(vec![backwards]);
    let found = timeline.detect_all_conflicts();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].conflict_type, ConflictType::DateOrder);
    assert_eq!(found[0].severity, Severity::Error);
}

#[test]
fn end_within_a_day_of_start_is_fine() {
    let same_day = with_end(
        event("e", TimelineDate::exact(2024, 5, 10, 18, 0)),
        TimelineDate::exact(2024, 5, 10, 9, 0),
    );
    let mut timeline = store(vec![same_day]);
    assert!(timeline.detect_all_conflicts().is_empty());
}

#[test]
fn incomparable_end_is_not_a_date_order_problem() {
    let vague = with_end(event("e", TimelineDate::day(2024, 5, 10)), TimelineDate::unknown());
    let mut timeline = store(vec![vague]);
    assert!(timeline.detect_all_conflicts().is_empty());
}

// ── Circular references ─────────────────────────────────────────────────────

#[test]
fn three_event_cycle_reported_exactly_once() {
    // A -> B -> C -> A
    let a = with_parent(event("a", TimelineDate::year(1)), "b");
    let b = with_parent(event("b", TimelineDate::year(1)), "c");
    let c = with_parent(event("c", TimelineDate::year(1)), "a");
    let mut timeline = store(vec![a, b, c]);

    let found = timeline.detect_all_conflicts();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].conflict_type, ConflictType::CircularReference);
    assert_eq!(found[0].event_ids, vec!["a", "b", "c"]);
    let attached: usize = timeline.all_events().map(|e| e.conflicts.len()).sum();
    assert_eq!(attached, 1, "attached to a single cycle member");
}

#[test]
fn event_leading_into_cycle_is_not_reported_separately() {
    let a = with_parent(event("a", TimelineDate::year(1)), "b");
    let b = with_parent(event("b", TimelineDate::year(1)), "a");
    let tail = with_parent(event("tail", TimelineDate::year(1)), "a");
    let mut timeline = store(vec![tail, a, b]);

    let found = timeline.detect_all_conflicts();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].event_ids, vec!["a", "b"]);
    assert!(timeline.get_event("tail").unwrap().conflicts.is_empty());
}

#[test]
fn self_parent_is_a_cycle() {
    let mut timeline = store(vec![with_parent(event("a", TimelineDate::year(1)), "a")]);
    let found = timeline.detect_all_conflicts();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].conflict_type, ConflictType::CircularReference);
}

#[test]
fn dangling_parent_is_tolerated() {
    let orphan = with_parent(event("a", TimelineDate::year(1)), "gone");
    let mut timeline = store(vec![orphan]);
    assert!(timeline.detect_all_conflicts().is_empty());
}

#[test]
fn long_chain_without_cycle_is_fine() {
    let mut events = vec![event("e0", TimelineDate::year(1))];
    for i in 1..500 {
        events.push(with_parent(event(&format!("e{}", i), TimelineDate::year(1)), &format!("e{}", i - 1)));
    }
    let mut timeline = store(events);
    assert!(timeline.detect_all_conflicts().is_empty());
}

// ── Rescan semantics ────────────────────────────────────────────────────────

#[test]
fn finding_ids_are_deterministic() {
    let build = || {
        store(vec![
            with_characters(event("x", TimelineDate::day(2024, 1, 1)), &["c1"]),
            with_characters(event("y", TimelineDate::day(2024, 1, 1)), &["c1"]),
        ])
    };
    let first = build().detect_all_conflicts();
    let second = build().detect_all_conflicts();

    assert_eq!(first[0].id, second[0].id);
    assert_eq!(
        first[0].id,
        conflict_id(ConflictType::OverlappingEvents, &["y".to_string(), "x".to_string()])
    );
    assert_eq!(first[0].id, "overlapping-events:x+y");
}

#[test]
fn resolution_flags_survive_rescan() {
    let mut timeline = store(vec![
        with_characters(event("x", TimelineDate::day(2024, 1, 1)), &["c1"]),
        with_characters(event("y", TimelineDate::day(2024, 1, 1)), &["c1"]),
        event("bad", raw_day(2023, 2, 29)),
    ]);
    timeline.detect_all_conflicts();

    assert!(timeline.resolve_conflict("overlapping-events:x+y", "x happens in the morning"));
    assert!(timeline.ignore_conflict("impossible-date:bad"));
    assert!(!timeline.ignore_conflict("no-such-finding"));

    let found = timeline.detect_all_conflicts();
    assert_eq!(found.len(), 2);

    let overlap = found
        .iter()
        .find(|c| c.conflict_type == ConflictType::OverlappingEvents)
        .unwrap();
    assert!(overlap.resolved);
    assert_eq!(overlap.resolution.as_deref(), Some("x happens in the morning"));
    for id in ["x", "y"] {
        assert!(timeline.get_event(id).unwrap().conflicts[0].resolved);
    }

    let bad = timeline.get_event("bad").unwrap();
    assert!(bad.conflicts[0].ignored_by_user);
    assert_eq!(bad.active_conflicts().count(), 0);
}

#[test]
fn fixed_problems_disappear_on_rescan() {
    let mut timeline = store(vec![event("bad", raw_day(2023, 2, 29))]);
    assert_eq!(timeline.detect_all_conflicts().len(), 1);

    timeline.update_event(
        "bad",
        timeline_engine::EventPatch::new().start_date(TimelineDate::day(2023, 2, 28)),
    );
    assert!(timeline.detect_all_conflicts().is_empty());
    assert!(timeline.get_event("bad").unwrap().conflicts.is_empty());
}

#[test]
fn disabled_rules_do_not_run() {
    let mut timeline = store(vec![
        event("bad", raw_day(2023, 2, 29)),
        with_end(event("backwards", TimelineDate::day(2024, 5, 10)), TimelineDate::day(2024, 5, 1)),
    ]);
    timeline.set_config(DetectorConfig {
        impossible_dates: false,
        ..DetectorConfig::default()
    });

    let found = timeline.detect_all_conflicts();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].conflict_type, ConflictType::DateOrder);
}

#[test]
fn detector_config_deserializes_with_defaults() {
    let config: DetectorConfig = serde_json::from_str(r#"{"overlappingEvents": false}"#).unwrap();
    assert!(!config.overlapping_events);
    assert!(config.impossible_dates);
    assert!(config.date_order);
    assert!(config.circular_references);
}
