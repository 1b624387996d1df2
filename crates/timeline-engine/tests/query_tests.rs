//! Tests for chronological sorting, filtering and relevance search.

use timeline_engine::{
    filter_events, search_events, sort_events, DateRange, EventFilter, EventType, Importance,
    TimelineConflict, TimelineDate, TimelineEvent, ConflictType, Severity,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn event(id: &str, start: TimelineDate) -> TimelineEvent {
    TimelineEvent::new(id, id, EventType::Scene, start)
}

fn ids<'a>(events: impl IntoIterator<Item = &'a TimelineEvent>) -> Vec<&'a str> {
    events.into_iter().map(|e| e.id.as_str()).collect()
}

// ── Sorting ─────────────────────────────────────────────────────────────────

#[test]
fn sorts_by_start_date() {
    let events = vec![
        event("c", TimelineDate::day(2024, 3, 1)),
        event("a", TimelineDate::year(1990)),
        event("b", TimelineDate::month(2001, 6)),
    ];
    assert_eq!(ids(sort_events(&events)), vec!["a", "b", "c"]);
}

#[test]
fn unknown_event_keeps_its_position() {
    let events = vec![
        event("first", TimelineDate::day(2020, 1, 1)),
        event("mystery", TimelineDate::unknown()),
        event("second", TimelineDate::day(2021, 1, 1)),
        event("third", TimelineDate::day(2022, 1, 1)),
    ];
    assert_eq!(
        ids(sort_events(&events)),
        vec!["first", "mystery", "second", "third"]
    );
}

#[test]
fn unplaceable_events_stay_put_while_others_reorder() {
    let events = vec![
        event("late", TimelineDate::day(2022, 1, 1)),
        event("mystery", TimelineDate::unknown()),
        event("early", TimelineDate::day(2020, 1, 1)),
        event("relative", TimelineDate::relative("late", 2)),
        event("middle", TimelineDate::day(2021, 1, 1)),
    ];
    assert_eq!(
        ids(sort_events(&events)),
        vec!["early", "mystery", "middle", "relative", "late"]
    );
}

#[test]
fn equal_dates_keep_input_order() {
    let events = vec![
        event("b", TimelineDate::year(1850)),
        event("a", TimelineDate::year(1850)),
        event("c", TimelineDate::year(1700)),
    ];
    assert_eq!(ids(sort_events(&events)), vec!["c", "b", "a"]);
}

#[test]
fn same_day_times_keep_input_order() {
    let events = vec![
        event("evening", TimelineDate::exact(2024, 1, 1, 18, 0)),
        event("morning", TimelineDate::exact(2024, 1, 1, 8, 0)),
        event("before", TimelineDate::day(2023, 12, 31)),
    ];
    assert_eq!(
        ids(sort_events(&events)),
        vec!["before", "evening", "morning"]
    );
}

#[test]
fn sort_handles_empty_input() {
    let events: Vec<TimelineEvent> = Vec::new();
    assert!(sort_events(&events).is_empty());
}

// ── Filtering ───────────────────────────────────────────────────────────────

fn sample() -> Vec<TimelineEvent> {
    let mut battle = event("battle", TimelineDate::day(1805, 10, 21));
    battle.event_type = EventType::Historical;
    battle.importance = Importance::Critical;
    battle.tags = vec!["war".to_string(), "navy".to_string()];
    battle.character_ids = vec!["nelson".to_string()];

    let mut ball = event("ball", TimelineDate::day(1811, 4, 2));
    ball.tags = vec!["society".to_string()];
    ball.character_ids = vec!["emma".to_string(), "knightley".to_string()];

    let mut proposal = event("proposal", TimelineDate::unknown());
    proposal.event_type = EventType::PlotPoint;
    proposal.importance = Importance::Major;
    proposal.character_ids = vec!["knightley".to_string()];
    proposal.conflicts = vec![TimelineConflict::new(
        ConflictType::Custom,
        Severity::Info,
        "check this",
        ["proposal"],
    )];

    vec![battle, ball, proposal]
}

#[test]
fn empty_filter_matches_everything() {
    let events = sample();
    assert_eq!(filter_events(&events, &EventFilter::default()).len(), 3);
}

#[test]
fn filter_by_type_and_importance() {
    let events = sample();
    let filter = EventFilter {
        types: vec![EventType::Scene, EventType::Historical],
        importance: vec![Importance::Critical],
        ..EventFilter::default()
    };
    assert_eq!(ids(filter_events(&events, &filter)), vec!["battle"]);
}

#[test]
fn filter_by_character_intersection() {
    let events = sample();
    let filter = EventFilter {
        character_ids: vec!["knightley".to_string(), "nobody".to_string()],
        ..EventFilter::default()
    };
    assert_eq!(ids(filter_events(&events, &filter)), vec!["ball", "proposal"]);
}

#[test]
fn filter_by_tag_intersection() {
    let events = sample();
    let filter = EventFilter {
        tags: vec!["navy".to_string()],
        ..EventFilter::default()
    };
    assert_eq!(ids(filter_events(&events, &filter)), vec!["battle"]);
}

#[test]
fn filter_by_date_range_excludes_incomparable() {
    let events = sample();
    let filter = EventFilter {
        date_range: Some(DateRange::new(TimelineDate::year(1800), TimelineDate::year(1810))),
        ..EventFilter::default()
    };
    // The ball is after the range and the proposal cannot be placed.
    assert_eq!(ids(filter_events(&events, &filter)), vec!["battle"]);
}

#[test]
fn date_range_is_inclusive() {
    let range = DateRange::new(TimelineDate::day(1811, 4, 2), TimelineDate::day(1811, 4, 2));
    assert!(range.contains(&TimelineDate::day(1811, 4, 2)));
    assert!(!range.contains(&TimelineDate::day(1811, 4, 3)));
}

#[test]
fn filter_by_conflict_presence() {
    let mut events = sample();
    let with = EventFilter {
        has_conflicts: Some(true),
        ..EventFilter::default()
    };
    let without = EventFilter {
        has_conflicts: Some(false),
        ..EventFilter::default()
    };
    assert_eq!(ids(filter_events(&events, &with)), vec!["proposal"]);
    assert_eq!(filter_events(&events, &without).len(), 2);

    // A resolved finding no longer counts.
    events[2].conflicts[0].resolved = true;
    assert!(filter_events(&events, &with).is_empty());
}

#[test]
fn criteria_are_conjunctive() {
    let events = sample();
    let filter = EventFilter {
        character_ids: vec!["knightley".to_string()],
        types: vec![EventType::PlotPoint],
        ..EventFilter::default()
    };
    assert_eq!(ids(filter_events(&events, &filter)), vec!["proposal"]);
}

// ── Search ──────────────────────────────────────────────────────────────────

fn searchable() -> Vec<TimelineEvent> {
    let mut title_only = event("title-only", TimelineDate::year(1));
    title_only.title = "The Storm".to_string();

    let mut everywhere = event("everywhere", TimelineDate::year(2));
    everywhere.title = "Storm at sea".to_string();
    everywhere.description = Some("A storm wrecks the fleet".to_string());
    everywhere.location = Some("Stormhaven".to_string());
    everywhere.tags = vec!["weather".to_string(), "storm".to_string()];
    everywhere.notes = Some("Research storm surges".to_string());

    let mut notes_only = event("notes-only", TimelineDate::year(3));
    notes_only.title = "Calm".to_string();
    notes_only.notes = Some("before the STORM".to_string());

    let mut miss = event("miss", TimelineDate::year(4));
    miss.title = "Sunshine".to_string();

    vec![title_only, notes_only, everywhere, miss]
}

#[test]
fn search_weights_and_orders_by_relevance() {
    let events = searchable();
    let hits = search_events(&events, "storm");

    let ranked: Vec<(&str, u32)> = hits.iter().map(|h| (h.event.id.as_str(), h.relevance)).collect();
    assert_eq!(
        ranked,
        vec![("everywhere", 10 + 7 + 5 + 4 + 3), ("title-only", 10), ("notes-only", 3)]
    );
}

#[test]
fn search_is_case_insensitive() {
    let events = searchable();
    assert_eq!(search_events(&events, "sTOrM").len(), 3);
}

#[test]
fn blank_query_matches_nothing() {
    let events = searchable();
    assert!(search_events(&events, "   ").is_empty());
}

#[test]
fn no_match_returns_empty() {
    let events = searchable();
    assert!(search_events(&events, "volcano").is_empty());
}
