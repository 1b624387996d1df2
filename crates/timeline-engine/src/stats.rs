//! Aggregate figures for dashboards and exporters.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::conflict::{ConflictType, TimelineConflict};
use crate::date::calculate_duration;
use crate::event::{EventType, Importance, TimelineEvent};
use crate::query::sort_events;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStatistics {
    pub total_events: usize,
    pub events_by_type: BTreeMap<EventType, usize>,
    pub events_by_importance: BTreeMap<Importance, usize>,
    /// First placeable event in chronological order.
    pub earliest_event_id: Option<String>,
    /// Last placeable event in chronological order.
    pub latest_event_id: Option<String>,
    /// From the earliest start to the latest event's end (or start).
    pub time_span_days: Option<f64>,
    /// Distinct findings across all events.
    pub total_conflicts: usize,
    pub unresolved_conflicts: usize,
    pub conflicts_by_type: BTreeMap<ConflictType, usize>,
    /// Distinct character ids referenced by any event.
    pub character_count: usize,
    pub events_with_characters: usize,
}

/// Compute statistics over `events`.
///
/// A finding attached to several events (an overlap is attached to both
/// sides) is counted once.
pub fn compute_statistics<'a, I>(events: I) -> TimelineStatistics
where
    I: IntoIterator<Item = &'a TimelineEvent>,
{
    let events: Vec<&TimelineEvent> = events.into_iter().collect();
    let mut stats = TimelineStatistics {
        total_events: events.len(),
        ..TimelineStatistics::default()
    };

    let mut characters: BTreeSet<&str> = BTreeSet::new();
    for event in &events {
        *stats.events_by_type.entry(event.event_type).or_default() += 1;
        *stats.events_by_importance.entry(event.importance).or_default() += 1;
        if !event.character_ids.is_empty() {
            stats.events_with_characters += 1;
            characters.extend(event.character_ids.iter().map(String::as_str));
        }
    }
    stats.character_count = characters.len();

    for conflict in distinct_conflicts(events.iter().copied()) {
        stats.total_conflicts += 1;
        if !conflict.resolved {
            stats.unresolved_conflicts += 1;
        }
        *stats.conflicts_by_type.entry(conflict.conflict_type).or_default() += 1;
    }

    let placed: Vec<&TimelineEvent> = sort_events(events.iter().copied())
        .into_iter()
        .filter(|e| e.start_date.is_placeable())
        .collect();
    if let (Some(earliest), Some(latest)) = (placed.first(), placed.last()) {
        stats.earliest_event_id = Some(earliest.id.clone());
        stats.latest_event_id = Some(latest.id.clone());
        // An end that cannot be placed falls back to the latest start.
        stats.time_span_days = calculate_duration(&earliest.start_date, latest.effective_end())
            .or_else(|| calculate_duration(&earliest.start_date, &latest.start_date));
    }

    stats
}

/// Findings across `events`, de-duplicated by id, first occurrence wins.
pub fn distinct_conflicts<'a, I>(events: I) -> Vec<&'a TimelineConflict>
where
    I: IntoIterator<Item = &'a TimelineEvent>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    events
        .into_iter()
        .flat_map(|e| e.conflicts.iter())
        .filter(|c| seen.insert(c.id.as_str()))
        .collect()
}
