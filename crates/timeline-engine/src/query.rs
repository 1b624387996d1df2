//! Chronological sorting, conjunctive filtering and relevance search over
//! events.

use crate::date::{compare_dates, TimelineDate};
use crate::event::{EventType, Importance, TimelineEvent};

const TITLE_WEIGHT: u32 = 10;
const DESCRIPTION_WEIGHT: u32 = 7;
const LOCATION_WEIGHT: u32 = 5;
const TAGS_WEIGHT: u32 = 4;
const NOTES_WEIGHT: u32 = 3;

/// Sort events by start date.
///
/// `compare_dates` is only a partial order, so sorting falls back to a total
/// one: an event whose start date cannot be placed on the timeline
/// (`unknown`, unresolved `relative`) is incomparable to everything and keeps
/// its index in the input. The placeable events are stably sorted by calendar
/// day into the remaining positions, so events on the same day (which
/// `compare_dates` calls `Equal` whatever their time of day) keep their input
/// order. Sorting on whole days keeps the key a total order; the one-day
/// tolerance of `compare_dates` alone is not transitive.
pub fn sort_events<'a, I>(events: I) -> Vec<&'a TimelineEvent>
where
    I: IntoIterator<Item = &'a TimelineEvent>,
{
    let mut sorted: Vec<&TimelineEvent> = events.into_iter().collect();

    let mut placeable: Vec<(usize, f64)> = sorted
        .iter()
        .enumerate()
        .filter_map(|(slot, event)| {
            event
                .start_date
                .scalar_days()
                .map(|days| (slot, days.floor()))
        })
        .collect();
    let slots: Vec<usize> = placeable.iter().map(|(slot, _)| *slot).collect();

    // Stable: equal positions keep their input order.
    placeable.sort_by(|a, b| a.1.total_cmp(&b.1));
    let ordered: Vec<&TimelineEvent> = placeable.iter().map(|(slot, _)| sorted[*slot]).collect();

    for (slot, event) in slots.into_iter().zip(ordered) {
        sorted[slot] = event;
    }
    sorted
}

/// An inclusive range checked against event start dates.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub start: TimelineDate,
    pub end: TimelineDate,
}

impl DateRange {
    pub fn new(start: TimelineDate, end: TimelineDate) -> Self {
        Self { start, end }
    }

    /// Both comparisons must succeed; an incomparable date is never inside.
    pub fn contains(&self, date: &TimelineDate) -> bool {
        compare_dates(date, &self.start).is_ge() && compare_dates(date, &self.end).is_le()
    }
}

/// Conjunctive filter criteria. Empty sets and `None` impose no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub types: Vec<EventType>,
    pub importance: Vec<Importance>,
    /// Matches events referencing at least one of these characters.
    pub character_ids: Vec<String>,
    /// Matches events carrying at least one of these tags.
    pub tags: Vec<String>,
    pub date_range: Option<DateRange>,
    /// Presence (or absence) of unresolved, non-ignored conflicts.
    pub has_conflicts: Option<bool>,
}

impl EventFilter {
    pub fn matches(&self, event: &TimelineEvent) -> bool {
        if !self.types.is_empty() && !self.types.contains(&event.event_type) {
            return false;
        }
        if !self.importance.is_empty() && !self.importance.contains(&event.importance) {
            return false;
        }
        if !self.character_ids.is_empty()
            && !self.character_ids.iter().any(|c| event.has_character(c))
        {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| event.tags.contains(t)) {
            return false;
        }
        if let Some(range) = &self.date_range {
            if !range.contains(&event.start_date) {
                return false;
            }
        }
        if let Some(wanted) = self.has_conflicts {
            if event.active_conflicts().next().is_some() != wanted {
                return false;
            }
        }
        true
    }
}

pub fn filter_events<'a, I>(events: I, filter: &EventFilter) -> Vec<&'a TimelineEvent>
where
    I: IntoIterator<Item = &'a TimelineEvent>,
{
    events.into_iter().filter(|e| filter.matches(e)).collect()
}

/// A search match and its summed field weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub event: &'a TimelineEvent,
    pub relevance: u32,
}

/// Case-insensitive substring search over title, description, location, tags
/// and notes.
///
/// Each matching field adds its weight once. Events with zero relevance are
/// dropped; the rest come back most relevant first, ties in input order. A
/// blank query matches nothing.
pub fn search_events<'a, I>(events: I, query: &str) -> Vec<SearchHit<'a>>
where
    I: IntoIterator<Item = &'a TimelineEvent>,
{
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit<'a>> = events
        .into_iter()
        .filter_map(|event| {
            let relevance = relevance(event, &needle);
            (relevance > 0).then_some(SearchHit { event, relevance })
        })
        .collect();
    hits.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    hits
}

fn relevance(event: &TimelineEvent, needle: &str) -> u32 {
    let hit = |text: &str| text.to_lowercase().contains(needle);
    let optional_hit = |text: &Option<String>| text.as_deref().is_some_and(hit);

    let mut score = 0;
    if hit(&event.title) {
        score += TITLE_WEIGHT;
    }
    if optional_hit(&event.description) {
        score += DESCRIPTION_WEIGHT;
    }
    if optional_hit(&event.location) {
        score += LOCATION_WEIGHT;
    }
    if event.tags.iter().any(|tag| hit(tag)) {
        score += TAGS_WEIGHT;
    }
    if optional_hit(&event.notes) {
        score += NOTES_WEIGHT;
    }
    score
}
