//! Detect inconsistencies among timeline events.
//!
//! Each rule is an independent function that inspects one event against the
//! whole store and returns its findings. [`detect_event_conflicts`] runs the
//! enabled rules; [`merge_resolution_state`] carries user resolution flags
//! across rescans by finding id.
//!
//! Rules never report on dates they cannot place: an `Incomparable`
//! comparison suppresses the check instead of producing a false positive.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::date::{compare_dates, days_in_month, CalendarFields, DateOrdering, TimelineDate};
use crate::event::TimelineEvent;

/// Kinds of finding. Only some are produced by the detector today; see the
/// individual rule functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    OverlappingEvents,
    ImpossibleDate,
    DateOrder,
    CircularReference,
    AgeInconsistency,
    TravelTime,
    DurationMismatch,
    /// Raised by consumers, never by the detector.
    Custom,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::OverlappingEvents => "overlapping-events",
            ConflictType::ImpossibleDate => "impossible-date",
            ConflictType::DateOrder => "date-order",
            ConflictType::CircularReference => "circular-reference",
            ConflictType::AgeInconsistency => "age-inconsistency",
            ConflictType::TravelTime => "travel-time",
            ConflictType::DurationMismatch => "duration-mismatch",
            ConflictType::Custom => "custom",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// A detected inconsistency.
///
/// The detector fills in everything except the resolution flags, which belong
/// to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineConflict {
    /// Derived from the type and the implicated event ids; stable across rescans.
    pub id: String,
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub severity: Severity,
    pub message: String,
    /// Implicated events, sorted.
    pub event_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default)]
    pub ignored_by_user: bool,
}

impl TimelineConflict {
    pub fn new(
        conflict_type: ConflictType,
        severity: Severity,
        message: impl Into<String>,
        event_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut event_ids: Vec<String> = event_ids.into_iter().map(Into::into).collect();
        event_ids.sort();
        event_ids.dedup();
        Self {
            id: conflict_id(conflict_type, &event_ids),
            conflict_type,
            severity,
            message: message.into(),
            event_ids,
            details: None,
            resolved: false,
            resolution: None,
            ignored_by_user: false,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Neither resolved nor ignored.
    pub fn is_active(&self) -> bool {
        !self.resolved && !self.ignored_by_user
    }
}

/// Deterministic finding id: `<type>:<sorted ids joined by '+'>`.
pub fn conflict_id(conflict_type: ConflictType, event_ids: &[String]) -> String {
    let mut ids: Vec<&str> = event_ids.iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids.dedup();
    format!("{}:{}", conflict_type, ids.join("+"))
}

/// Which rules a rescan runs. Every rule is on by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectorConfig {
    pub overlapping_events: bool,
    pub impossible_dates: bool,
    pub date_order: bool,
    pub circular_references: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            overlapping_events: true,
            impossible_dates: true,
            date_order: true,
            circular_references: true,
        }
    }
}

/// Run every enabled rule for `event` against the whole store.
pub fn detect_event_conflicts(
    event: &TimelineEvent,
    events: &IndexMap<String, TimelineEvent>,
    config: &DetectorConfig,
) -> Vec<TimelineConflict> {
    let mut found = Vec::new();
    if config.overlapping_events {
        found.extend(check_overlapping_events(event, events));
    }
    if config.impossible_dates {
        found.extend(check_impossible_dates(event));
    }
    if config.date_order {
        found.extend(check_date_order(event));
    }
    if config.circular_references {
        found.extend(check_circular_reference(event, events));
    }
    found.extend(check_age_consistency(event, events));
    found.extend(check_travel_time(event, events));
    found.extend(check_duration_mismatch(event, events));
    found
}

/// Copy `resolved`, `resolution` and `ignoredByUser` from `previous` onto
/// fresh findings with the same id. Findings that no longer occur are dropped.
pub fn merge_resolution_state(
    previous: &[TimelineConflict],
    fresh: Vec<TimelineConflict>,
) -> Vec<TimelineConflict> {
    fresh
        .into_iter()
        .map(|mut conflict| {
            if let Some(old) = previous.iter().find(|p| p.id == conflict.id) {
                conflict.resolved = old.resolved;
                conflict.resolution = old.resolution.clone();
                conflict.ignored_by_user = old.ignored_by_user;
            }
            conflict
        })
        .collect()
}

/// Whether the effective intervals `[start, end || start]` of two events
/// overlap.
///
/// The intervals overlap iff `a.start <= b.end` and `b.start <= a.end`, with
/// "equal" meaning within a day. Touching intervals therefore overlap. Any
/// incomparable endpoint means no overlap.
pub fn intervals_overlap(a: &TimelineEvent, b: &TimelineEvent) -> bool {
    compare_dates(&a.start_date, b.effective_end()).is_le()
        && compare_dates(&b.start_date, a.effective_end()).is_le()
}

/// Events sharing a character whose intervals overlap.
pub fn check_overlapping_events(
    event: &TimelineEvent,
    events: &IndexMap<String, TimelineEvent>,
) -> Vec<TimelineConflict> {
    let mut conflicts = Vec::new();
    if event.character_ids.is_empty() {
        return conflicts;
    }

    for other in events.values() {
        if other.id == event.id {
            continue;
        }
        let shared = event.shared_characters(other);
        if shared.is_empty() || !intervals_overlap(event, other) {
            continue;
        }
        conflicts.push(
            TimelineConflict::new(
                ConflictType::OverlappingEvents,
                Severity::Warning,
                format!(
                    "\"{}\" and \"{}\" overlap in time and share {} character(s)",
                    event.title,
                    other.title,
                    shared.len()
                ),
                [event.id.as_str(), other.id.as_str()],
            )
            .with_details(json!({ "sharedCharacterIds": shared })),
        );
    }

    conflicts
}

/// Calendar dates that cannot exist, e.g. 30 February or month 13.
///
/// Only dates with a standard `year` are checked. Problems on the start and
/// end date are folded into a single finding.
pub fn check_impossible_dates(event: &TimelineEvent) -> Vec<TimelineConflict> {
    let mut problems: Vec<String> = Vec::new();
    if let Some(reason) = impossible_reason(&event.start_date) {
        problems.push(format!("start date: {}", reason));
    }
    if let Some(reason) = event.end_date.as_ref().and_then(impossible_reason) {
        problems.push(format!("end date: {}", reason));
    }
    if problems.is_empty() {
        return Vec::new();
    }

    vec![TimelineConflict::new(
        ConflictType::ImpossibleDate,
        Severity::Error,
        format!("\"{}\" has an impossible {}", event.title, problems.join("; ")),
        [event.id.as_str()],
    )
    .with_details(json!({ "problems": problems }))]
}

fn impossible_reason(date: &TimelineDate) -> Option<String> {
    let fields: &CalendarFields = date.calendar()?;
    let year = fields.year?;

    if let Some(month) = fields.month {
        if !(1..=12).contains(&month) {
            return Some(format!("month {} is outside 1-12", month));
        }
    }
    if let Some(day) = fields.day {
        let month = fields
            .month
            .and_then(|m| u32::try_from(m).ok())
            .unwrap_or(1);
        let limit = i64::from(days_in_month(year, month).unwrap_or(31));
        if day < 1 || day > limit {
            return Some(format!(
                "day {} is outside 1-{} for {}-{:02}",
                day, limit, year, month
            ));
        }
    }
    None
}

/// An end date that falls before the start date.
pub fn check_date_order(event: &TimelineEvent) -> Vec<TimelineConflict> {
    let Some(end) = &event.end_date else {
        return Vec::new();
    };
    if compare_dates(&event.start_date, end) != DateOrdering::Greater {
        return Vec::new();
    }

    vec![TimelineConflict::new(
        ConflictType::DateOrder,
        Severity::Error,
        format!("\"{}\" ends before it starts", event.title),
        [event.id.as_str()],
    )]
}

/// A cycle in the `parentEventId` chain starting at `event`.
///
/// The walk keeps a visited set, so it ends after at most one step per event
/// even on malformed data. A cycle is reported once, on its lowest member id,
/// listing every member. Events that merely lead into a cycle report nothing.
/// Dangling parent ids end the walk.
pub fn check_circular_reference(
    event: &TimelineEvent,
    events: &IndexMap<String, TimelineEvent>,
) -> Vec<TimelineConflict> {
    let mut path: Vec<&str> = vec![event.id.as_str()];
    let mut visited: HashSet<&str> = HashSet::from([event.id.as_str()]);
    let mut current = event;

    while let Some(parent_id) = current.parent_event_id.as_deref() {
        if visited.contains(parent_id) {
            let start = path.iter().position(|id| *id == parent_id).unwrap_or(0);
            let cycle = &path[start..];
            if cycle.iter().min() != Some(&event.id.as_str()) {
                return Vec::new();
            }
            let mut chain = cycle.to_vec();
            chain.push(parent_id);
            return vec![TimelineConflict::new(
                ConflictType::CircularReference,
                Severity::Error,
                format!("Circular parent chain: {}", chain.join(" -> ")),
                cycle.iter().copied(),
            )
            .with_details(json!({ "cycle": chain }))];
        }
        let Some(parent) = events.get(parent_id) else {
            break;
        };
        visited.insert(parent_id);
        path.push(parent_id);
        current = parent;
    }

    Vec::new()
}

/// Needs a character birth-date registry, which the store does not have.
/// Produces no findings until one exists.
pub fn check_age_consistency(
    _event: &TimelineEvent,
    _events: &IndexMap<String, TimelineEvent>,
) -> Vec<TimelineConflict> {
    Vec::new()
}

/// Needs a location-distance model. Produces no findings until one exists.
pub fn check_travel_time(
    _event: &TimelineEvent,
    _events: &IndexMap<String, TimelineEvent>,
) -> Vec<TimelineConflict> {
    Vec::new()
}

/// Needs a location-distance model. Produces no findings until one exists.
pub fn check_duration_mismatch(
    _event: &TimelineEvent,
    _events: &IndexMap<String, TimelineEvent>,
) -> Vec<TimelineConflict> {
    Vec::new()
}
