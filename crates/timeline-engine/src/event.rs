//! Timeline events and the partial-update patch applied to them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conflict::TimelineConflict;
use crate::date::{calculate_duration, TimelineDate};
use crate::error::TimelineError;

/// Classification of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    Scene,
    PlotPoint,
    CharacterEvent,
    Historical,
    Research,
    Milestone,
    Other,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::Scene,
        EventType::PlotPoint,
        EventType::CharacterEvent,
        EventType::Historical,
        EventType::Research,
        EventType::Milestone,
        EventType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Scene => "scene",
            EventType::PlotPoint => "plot-point",
            EventType::CharacterEvent => "character-event",
            EventType::Historical => "historical",
            EventType::Research => "research",
            EventType::Milestone => "milestone",
            EventType::Other => "other",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TimelineError::InvalidValue {
                kind: "event type",
                value: s.to_string(),
            })
    }
}

/// How much an event matters to the story.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Importance {
    Critical,
    Major,
    #[default]
    Moderate,
    Minor,
}

impl Importance {
    pub const ALL: [Importance; 4] = [
        Importance::Critical,
        Importance::Major,
        Importance::Moderate,
        Importance::Minor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Critical => "critical",
            Importance::Major => "major",
            Importance::Moderate => "moderate",
            Importance::Minor => "minor",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Importance {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Importance::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| TimelineError::InvalidValue {
                kind: "importance",
                value: s.to_string(),
            })
    }
}

/// A single entry on the timeline.
///
/// Relationship lists (`character_ids`, `scene_ids`, ...) are weak references
/// into collections owned elsewhere: ids only, never validated.
///
/// Hierarchy is stored on the child side only, in `parent_event_id`. Child
/// lists are derived on demand by [`crate::TimelineManager::children_of`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub importance: Importance,

    pub start_date: TimelineDate,
    /// Instantaneous event when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<TimelineDate>,
    /// Caller-supplied duration in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default)]
    pub character_ids: Vec<String>,
    #[serde(default)]
    pub scene_ids: Vec<String>,
    #[serde(default)]
    pub research_note_ids: Vec<String>,
    #[serde(default)]
    pub file_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    /// Child lists written by older hosts. Folded into the children's
    /// `parent_event_id` on load and never written back.
    #[serde(default, rename = "childEventIds", skip_serializing)]
    pub(crate) legacy_child_ids: Vec<String>,

    /// Findings attached by the last conflict rescan.
    #[serde(default)]
    pub conflicts: Vec<TimelineConflict>,

    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified: DateTime<Utc>,
}

impl TimelineEvent {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        event_type: EventType,
        start_date: TimelineDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            event_type,
            importance: Importance::default(),
            start_date,
            end_date: None,
            duration: None,
            location: None,
            tags: Vec::new(),
            color: None,
            notes: None,
            character_ids: Vec::new(),
            scene_ids: Vec::new(),
            research_note_ids: Vec::new(),
            file_ids: Vec::new(),
            parent_event_id: None,
            legacy_child_ids: Vec::new(),
            conflicts: Vec::new(),
            created: now,
            modified: now,
        }
    }

    /// The end of the event's interval; the start for instantaneous events.
    pub fn effective_end(&self) -> &TimelineDate {
        self.end_date.as_ref().unwrap_or(&self.start_date)
    }

    /// Caller-supplied duration, else the distance between start and end.
    pub fn effective_duration(&self) -> Option<f64> {
        self.duration.or_else(|| {
            self.end_date
                .as_ref()
                .and_then(|end| calculate_duration(&self.start_date, end))
        })
    }

    pub fn has_character(&self, character_id: &str) -> bool {
        self.character_ids.iter().any(|c| c == character_id)
    }

    /// Character ids referenced by both events, sorted and de-duplicated.
    pub fn shared_characters<'a>(&'a self, other: &TimelineEvent) -> Vec<&'a str> {
        self.character_ids
            .iter()
            .filter(|c| other.character_ids.contains(c))
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Conflicts that are neither resolved nor ignored.
    pub fn active_conflicts(&self) -> impl Iterator<Item = &TimelineConflict> {
        self.conflicts.iter().filter(|c| c.is_active())
    }
}

/// A shallow partial update for [`TimelineEvent`].
///
/// `None` leaves a field untouched. Nullable fields take `Some(None)` to
/// clear them. Dates are replaced whole: resend the complete date to change
/// any part of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub event_type: Option<EventType>,
    pub importance: Option<Importance>,
    pub start_date: Option<TimelineDate>,
    pub end_date: Option<Option<TimelineDate>>,
    pub duration: Option<Option<f64>>,
    pub location: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub color: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub character_ids: Option<Vec<String>>,
    pub scene_ids: Option<Vec<String>>,
    pub research_note_ids: Option<Vec<String>>,
    pub file_ids: Option<Vec<String>>,
    pub parent_event_id: Option<Option<String>>,
}

impl EventPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn importance(mut self, importance: Importance) -> Self {
        self.importance = Some(importance);
        self
    }

    pub fn start_date(mut self, date: TimelineDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: Option<TimelineDate>) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn duration(mut self, days: Option<f64>) -> Self {
        self.duration = Some(days);
        self
    }

    pub fn location(mut self, location: Option<String>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn color(mut self, color: Option<String>) -> Self {
        self.color = Some(color);
        self
    }

    pub fn characters<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.character_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn scenes<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scene_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn research_notes<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.research_note_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn files<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn parent(mut self, parent_event_id: Option<String>) -> Self {
        self.parent_event_id = Some(parent_event_id);
        self
    }

    /// Merge the set fields into `event`. Does not touch `modified`.
    pub(crate) fn apply(self, event: &mut TimelineEvent) {
        if let Some(v) = self.title {
            event.title = v;
        }
        if let Some(v) = self.description {
            event.description = v;
        }
        if let Some(v) = self.event_type {
            event.event_type = v;
        }
        if let Some(v) = self.importance {
            event.importance = v;
        }
        if let Some(v) = self.start_date {
            event.start_date = v;
        }
        if let Some(v) = self.end_date {
            event.end_date = v;
        }
        if let Some(v) = self.duration {
            event.duration = v;
        }
        if let Some(v) = self.location {
            event.location = v;
        }
        if let Some(v) = self.tags {
            event.tags = v;
        }
        if let Some(v) = self.color {
            event.color = v;
        }
        if let Some(v) = self.notes {
            event.notes = v;
        }
        if let Some(v) = self.character_ids {
            event.character_ids = v;
        }
        if let Some(v) = self.scene_ids {
            event.scene_ids = v;
        }
        if let Some(v) = self.research_note_ids {
            event.research_note_ids = v;
        }
        if let Some(v) = self.file_ids {
            event.file_ids = v;
        }
        if let Some(v) = self.parent_event_id {
            event.parent_event_id = v;
        }
    }
}
