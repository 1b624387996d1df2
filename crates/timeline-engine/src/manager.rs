//! The event store: an id-keyed arena of [`TimelineEvent`]s.
//!
//! Hierarchy is an index relation. Each event names its parent in
//! `parent_event_id`; child lists are computed by scanning, so there is no
//! second copy of the relation to keep in sync.
//!
//! Mutations are permissive. Unknown ids are silent no-ops, and semantic
//! problems such as impossible dates surface only through
//! [`TimelineManager::detect_all_conflicts`].

use std::collections::{BTreeSet, HashSet, VecDeque};

use chrono::Utc;
use indexmap::IndexMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::conflict::{self, DetectorConfig, TimelineConflict};
use crate::date::{date_from_scalar, DateValue, TimelineDate};
use crate::error::Result;
use crate::event::{EventPatch, EventType, Importance, TimelineEvent};
use crate::query::{self, EventFilter, SearchHit};
use crate::stats::{self, TimelineStatistics};

/// Single-owner, in-memory event store.
#[derive(Debug, Clone, Default)]
pub struct TimelineManager {
    events: IndexMap<String, TimelineEvent>,
    config: DetectorConfig,
}

impl TimelineManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            events: IndexMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DetectorConfig) {
        self.config = config;
    }

    // ── Persistence boundary ────────────────────────────────────────────────

    /// Replace the whole store. The data is trusted, not validated.
    ///
    /// Events with an empty id take their map key. Child lists written by
    /// older hosts (`childEventIds`) set the parent of each listed child that
    /// has none yet.
    pub fn load_events(&mut self, events: IndexMap<String, TimelineEvent>) {
        self.events = events;

        let mut links: Vec<(String, String)> = Vec::new();
        for (key, event) in self.events.iter_mut() {
            if event.id.is_empty() {
                event.id = key.clone();
            }
            for child in std::mem::take(&mut event.legacy_child_ids) {
                links.push((event.id.clone(), child));
            }
        }
        for (parent_id, child_id) in links {
            match self.events.get_mut(&child_id) {
                Some(child) if child.parent_event_id.is_none() => {
                    child.parent_event_id = Some(parent_id);
                }
                Some(_) => {}
                None => warn!(parent = %parent_id, child = %child_id, "legacy child id not in store"),
            }
        }

        debug!(events = self.events.len(), "loaded events");
    }

    /// Snapshot of the store for serialization.
    pub fn events_for_save(&self) -> IndexMap<String, TimelineEvent> {
        self.events.clone()
    }

    /// Build a store from a JSON object of events keyed by id.
    pub fn from_json(json: &str) -> Result<Self> {
        let events: IndexMap<String, TimelineEvent> = serde_json::from_str(json)?;
        let mut manager = Self::new();
        manager.load_events(events);
        Ok(manager)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.events)?)
    }

    // ── Read access ─────────────────────────────────────────────────────────

    pub fn all_events(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events.values()
    }

    pub fn get_event(&self, id: &str) -> Option<&TimelineEvent> {
        self.events.get(id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    // ── Mutations ───────────────────────────────────────────────────────────

    /// Insert a new event with a fresh time-ordered id.
    pub fn create_event(
        &mut self,
        title: impl Into<String>,
        event_type: EventType,
        start_date: TimelineDate,
        importance: Importance,
    ) -> &TimelineEvent {
        let id = self.next_id();
        let mut event = TimelineEvent::new(id.clone(), title, event_type, start_date);
        event.importance = importance;
        debug!(event_id = %id, title = %event.title, "created event");
        self.events.entry(id).or_insert(event)
    }

    /// Shallow-merge `patch` into an event and bump `modified`.
    ///
    /// Returns `None` when the id is unknown.
    pub fn update_event(&mut self, id: &str, patch: EventPatch) -> Option<&TimelineEvent> {
        let event = self.events.get_mut(id)?;
        patch.apply(event);
        event.modified = Utc::now();
        debug!(event_id = %id, "updated event");
        Some(&*event)
    }

    /// Delete an event together with its whole descendant subtree.
    ///
    /// Returns whether the event existed.
    pub fn delete_event(&mut self, id: &str) -> bool {
        if !self.events.contains_key(id) {
            return false;
        }
        let mut doomed = self.descendants_of(id);
        doomed.push(id.to_string());
        for doomed_id in &doomed {
            self.events.shift_remove(doomed_id);
        }
        debug!(event_id = %id, removed = doomed.len(), "deleted event subtree");
        true
    }

    fn next_id(&self) -> String {
        loop {
            let id = Uuid::now_v7().to_string();
            if !self.events.contains_key(&id) {
                return id;
            }
        }
    }

    // ── Hierarchy ───────────────────────────────────────────────────────────

    /// Direct children, in store order.
    pub fn children_of(&self, id: &str) -> Vec<&TimelineEvent> {
        self.events
            .values()
            .filter(|e| e.parent_event_id.as_deref() == Some(id))
            .collect()
    }

    /// Ids of every descendant, breadth first. Terminates on cyclic data and
    /// never includes `id` itself.
    pub fn descendants_of(&self, id: &str) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::from([id]);
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        let mut found = Vec::new();

        while let Some(current) = queue.pop_front() {
            for child in self.children_of(current) {
                if seen.insert(child.id.as_str()) {
                    found.push(child.id.clone());
                    queue.push_back(child.id.as_str());
                }
            }
        }
        found
    }

    /// Events without a parent, or whose parent is not in the store.
    pub fn root_events(&self) -> Vec<&TimelineEvent> {
        self.events
            .values()
            .filter(|e| match e.parent_event_id.as_deref() {
                Some(parent) => !self.events.contains_key(parent),
                None => true,
            })
            .collect()
    }

    /// Resolve a `relative` date to an absolute `day` date by following its
    /// anchor events.
    ///
    /// Each hop adds its `relativeOffset`; a fractional total lands on the day
    /// it falls within. Returns `None` when an anchor is
    /// missing, cannot be placed, or the anchors form a cycle. Other dates
    /// resolve to themselves.
    pub fn resolve_date(&self, date: &TimelineDate) -> Option<TimelineDate> {
        if !matches!(date.value, DateValue::Relative(_)) {
            return Some(date.clone());
        }

        let mut offset = 0.0;
        let mut approximate = date.is_approximate;
        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = date;

        while let DateValue::Relative(rel) = &current.value {
            offset += rel.relative_offset.unwrap_or(0.0);
            let anchor_id = rel.relative_to_event_id.as_deref()?;
            if !visited.insert(anchor_id) {
                warn!(anchor = %anchor_id, "relative date anchors form a cycle");
                return None;
            }
            current = &self.events.get(anchor_id)?.start_date;
            approximate |= current.is_approximate;
        }

        let base = current.scalar_days()?;
        let mut resolved = date_from_scalar(base + offset)?;
        resolved.is_approximate = approximate;
        Some(resolved)
    }

    // ── Derived views ───────────────────────────────────────────────────────

    /// All events in chronological order. See [`query::sort_events`].
    pub fn sort_events(&self) -> Vec<&TimelineEvent> {
        query::sort_events(self.events.values())
    }

    pub fn filter_events(&self, filter: &EventFilter) -> Vec<&TimelineEvent> {
        query::filter_events(self.events.values(), filter)
    }

    pub fn search_events(&self, text: &str) -> Vec<SearchHit<'_>> {
        query::search_events(self.events.values(), text)
    }

    pub fn get_statistics(&self) -> TimelineStatistics {
        stats::compute_statistics(self.events.values())
    }

    /// Every tag in use, sorted and de-duplicated.
    pub fn get_all_tags(&self) -> Vec<String> {
        self.events
            .values()
            .flat_map(|e| e.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Events referencing a character, in chronological order.
    pub fn get_character_events(&self, character_id: &str) -> Vec<&TimelineEvent> {
        query::sort_events(
            self.events
                .values()
                .filter(|e| e.has_character(character_id)),
        )
    }

    // ── Conflicts ───────────────────────────────────────────────────────────

    /// Rescan every event and replace its findings.
    ///
    /// Findings that reappear keep the resolution flags the user set on the
    /// previous scan. Returns the distinct findings across the store.
    pub fn detect_all_conflicts(&mut self) -> Vec<TimelineConflict> {
        let fresh: Vec<(String, Vec<TimelineConflict>)> = self
            .events
            .values()
            .map(|e| {
                (
                    e.id.clone(),
                    conflict::detect_event_conflicts(e, &self.events, &self.config),
                )
            })
            .collect();

        for (id, found) in fresh {
            if let Some(event) = self.events.get_mut(&id) {
                let previous = std::mem::take(&mut event.conflicts);
                event.conflicts = conflict::merge_resolution_state(&previous, found);
            }
        }

        let distinct = self.conflicts();
        info!(
            events = self.events.len(),
            conflicts = distinct.len(),
            "conflict rescan complete"
        );
        distinct
    }

    /// Findings across the store, de-duplicated by id.
    pub fn conflicts(&self) -> Vec<TimelineConflict> {
        stats::distinct_conflicts(self.events.values())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Mark every copy of a finding resolved. Returns whether any was found.
    pub fn resolve_conflict(&mut self, conflict_id: &str, resolution: impl Into<String>) -> bool {
        let resolution = resolution.into();
        self.update_conflicts(conflict_id, |c| {
            c.resolved = true;
            c.resolution = Some(resolution.clone());
        })
    }

    /// Mark every copy of a finding ignored. Returns whether any was found.
    pub fn ignore_conflict(&mut self, conflict_id: &str) -> bool {
        self.update_conflicts(conflict_id, |c| c.ignored_by_user = true)
    }

    fn update_conflicts<F>(&mut self, conflict_id: &str, mut apply: F) -> bool
    where
        F: FnMut(&mut TimelineConflict),
    {
        let mut touched = false;
        for conflict in self
            .events
            .values_mut()
            .flat_map(|e| e.conflicts.iter_mut())
            .filter(|c| c.id == conflict_id)
        {
            apply(conflict);
            touched = true;
        }
        touched
    }
}
