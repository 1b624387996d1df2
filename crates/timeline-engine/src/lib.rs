//! # timeline-engine
//!
//! Chronology tracking for long-form writing projects: scenes, character
//! life-events, plot points and historical facts placed on a story timeline.
//!
//! Story dates are often partial ("spring 1850"), approximate, written in an
//! invented calendar, or simply unknown. The engine represents all of these in
//! one [`TimelineDate`] type whose comparison is a **partial order**: dates
//! that cannot be placed on a line compare as
//! [`DateOrdering::Incomparable`] rather than being forced into an ordering.
//!
//! ## Quick start
//!
//! ```rust
//! use timeline_engine::{
//!     ConflictType, EventPatch, EventType, Importance, TimelineDate, TimelineManager,
//! };
//!
//! let mut timeline = TimelineManager::new();
//! let ball = timeline
//!     .create_event("The ball", EventType::Scene, TimelineDate::day(1813, 1, 28), Importance::Major)
//!     .id
//!     .clone();
//! let duel = timeline
//!     .create_event("The duel", EventType::Scene, TimelineDate::day(1813, 1, 28), Importance::Critical)
//!     .id
//!     .clone();
//! timeline.update_event(&ball, EventPatch::new().characters(["elizabeth"]));
//! timeline.update_event(&duel, EventPatch::new().characters(["elizabeth"]));
//!
//! let found = timeline.detect_all_conflicts();
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].conflict_type, ConflictType::OverlappingEvents);
//! ```
//!
//! ## Modules
//!
//! - [`date`] — `TimelineDate`, the partial order, durations
//! - [`format`] — human-readable date rendering
//! - [`event`] — `TimelineEvent` and the `EventPatch` partial update
//! - [`manager`] — the event store: CRUD, cascade delete, hierarchy, views
//! - [`conflict`] — consistency rules and finding merge
//! - [`query`] — chronological sort, filtering, relevance search
//! - [`stats`] — aggregate statistics
//! - [`error`] — Error types

pub mod conflict;
pub mod date;
pub mod error;
pub mod event;
pub mod format;
pub mod manager;
pub mod query;
pub mod stats;

pub use conflict::{ConflictType, DetectorConfig, Severity, TimelineConflict};
pub use date::{
    calculate_duration, compare_dates, days_in_month, CalendarFields, DateOrdering, DateValue,
    Precision, RelativeDate, TimelineDate,
};
pub use error::TimelineError;
pub use event::{EventPatch, EventType, Importance, TimelineEvent};
pub use format::format_date;
pub use manager::TimelineManager;
pub use query::{filter_events, search_events, sort_events, DateRange, EventFilter, SearchHit};
pub use stats::TimelineStatistics;
