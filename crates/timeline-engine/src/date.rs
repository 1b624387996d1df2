//! Story-time dates and their partial order.
//!
//! A [`TimelineDate`] is a tagged union over [`Precision`]. Dates that carry a
//! standard `year` or a custom-calendar `customYear` reduce to a scalar number
//! of days since 1970-01-01 and can be ordered against each other. Dates with
//! `unknown` precision, and `relative` dates that were never resolved to an
//! anchor, have no scalar: comparing them yields [`DateOrdering::Incomparable`]
//! instead of an arbitrary answer.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Two scalars closer than this many days compare as [`DateOrdering::Equal`].
pub const SAME_DAY_TOLERANCE: f64 = 1.0;

/// Coarse length of a custom-calendar year, in days.
pub const CUSTOM_YEAR_DAYS: f64 = 365.0;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// The granularity at which a date is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Precision {
    Exact,
    Day,
    Month,
    Year,
    Decade,
    Century,
    Relative,
    Unknown,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Exact => "exact",
            Precision::Day => "day",
            Precision::Month => "month",
            Precision::Year => "year",
            Precision::Decade => "decade",
            Precision::Century => "century",
            Precision::Relative => "relative",
            Precision::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard and custom-calendar fields shared by every absolute precision.
///
/// Which standard fields are populated follows the precision (a `month` date
/// supplies `year` and `month` only). Custom-calendar fields may be used
/// alongside or instead of the standard ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Signed so out-of-range input loads and is reported as a conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_era: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_year: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_day: Option<String>,
}

impl CalendarFields {
    /// True when the fields describe an invented calendar rather than the
    /// standard one.
    pub fn is_custom(&self) -> bool {
        self.year.is_none()
            && (self.custom_year.is_some()
                || self.custom_era.is_some()
                || self.custom_month.is_some()
                || self.custom_day.is_some())
    }

    /// Days since 1970-01-01 for the standard fields, falling back to the
    /// coarse custom-year approximation.
    ///
    /// Missing (or zero) month and day default to 1, missing time of day to
    /// midnight. Out-of-range months and days roll over into neighbouring
    /// months or years the way a host calendar constructor does.
    pub fn scalar_days(&self) -> Option<f64> {
        if let Some(year) = self.year {
            return calendar_days(
                year,
                self.month.filter(|m| *m != 0).unwrap_or(1),
                self.day.filter(|d| *d != 0).unwrap_or(1),
                self.hour.unwrap_or(0),
                self.minute.unwrap_or(0),
            );
        }
        self.custom_year.map(|y| y as f64 * CUSTOM_YEAR_DAYS)
    }
}

/// Fields of a date expressed relative to another event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeDate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_to_event_id: Option<String>,
    /// Offset from the anchor event's start, in days. May be fractional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_description: Option<String>,
}

/// The precision-discriminated payload of a [`TimelineDate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "precision", rename_all = "kebab-case")]
pub enum DateValue {
    Exact(CalendarFields),
    Day(CalendarFields),
    Month(CalendarFields),
    Year(CalendarFields),
    Decade(CalendarFields),
    Century(CalendarFields),
    Relative(RelativeDate),
    Unknown,
}

impl DateValue {
    pub fn precision(&self) -> Precision {
        match self {
            DateValue::Exact(_) => Precision::Exact,
            DateValue::Day(_) => Precision::Day,
            DateValue::Month(_) => Precision::Month,
            DateValue::Year(_) => Precision::Year,
            DateValue::Decade(_) => Precision::Decade,
            DateValue::Century(_) => Precision::Century,
            DateValue::Relative(_) => Precision::Relative,
            DateValue::Unknown => Precision::Unknown,
        }
    }

    /// Calendar fields, for every precision that has them.
    pub fn calendar(&self) -> Option<&CalendarFields> {
        match self {
            DateValue::Exact(f)
            | DateValue::Day(f)
            | DateValue::Month(f)
            | DateValue::Year(f)
            | DateValue::Decade(f)
            | DateValue::Century(f) => Some(f),
            DateValue::Relative(_) | DateValue::Unknown => None,
        }
    }
}

/// One point, or a fuzzy region, in story or real time.
///
/// Serialized as a flat camelCase object tagged by `"precision"`:
///
/// ```
/// use timeline_engine::TimelineDate;
///
/// let date: TimelineDate =
///     serde_json::from_str(r#"{"precision":"month","year":1850,"month":3,"isApproximate":true}"#)
///         .unwrap();
/// assert_eq!(date, TimelineDate::month(1850, 3).approximate());
/// ```
///
/// Only the fields belonging to the precision survive a round trip: calendar
/// fields on an `unknown` or `relative` date are dropped on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDate {
    #[serde(flatten)]
    pub value: DateValue,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_approximate: bool,
    /// Author's confidence in the date, 0 to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Human-authored override that short-circuits formatting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
}

impl TimelineDate {
    pub fn new(value: DateValue) -> Self {
        Self {
            value,
            is_approximate: false,
            confidence: None,
            display_text: None,
        }
    }

    pub fn exact(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        Self::new(DateValue::Exact(CalendarFields {
            year: Some(year),
            month: Some(i64::from(month)),
            day: Some(i64::from(day)),
            hour: Some(hour),
            minute: Some(minute),
            ..CalendarFields::default()
        }))
    }

    pub fn day(year: i32, month: u32, day: u32) -> Self {
        Self::new(DateValue::Day(CalendarFields {
            year: Some(year),
            month: Some(i64::from(month)),
            day: Some(i64::from(day)),
            ..CalendarFields::default()
        }))
    }

    pub fn month(year: i32, month: u32) -> Self {
        Self::new(DateValue::Month(CalendarFields {
            year: Some(year),
            month: Some(i64::from(month)),
            ..CalendarFields::default()
        }))
    }

    pub fn year(year: i32) -> Self {
        Self::new(DateValue::Year(CalendarFields {
            year: Some(year),
            ..CalendarFields::default()
        }))
    }

    pub fn decade(year: i32) -> Self {
        Self::new(DateValue::Decade(CalendarFields {
            year: Some(year),
            ..CalendarFields::default()
        }))
    }

    pub fn century(year: i32) -> Self {
        Self::new(DateValue::Century(CalendarFields {
            year: Some(year),
            ..CalendarFields::default()
        }))
    }

    /// A year in an invented calendar, e.g. `custom_year("the Third Age", 3019)`.
    pub fn custom_year(era: impl Into<String>, year: i64) -> Self {
        Self::new(DateValue::Year(CalendarFields {
            custom_era: Some(era.into()),
            custom_year: Some(year),
            ..CalendarFields::default()
        }))
    }

    /// A date `offset_days` after the start of the anchor event.
    pub fn relative(anchor_event_id: impl Into<String>, offset_days: i64) -> Self {
        Self::new(DateValue::Relative(RelativeDate {
            relative_to_event_id: Some(anchor_event_id.into()),
            relative_offset: Some(offset_days as f64),
            relative_description: None,
        }))
    }

    pub fn unknown() -> Self {
        Self::new(DateValue::Unknown)
    }

    pub fn approximate(mut self) -> Self {
        self.is_approximate = true;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_display_text(mut self, text: impl Into<String>) -> Self {
        self.display_text = Some(text.into());
        self
    }

    /// Attach a free-text description to a relative date. No-op otherwise.
    pub fn with_relative_description(mut self, text: impl Into<String>) -> Self {
        if let DateValue::Relative(rel) = &mut self.value {
            rel.relative_description = Some(text.into());
        }
        self
    }

    pub fn precision(&self) -> Precision {
        self.value.precision()
    }

    pub fn calendar(&self) -> Option<&CalendarFields> {
        self.value.calendar()
    }

    /// The position of this date on the timeline in days since 1970-01-01,
    /// or `None` when the date cannot be placed.
    pub fn scalar_days(&self) -> Option<f64> {
        self.calendar().and_then(CalendarFields::scalar_days)
    }

    /// Whether the date can be placed on the timeline at all.
    pub fn is_placeable(&self) -> bool {
        self.scalar_days().is_some()
    }
}

/// Result of comparing two [`TimelineDate`]s: a partial order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateOrdering {
    Less,
    Equal,
    Greater,
    Incomparable,
}

impl DateOrdering {
    pub fn is_incomparable(self) -> bool {
        self == DateOrdering::Incomparable
    }

    /// `Less` or `Equal`. `Incomparable` is never "at most".
    pub fn is_le(self) -> bool {
        matches!(self, DateOrdering::Less | DateOrdering::Equal)
    }

    /// `Greater` or `Equal`. `Incomparable` is never "at least".
    pub fn is_ge(self) -> bool {
        matches!(self, DateOrdering::Greater | DateOrdering::Equal)
    }

    pub fn reverse(self) -> Self {
        match self {
            DateOrdering::Less => DateOrdering::Greater,
            DateOrdering::Greater => DateOrdering::Less,
            other => other,
        }
    }

    pub fn to_ordering(self) -> Option<Ordering> {
        match self {
            DateOrdering::Less => Some(Ordering::Less),
            DateOrdering::Equal => Some(Ordering::Equal),
            DateOrdering::Greater => Some(Ordering::Greater),
            DateOrdering::Incomparable => None,
        }
    }
}

/// Compare two dates.
///
/// `unknown` precision on either side, or a side without a standard or custom
/// year, yields [`DateOrdering::Incomparable`]. Scalars less than
/// [`SAME_DAY_TOLERANCE`] apart are `Equal`.
pub fn compare_dates(a: &TimelineDate, b: &TimelineDate) -> DateOrdering {
    if a.precision() == Precision::Unknown || b.precision() == Precision::Unknown {
        return DateOrdering::Incomparable;
    }
    match (a.scalar_days(), b.scalar_days()) {
        (Some(x), Some(y)) => compare_scalars(x, y),
        _ => DateOrdering::Incomparable,
    }
}

fn compare_scalars(x: f64, y: f64) -> DateOrdering {
    let diff = x - y;
    if diff.abs() < SAME_DAY_TOLERANCE {
        DateOrdering::Equal
    } else if diff < 0.0 {
        DateOrdering::Less
    } else {
        DateOrdering::Greater
    }
}

/// Absolute distance between two dates in days, or `None` when they are
/// incomparable.
pub fn calculate_duration(start: &TimelineDate, end: &TimelineDate) -> Option<f64> {
    if compare_dates(start, end).is_incomparable() {
        return None;
    }
    Some((end.scalar_days()? - start.scalar_days()?).abs())
}

/// Number of days in `month` of `year` on the proleptic Gregorian calendar.
///
/// Returns `None` for a month outside 1–12 or a year chrono cannot represent.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// Convert a calendar instant into fractional days since 1970-01-01.
fn calendar_days(year: i32, month: i64, day: i64, hour: u32, minute: u32) -> Option<f64> {
    let total_months = i64::from(year)
        .checked_mul(12)?
        .checked_add(month)?
        .checked_sub(1)?;
    let y = i32::try_from(total_months.div_euclid(12)).ok()?;
    let m = u32::try_from(total_months.rem_euclid(12)).ok()? + 1;
    let first = NaiveDate::from_ymd_opt(y, m, 1)?;
    let shift = day.checked_sub(1)?;
    let date = if shift >= 0 {
        first.checked_add_days(Days::new(shift.unsigned_abs()))?
    } else {
        first.checked_sub_days(Days::new(shift.unsigned_abs()))?
    };
    let whole = i64::from(date.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE;
    Some(whole as f64 + f64::from(hour) / 24.0 + f64::from(minute) / 1440.0)
}

/// Build a `day`-precision date from a scalar produced by [`TimelineDate::scalar_days`].
pub(crate) fn date_from_scalar(days: f64) -> Option<TimelineDate> {
    if !days.is_finite() {
        return None;
    }
    let whole = days.floor() as i64 + UNIX_EPOCH_DAYS_FROM_CE;
    let date = NaiveDate::from_num_days_from_ce_opt(i32::try_from(whole).ok()?)?;
    Some(TimelineDate::day(date.year(), date.month(), date.day()))
}
