//! Human-readable rendering of [`TimelineDate`]s.

use crate::date::{CalendarFields, DateValue, Precision, TimelineDate};

const UNKNOWN_DATE: &str = "Unknown date";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English name of a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_NAMES.get(index).copied()
}

/// Render a date for display.
///
/// `displayText` wins verbatim. Otherwise the output depends on precision:
///
/// - `exact` / `day`: `14 March 1850`, plus ` HH:MM` for `exact` with an hour
/// - `month`: `March 1850`
/// - `year` / `decade` / `century`: `1850`
/// - custom calendar: `[day] [month] Year N [of Era]`
/// - `relative`: the relative description
/// - anything else: `Unknown date`
///
/// Approximate dates are prefixed with `~`.
pub fn format_date(date: &TimelineDate) -> String {
    if let Some(text) = &date.display_text {
        return text.clone();
    }

    let body = match &date.value {
        DateValue::Unknown => None,
        DateValue::Relative(rel) => rel.relative_description.clone(),
        value => value
            .calendar()
            .and_then(|fields| format_calendar(value.precision(), fields)),
    }
    .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    if date.is_approximate {
        format!("~{}", body)
    } else {
        body
    }
}

fn format_calendar(precision: Precision, fields: &CalendarFields) -> Option<String> {
    if fields.is_custom() {
        return Some(format_custom(fields));
    }
    let year = fields.year?;
    let month = fields
        .month
        .and_then(|m| u32::try_from(m).ok())
        .and_then(month_name);

    let rendered = match precision {
        Precision::Exact | Precision::Day => {
            let mut out = match (fields.day, month) {
                (Some(day), Some(month)) => format!("{} {} {}", day, month, year),
                (None, Some(month)) => format!("{} {}", month, year),
                _ => year.to_string(),
            };
            if precision == Precision::Exact {
                if let Some(hour) = fields.hour {
                    out.push_str(&format!(" {:02}:{:02}", hour, fields.minute.unwrap_or(0)));
                }
            }
            out
        }
        Precision::Month => match month {
            Some(month) => format!("{} {}", month, year),
            None => year.to_string(),
        },
        _ => year.to_string(),
    };
    Some(rendered)
}

fn format_custom(fields: &CalendarFields) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(day) = &fields.custom_day {
        parts.push(day.clone());
    }
    if let Some(month) = &fields.custom_month {
        parts.push(month.clone());
    }
    match (fields.custom_year, &fields.custom_era) {
        (Some(year), Some(era)) => parts.push(format!("Year {} of {}", year, era)),
        (Some(year), None) => parts.push(format!("Year {}", year)),
        (None, Some(era)) => parts.push(era.clone()),
        (None, None) => {}
    }
    parts.join(" ")
}
