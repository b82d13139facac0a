//! School calendar helpers.
//!
//! All dates exchanged with the chat platform are rendered in the short
//! `DD.MM.YY` form; digests additionally carry the weekday name. The helpers
//! here are pure so the target-date rules can be tested without a clock.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Short date format used in homework posts and digest titles.
pub const SHORT_FORMAT: &str = "%d.%m.%y";

/// Render a date in the short `DD.MM.YY` form.
pub fn format_short(date: NaiveDate) -> String {
    date.format(SHORT_FORMAT).to_string()
}

/// Parse a `DD.MM.YY` date.
pub fn parse_short(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, SHORT_FORMAT).ok()
}

/// Find the first whitespace-separated token of `text` that parses as a
/// `DD.MM.YY` date.
pub fn first_date_token(text: &str) -> Option<NaiveDate> {
    text.split_whitespace().find_map(parse_short)
}

/// Display name of a date's weekday.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// True for Saturday and Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The next day lessons take place: tomorrow, advanced to Monday when
/// tomorrow falls on a weekend.
pub fn next_school_day(today: NaiveDate) -> NaiveDate {
    let mut date = today + Days::new(1);
    let from_monday = date.weekday().num_days_from_monday() as u64;
    if from_monday > 4 {
        date = date + Days::new(7 - from_monday);
    }
    date
}

/// Monday and Friday of the school week following `today`.
///
/// Matches the weekly distribution rule: fired on a Friday, the range starts
/// three days later (Monday) and spans five school days.
pub fn school_week_after(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today + Days::new(3);
    (start, start + Days::new(4))
}

/// Inclusive list of calendar days between `start` and `end`.
///
/// Returns just `start` when `end` precedes it.
pub fn day_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = vec![start];
    let mut current = start;
    while current < end {
        current = current + Days::new(1);
        days.push(current);
    }
    days
}

/// Whether `date` falls in the current or the next calendar month
/// relative to `today`, wrapping across the year end.
pub fn within_publication_window(date: NaiveDate, today: NaiveDate) -> bool {
    let current = (today.year(), today.month());
    let next = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    let target = (date.year(), date.month());
    target == current || target == next
}
