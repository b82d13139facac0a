//! Digest data model: scraped schedules, collected homework, digest titles.
//!
//! A digest's title doubles as its identity on the chat platform: it embeds
//! the target date (or date range), which lets later ticks detect an already
//! posted digest and lets the refresh flow recover the date from a message
//! it did not create. Title building and parsing must therefore round-trip.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates::{first_date_token, format_short, weekday_name};

/// Prefix distinguishing weekly homework digests from daily digests.
pub const WEEKLY_TITLE_PREFIX: &str = "Homework";

/// One day's lesson table scraped from the school website.
///
/// Lesson lists keep blank periods as empty strings so a lesson's index is
/// always its period number minus one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaySchedule {
    courses: HashMap<String, Vec<String>>,
}

impl DaySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a course row, returning the previous lesson list when the
    /// course was already present (shift-table collision).
    pub fn insert(&mut self, course: impl Into<String>, lessons: Vec<String>) -> Option<Vec<String>> {
        self.courses.insert(course.into(), lessons)
    }

    /// Ordered lesson list for a course, if the course is present.
    pub fn lessons(&self, course: &str) -> Option<&[String]> {
        self.courses.get(course).map(|l| l.as_slice())
    }

    pub fn courses(&self) -> impl Iterator<Item = &str> {
        self.courses.keys().map(|c| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

/// One homework post collected from a lesson-tagged channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeworkItem {
    /// Display label of the lesson the source channel is bound to
    pub lesson_label: String,
    /// Message text with the marker line stripped
    pub body: String,
    /// Attachment URLs in post order
    pub attachment_links: Vec<String>,
    /// Permalink to the source message
    pub permalink: String,
}

/// Homework grouped per calendar day; every requested day is present even
/// when nothing was collected for it.
pub type HomeworkByDate = BTreeMap<NaiveDate, Vec<HomeworkItem>>;

/// A postable daily digest: rendered schedule plus homework sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub date: NaiveDate,
    pub title: String,
    /// Rendered schedule lines, one per non-blank period
    pub schedule_body: String,
    /// Homework sections in collection order: (lesson label, content)
    pub sections: Vec<(String, String)>,
}

/// A postable weekly homework digest with one section per school day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekDigest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub title: String,
    /// Per-day sections in date order: (day label, content)
    pub sections: Vec<(String, String)>,
}

/// What kind of digest a posted message's title encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Daily(NaiveDate),
    Weekly(NaiveDate, NaiveDate),
}

/// Title of a daily digest, e.g. `Tuesday 17.09.24`.
pub fn daily_title(date: NaiveDate) -> String {
    format!("{} {}", weekday_name(date), format_short(date))
}

/// Title of a weekly homework digest, e.g. `Homework 23.09.24 to 27.09.24`.
pub fn weekly_title(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{} {} to {}",
        WEEKLY_TITLE_PREFIX,
        format_short(start),
        format_short(end)
    )
}

/// Recover the digest kind and date(s) from a posted message's title.
///
/// Returns `None` for titles this pipeline did not produce.
pub fn parse_title(title: &str) -> Option<DigestKind> {
    if title.starts_with(WEEKLY_TITLE_PREFIX) {
        let mut dates = title
            .split_whitespace()
            .filter_map(|token| super::dates::parse_short(token));
        let start = dates.next()?;
        let end = dates.next()?;
        return Some(DigestKind::Weekly(start, end));
    }

    first_date_token(title).map(DigestKind::Daily)
}
