//! Schedule scraping from the school website.
//!
//! The site publishes one page with a heading plus two tables (one per
//! school shift) for every day of the current stretch. [`HtmlScheduleScraper`]
//! fetches the page and turns the two tables for a requested date into one
//! [`DaySchedule`].
//!
//! Validation failures are ordinary values, not panics: the distribution
//! scheduler treats them as "nothing to do this tick" and retries on the
//! next timer fire.

pub mod tables;

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use scraper::{ElementRef, Html, Selector};

use crate::config::BotConfig;
use crate::models::{
    dates::{is_weekend, within_publication_window},
    DaySchedule,
};
use tables::{expand_spans, table_to_courses, Cell};

/// Result type for scrape operations.
pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// Error type for scrape operations.
///
/// The validation variants describe expected conditions (weekend, schedule
/// not published yet) and abort only the current attempt.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("No lessons are scheduled on weekends")]
    NoLessonsScheduled,

    #[error("Schedule for {date} has not been published yet")]
    NotYetPublished { date: NaiveDate },

    #[error("Course {0} is not present in the published schedule")]
    UnknownCourse(String),

    #[error("Schedule page request failed: {0}")]
    Fetch(String),

    #[error("Schedule page has unexpected markup: {0}")]
    Malformed(String),
}

impl ScrapeError {
    /// True for expected validation outcomes that should skip the current
    /// tick quietly instead of being logged as failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScrapeError::NoLessonsScheduled
                | ScrapeError::NotYetPublished { .. }
                | ScrapeError::UnknownCourse(_)
        )
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Fetch(err.to_string())
    }
}

/// Source of per-day schedules, abstracted for testing.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Fetch the schedule for one date.
    async fn fetch(&self, date: NaiveDate) -> ScrapeResult<DaySchedule>;
}

/// Check that a date can have a published schedule at all.
///
/// Weekends never have lessons; dates outside the current-or-next calendar
/// month are not published yet.
pub fn validate_date(date: NaiveDate, today: NaiveDate) -> ScrapeResult<()> {
    if is_weekend(date) {
        return Err(ScrapeError::NoLessonsScheduled);
    }
    if !within_publication_window(date, today) {
        return Err(ScrapeError::NotYetPublished { date });
    }
    Ok(())
}

/// Ordered lesson list of one course, or `UnknownCourse`.
pub fn course_lessons<'a>(schedule: &'a DaySchedule, course: &str) -> ScrapeResult<&'a [String]> {
    schedule
        .lessons(course)
        .ok_or_else(|| ScrapeError::UnknownCourse(course.to_string()))
}

struct Selectors {
    headings: Selector,
    tables: Selector,
    rows: Selector,
    cells: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            headings: Selector::parse("h2").unwrap(),
            tables: Selector::parse("tbody").unwrap(),
            rows: Selector::parse("tr").unwrap(),
            cells: Selector::parse("th, td").unwrap(),
        }
    }
}

/// Scraper fetching the live schedule page over HTTP.
pub struct HtmlScheduleScraper {
    client: reqwest::Client,
    url: String,
    heading_keyword: String,
}

impl HtmlScheduleScraper {
    pub fn new(config: &BotConfig) -> ScrapeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| ScrapeError::Fetch(e.to_string()))?;

        Ok(Self {
            client,
            url: config.schedule_url.clone(),
            heading_keyword: config.heading_keyword.clone(),
        })
    }
}

#[async_trait]
impl ScheduleSource for HtmlScheduleScraper {
    async fn fetch(&self, date: NaiveDate) -> ScrapeResult<DaySchedule> {
        validate_date(date, Local::now().date_naive())?;

        let html = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_day_schedule(&html, date, &self.heading_keyword)
    }
}

/// Parse the schedule page and extract the two shift tables for `date`.
pub fn parse_day_schedule(
    html: &str,
    date: NaiveDate,
    heading_keyword: &str,
) -> ScrapeResult<DaySchedule> {
    let doc = Html::parse_document(html);
    let selectors = Selectors::new();

    let days = day_headings(&doc, &selectors, heading_keyword);
    let pos = days
        .iter()
        .position(|day| *day == date.day())
        .ok_or(ScrapeError::NotYetPublished { date })?;

    let tables: Vec<ElementRef> = doc
        .select(&selectors.tables)
        .filter(|tbody| !element_text(tbody).trim().is_empty())
        .collect();

    // Two tables per published day, one per school shift.
    let first = tables
        .get(pos * 2)
        .ok_or_else(|| ScrapeError::Malformed(format!("missing shift tables for day {}", date.day())))?;
    let second = tables.get(pos * 2 + 1).ok_or_else(|| {
        ScrapeError::Malformed(format!("missing second shift table for day {}", date.day()))
    })?;

    let mut schedule = DaySchedule::new();
    for tbody in [first, second] {
        let grid = expand_spans(&extract_cells(tbody, &selectors));
        for (course, lessons) in table_to_courses(&grid) {
            if schedule.insert(course.clone(), lessons).is_some() {
                tracing::warn!(
                    course = %course,
                    "course appears in both shift tables, keeping the later row"
                );
            }
        }
    }

    Ok(schedule)
}

/// Day-of-month numbers announced by the page headings, in document order.
fn day_headings(doc: &Html, selectors: &Selectors, keyword: &str) -> Vec<u32> {
    doc.select(&selectors.headings)
        .filter_map(|h| {
            let text = element_text(&h);
            if !text.contains(keyword) {
                return None;
            }
            let tokens: Vec<&str> = text.split_whitespace().collect();
            // The day-of-month is the second-to-last token of the heading.
            tokens
                .len()
                .checked_sub(2)
                .and_then(|i| tokens[i].parse().ok())
        })
        .collect()
}

fn extract_cells(tbody: &ElementRef, selectors: &Selectors) -> Vec<Vec<Cell>> {
    tbody
        .select(&selectors.rows)
        .map(|tr| {
            tr.select(&selectors.cells)
                .map(|cell| Cell {
                    text: cell_text(&cell),
                    colspan: span_attr(&cell, "colspan"),
                    rowspan: span_attr(&cell, "rowspan"),
                })
                .collect()
        })
        .collect()
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>()
}

fn cell_text(el: &ElementRef) -> String {
    element_text(el)
        .replace('\n', "")
        .replace('\u{a0}', "")
        .trim()
        .to_string()
}

fn span_attr(el: &ElementRef, name: &str) -> usize {
    el.value()
        .attr(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
}
