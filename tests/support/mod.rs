//! Shared fixtures for integration tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;

use classbot::config::BotConfig;
use classbot::models::{dates::is_weekend, DaySchedule};
use classbot::scraper::{ScheduleSource, ScrapeError, ScrapeResult};

/// Schedule source backed by a map of published days.
///
/// Mirrors the live scraper's validation behavior: weekends are rejected
/// outright and unpublished days yield `NotYetPublished`.
#[derive(Default)]
pub struct FakeScheduleSource {
    published: RwLock<HashMap<NaiveDate, DaySchedule>>,
}

impl FakeScheduleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a schedule for one day.
    pub fn publish(&self, date: NaiveDate, schedule: DaySchedule) {
        self.published.write().insert(date, schedule);
    }
}

#[async_trait]
impl ScheduleSource for FakeScheduleSource {
    async fn fetch(&self, date: NaiveDate) -> ScrapeResult<DaySchedule> {
        if is_weekend(date) {
            return Err(ScrapeError::NoLessonsScheduled);
        }
        self.published
            .read()
            .get(&date)
            .cloned()
            .ok_or(ScrapeError::NotYetPublished { date })
    }
}

/// Configuration used across integration tests.
pub fn test_config() -> BotConfig {
    BotConfig {
        schedule_url: "https://school.example/timetable".to_string(),
        ..Default::default()
    }
}

/// A one-course schedule for a single day.
pub fn schedule_with(course: &str, lessons: &[&str]) -> DaySchedule {
    let mut schedule = DaySchedule::new();
    schedule.insert(course, lessons.iter().map(|l| l.to_string()).collect());
    schedule
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
