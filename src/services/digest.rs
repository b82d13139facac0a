//! Digest building: merging a scraped schedule with collected homework.
//!
//! The lesson names on the school website and the lesson tags on the chat
//! channels are two independently maintained vocabularies. They are joined
//! loosely: a homework section is attached when the first three characters
//! of its lesson label occur, case-insensitively, anywhere in the rendered
//! schedule text. Accidental substring collisions are an accepted limitation
//! of that join, not something to tighten here.

use chrono::NaiveDate;

use crate::config::BotConfig;
use crate::gateway::{Embed, OutgoingMessage};
use crate::models::{
    daily_title, dates::format_short, weekly_title, Digest, HomeworkByDate, HomeworkItem,
    WeekDigest,
};

/// Number of label characters used for the schedule/homework join.
const LABEL_JOIN_LEN: usize = 3;

/// Line shown for a weekly digest day nobody posted homework for.
const NO_HOMEWORK_PLACEHOLDER: &str = "Nothing assigned yet";

/// Renders digests out of scraped lessons and collected homework.
pub struct DigestBuilder {
    attachment_phrase: String,
    schedule_url: String,
}

impl DigestBuilder {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            attachment_phrase: config.attachment_phrase.clone(),
            schedule_url: config.schedule_url.clone(),
        }
    }

    /// Render the schedule lines for one course.
    ///
    /// Periods are numbered by array position; blank periods contribute no
    /// line but never shift the numbers of later lessons.
    pub fn schedule_lines(lessons: &[String]) -> String {
        lessons
            .iter()
            .enumerate()
            .filter(|(_, lesson)| !lesson.trim().is_empty())
            .map(|(i, lesson)| format!("`{}` {}", i + 1, lesson.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build the daily digest for one course and its collected homework.
    pub fn build_daily(
        &self,
        date: NaiveDate,
        lessons: &[String],
        homework: &[HomeworkItem],
    ) -> Digest {
        let schedule_body = Self::schedule_lines(lessons);
        let sections = self.daily_sections(&schedule_body, homework);

        Digest {
            date,
            title: daily_title(date),
            schedule_body,
            sections,
        }
    }

    /// Homework sections for an already-rendered schedule body.
    ///
    /// Used both when building a fresh digest and when the refresh flow
    /// rebuilds sections under an existing message's schedule text.
    pub fn daily_sections(
        &self,
        schedule_body: &str,
        homework: &[HomeworkItem],
    ) -> Vec<(String, String)> {
        let haystack = schedule_body.to_lowercase();

        homework
            .iter()
            .filter(|item| {
                let needle: String = item
                    .lesson_label
                    .to_lowercase()
                    .chars()
                    .take(LABEL_JOIN_LEN)
                    .collect();
                !needle.is_empty() && haystack.contains(&needle)
            })
            .filter_map(|item| {
                let content = self.section_content(item);
                (!content.is_empty()).then(|| (item.lesson_label.clone(), content))
            })
            .collect()
    }

    /// Build the weekly homework digest for an inclusive date range.
    pub fn build_weekly(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        by_date: &HomeworkByDate,
    ) -> WeekDigest {
        let sections = by_date
            .iter()
            .map(|(date, items)| {
                let mut value = String::new();
                for item in items {
                    let content = self.section_content(item);
                    if !content.is_empty() {
                        value.push_str(&format!("**{}**\n{}\n", item.lesson_label, content));
                    }
                }
                if value.is_empty() {
                    value = NO_HOMEWORK_PLACEHOLDER.to_string();
                }
                (format_short(*date), value)
            })
            .collect();

        WeekDigest {
            start,
            end,
            title: weekly_title(start, end),
            sections,
        }
    }

    /// Section text for one homework item: body, then the attachment list.
    fn section_content(&self, item: &HomeworkItem) -> String {
        let mut content = item.body.trim().to_string();

        if !item.attachment_links.is_empty() {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str(&self.attachment_phrase);
            content.push(' ');
            let links: Vec<String> = item
                .attachment_links
                .iter()
                .enumerate()
                .map(|(i, link)| format!("[#{}]({})", i + 1, link))
                .collect();
            content.push_str(&links.join(", "));
        }

        content
    }

    /// Embed form of a daily digest.
    pub fn daily_embed(&self, digest: &Digest) -> Embed {
        Embed {
            title: digest.title.clone(),
            description: digest.schedule_body.clone(),
            url: Some(self.schedule_url.clone()),
            fields: digest.sections.clone(),
        }
    }

    /// Embed form of a weekly digest.
    pub fn weekly_embed(&self, digest: &WeekDigest) -> Embed {
        Embed {
            title: digest.title.clone(),
            description: String::new(),
            url: None,
            fields: digest.sections.clone(),
        }
    }

    /// Postable message for a daily digest.
    pub fn daily_message(&self, digest: &Digest) -> OutgoingMessage {
        OutgoingMessage::from_embed(self.daily_embed(digest))
    }

    /// Postable message for a weekly digest.
    pub fn weekly_message(&self, digest: &WeekDigest) -> OutgoingMessage {
        OutgoingMessage::from_embed(self.weekly_embed(digest))
    }
}
