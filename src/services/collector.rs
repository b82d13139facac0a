//! Homework collection from lesson-tagged channels.
//!
//! Users post homework into per-lesson channels as a message whose first
//! line carries the homework marker and the target date in `DD.MM.YY` form;
//! the rest of the message is the assignment text, with files attached as
//! needed. The collector scans each bound channel's recent history for such
//! posts.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use super::{PipelineError, PipelineResult};
use crate::config::BotConfig;
use crate::db::BindingRepository;
use crate::gateway::{ChatGateway, ChatMessage, GatewayError};
use crate::models::{
    dates::{day_range, first_date_token},
    GuildId, HomeworkByDate, HomeworkItem,
};
use crate::scraper::tables::title_case;

/// Collects homework posts for one or more dates from a guild's bound
/// channels.
pub struct HomeworkCollector {
    gateway: Arc<dyn ChatGateway>,
    repository: Arc<dyn BindingRepository>,
    marker: String,
    history_limit: usize,
}

impl HomeworkCollector {
    pub fn new(
        config: &BotConfig,
        gateway: Arc<dyn ChatGateway>,
        repository: Arc<dyn BindingRepository>,
    ) -> Self {
        Self {
            gateway,
            repository,
            marker: config.homework_marker.to_lowercase(),
            history_limit: config.history_limit,
        }
    }

    /// Collect homework for a single date.
    pub async fn collect(
        &self,
        guild: GuildId,
        date: NaiveDate,
    ) -> PipelineResult<Vec<HomeworkItem>> {
        let mut by_date = self.collect_range(guild, date, date).await?;
        Ok(by_date.remove(&date).unwrap_or_default())
    }

    /// Collect homework for every day in the inclusive `start..=end` range.
    ///
    /// Every requested day is present in the result; days nobody posted for
    /// map to an empty list. At most one item is collected per channel and
    /// day, and scanning a channel stops once its messages fall behind the
    /// range start.
    pub async fn collect_range(
        &self,
        guild: GuildId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PipelineResult<HomeworkByDate> {
        let bindings = self.repository.lesson_channels(guild).await?;
        let days = day_range(start, end);

        let mut by_date: HomeworkByDate = days.iter().map(|d| (*d, Vec::new())).collect();

        for binding in bindings {
            let history = match self
                .gateway
                .channel_history(binding.channel, self.history_limit)
                .await
            {
                Ok(history) => history,
                Err(GatewayError::ChannelNotFound(channel)) => {
                    warn!(%channel, lesson = %binding.lesson, "bound channel missing, skipping");
                    continue;
                }
                Err(e) => return Err(PipelineError::Gateway(e)),
            };

            let label = title_case(&binding.lesson);
            let mut remaining: BTreeSet<NaiveDate> = days.iter().copied().collect();

            for message in &history {
                let Some(date) = self.match_homework(message) else {
                    continue;
                };
                if remaining.remove(&date) {
                    if let Some(items) = by_date.get_mut(&date) {
                        items.push(homework_item(&label, message));
                    }
                    if remaining.is_empty() {
                        break;
                    }
                } else if date < start {
                    // History is newest first; everything below is older still.
                    break;
                }
            }
        }

        Ok(by_date)
    }

    /// The date a message posts homework for, when it is a homework post.
    fn match_homework(&self, message: &ChatMessage) -> Option<NaiveDate> {
        if !message.content.to_lowercase().contains(&self.marker) {
            return None;
        }
        first_date_token(&message.content)
    }
}

fn homework_item(label: &str, message: &ChatMessage) -> HomeworkItem {
    HomeworkItem {
        lesson_label: label.to_string(),
        body: body_after_marker_line(&message.content),
        attachment_links: message.attachments.clone(),
        permalink: message.permalink.clone(),
    }
}

/// Everything after the marker line, or empty when the post is one line.
fn body_after_marker_line(content: &str) -> String {
    match content.find('\n') {
        Some(pos) => content[pos + 1..].trim_end().to_string(),
        None => String::new(),
    }
}
