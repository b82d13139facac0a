//! Reaction-driven refresh of posted digests.
//!
//! Pressing the refresh emoji on a posted digest re-collects homework for
//! the date encoded in the message title and rebuilds the homework sections
//! in place. The schedule portion is never re-scraped: once published, a
//! day's table is treated as static. This is the pipeline's only
//! mutation-in-place path.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    collector::HomeworkCollector, digest::DigestBuilder, distributor::DestinationLocks,
    PipelineResult,
};
use crate::config::BotConfig;
use crate::db::BindingRepository;
use crate::gateway::{ChatGateway, Embed, OutgoingMessage, ReactionEvent};
use crate::models::{parse_title, DigestKind};

/// What a reaction event resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Event was not addressed to this pipeline
    Ignored,
    /// A non-refresh reaction was reverted
    StrayRemoved,
    /// The digest was rebuilt and edited in place
    Refreshed,
}

/// Handles reaction events on posted digests.
pub struct RefreshHandler {
    config: BotConfig,
    gateway: Arc<dyn ChatGateway>,
    repository: Arc<dyn BindingRepository>,
    collector: HomeworkCollector,
    builder: DigestBuilder,
    locks: DestinationLocks,
}

impl RefreshHandler {
    pub fn new(
        config: BotConfig,
        gateway: Arc<dyn ChatGateway>,
        repository: Arc<dyn BindingRepository>,
        locks: DestinationLocks,
    ) -> Self {
        let collector = HomeworkCollector::new(&config, gateway.clone(), repository.clone());
        let builder = DigestBuilder::new(&config);
        Self {
            config,
            gateway,
            repository,
            collector,
            builder,
            locks,
        }
    }

    /// Consume reaction events until the sender side closes.
    pub async fn run(&self, mut events: mpsc::Receiver<ReactionEvent>) {
        while let Some(event) = events.recv().await {
            match self.handle(event).await {
                Ok(outcome) => debug!(?outcome, "reaction handled"),
                Err(e) => warn!(error = %e, "refresh failed"),
            }
        }
    }

    /// Handle one reaction event.
    ///
    /// Guards, in order: the channel must be a registered schedule
    /// destination; the actor must not be the bot itself; any emoji other
    /// than the refresh emoji is reverted and nothing else happens.
    pub async fn handle(&self, event: ReactionEvent) -> PipelineResult<RefreshOutcome> {
        let destinations = self.repository.schedule_destinations().await?;
        if !destinations.iter().any(|d| d.channel == event.channel) {
            return Ok(RefreshOutcome::Ignored);
        }
        if event.user == self.gateway.bot_user() {
            return Ok(RefreshOutcome::Ignored);
        }
        if event.emoji != self.config.refresh_emoji {
            self.gateway
                .remove_reaction(event.channel, event.message, event.user, &event.emoji)
                .await?;
            return Ok(RefreshOutcome::StrayRemoved);
        }

        let lock = self.locks.for_channel(event.channel);
        let _guard = lock.lock().await;

        let message = self.gateway.fetch_message(event.channel, event.message).await?;
        let Some(embed) = message.embed else {
            return Ok(RefreshOutcome::Ignored);
        };
        let Some(kind) = parse_title(&embed.title) else {
            return Ok(RefreshOutcome::Ignored);
        };

        let rebuilt = match kind {
            DigestKind::Daily(date) => {
                let homework = self.collector.collect(event.guild, date).await?;
                let sections = self.builder.daily_sections(&embed.description, &homework);
                Embed {
                    title: embed.title,
                    description: embed.description,
                    url: embed.url,
                    fields: sections,
                }
            }
            DigestKind::Weekly(start, end) => {
                let by_date = self.collector.collect_range(event.guild, start, end).await?;
                let digest = self.builder.build_weekly(start, end, &by_date);
                self.builder.weekly_embed(&digest)
            }
        };

        self.gateway
            .edit_message(
                event.channel,
                event.message,
                OutgoingMessage::from_embed(rebuilt),
            )
            .await?;
        self.gateway
            .remove_reaction(event.channel, event.message, event.user, &event.emoji)
            .await?;

        Ok(RefreshOutcome::Refreshed)
    }
}
