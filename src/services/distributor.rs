//! Scheduled distribution of daily and weekly digests.
//!
//! A timer loop computes the next school day, scrapes its schedule once,
//! and posts one digest per destination channel. A second, slower timer
//! posts the weekly homework digest on Fridays. Ticks never propagate
//! failures: a validation error skips the tick quietly and anything else is
//! logged, with the next timer fire as the only retry mechanism.
//!
//! Duplicate suppression is layered. Each posted digest is recorded in an
//! in-memory `(channel, title)` map; after a restart that map is empty, so
//! the destination's recent history is scanned for a message whose title
//! encodes the target date. A per-destination mutex, shared with the refresh
//! handler, keeps a close tick and refresh from interleaving edits.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate, Weekday};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};

use super::{
    collector::HomeworkCollector, digest::DigestBuilder, PipelineResult,
};
use crate::config::BotConfig;
use crate::db::{BindingRepository, ScheduleDestination};
use crate::gateway::{ChatGateway, GatewayError};
use crate::models::{
    dates::{next_school_day, school_week_after},
    parse_title, ChannelId, DaySchedule, DigestKind, MessageId,
};
use crate::scraper::{course_lessons, ScheduleSource};

/// Per-destination async locks shared between the distributor and the
/// refresh handler, closing the race between a tick and a refresh on the
/// same channel.
#[derive(Clone, Default)]
pub struct DestinationLocks {
    inner: Arc<Mutex<HashMap<ChannelId, Arc<AsyncMutex<()>>>>>,
}

impl DestinationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding one destination channel.
    pub fn for_channel(&self, channel: ChannelId) -> Arc<AsyncMutex<()>> {
        self.inner
            .lock()
            .entry(channel)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Record of digests posted by this process, keyed by destination and title.
#[derive(Default)]
struct PostedRecords {
    map: RwLock<HashMap<(ChannelId, String), MessageId>>,
}

impl PostedRecords {
    fn get(&self, channel: ChannelId, title: &str) -> Option<MessageId> {
        self.map.read().get(&(channel, title.to_string())).copied()
    }

    fn insert(&self, channel: ChannelId, title: String, message: MessageId) {
        self.map.write().insert((channel, title), message);
    }

    fn forget(&self, channel: ChannelId, title: &str) {
        self.map.write().remove(&(channel, title.to_string()));
    }
}

/// What the idempotence guard found at a destination.
enum ExistingDigest {
    /// Nothing posted for this date yet
    None,
    /// A digest with this date and identical schedule body exists
    UpToDate,
    /// A digest for this date exists but its schedule body is outdated
    Stale(MessageId),
}

/// The recurring distribution scheduler.
pub struct DistributionScheduler {
    config: BotConfig,
    gateway: Arc<dyn ChatGateway>,
    repository: Arc<dyn BindingRepository>,
    source: Arc<dyn ScheduleSource>,
    collector: HomeworkCollector,
    builder: DigestBuilder,
    locks: DestinationLocks,
    posted: PostedRecords,
}

impl DistributionScheduler {
    pub fn new(
        config: BotConfig,
        gateway: Arc<dyn ChatGateway>,
        repository: Arc<dyn BindingRepository>,
        source: Arc<dyn ScheduleSource>,
        locks: DestinationLocks,
    ) -> Self {
        let collector = HomeworkCollector::new(&config, gateway.clone(), repository.clone());
        let builder = DigestBuilder::new(&config);
        Self {
            config,
            gateway,
            repository,
            source,
            collector,
            builder,
            locks,
            posted: PostedRecords::default(),
        }
    }

    /// Run both timer loops until the shutdown flag flips.
    ///
    /// In-flight work is allowed to finish; only the loop itself stops.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut daily = tokio::time::interval(self.config.distribution_interval());
        let mut weekly = tokio::time::interval(self.config.weekly_interval());

        info!(
            interval_min = self.config.distribution_interval_min,
            "distribution scheduler started"
        );

        loop {
            tokio::select! {
                _ = daily.tick() => {
                    self.daily_tick(Local::now().date_naive()).await;
                }
                _ = weekly.tick() => {
                    self.weekly_tick(Local::now().date_naive()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("distribution scheduler stopping");
                        return;
                    }
                }
            }
        }
    }

    /// One daily distribution pass for the school day following `today`.
    pub async fn daily_tick(&self, today: NaiveDate) {
        let date = next_school_day(today);

        let destinations = match self.repository.schedule_destinations().await {
            Ok(destinations) => destinations,
            Err(e) => {
                error!(error = %e, "failed to load schedule destinations");
                return;
            }
        };
        if destinations.is_empty() {
            return;
        }

        let schedule = match self.source.fetch(date).await {
            Ok(schedule) => schedule,
            Err(e) if e.is_validation() => {
                debug!(%date, reason = %e, "skipping distribution tick");
                return;
            }
            Err(e) => {
                warn!(%date, error = %e, "schedule fetch failed, retrying next tick");
                return;
            }
        };

        for destination in destinations {
            if let Err(e) = self.distribute_daily(&destination, date, &schedule).await {
                warn!(
                    channel = %destination.channel,
                    error = %e,
                    "daily distribution failed for destination"
                );
            }
        }
    }

    /// One weekly distribution pass. Posts only when `today` is a Friday.
    pub async fn weekly_tick(&self, today: NaiveDate) {
        if today.weekday() != Weekday::Fri {
            return;
        }
        let (start, end) = school_week_after(today);

        let destinations = match self.repository.schedule_destinations().await {
            Ok(destinations) => destinations,
            Err(e) => {
                error!(error = %e, "failed to load schedule destinations");
                return;
            }
        };

        for destination in destinations {
            if let Err(e) = self.distribute_weekly(&destination, start, end).await {
                warn!(
                    channel = %destination.channel,
                    error = %e,
                    "weekly distribution failed for destination"
                );
            }
        }
    }

    async fn distribute_daily(
        &self,
        destination: &ScheduleDestination,
        date: NaiveDate,
        schedule: &DaySchedule,
    ) -> PipelineResult<()> {
        let Some(course) = destination.course.as_deref() else {
            warn!(guild = %destination.guild, "guild has no course configured, skipping");
            return Ok(());
        };
        let lessons = match course_lessons(schedule, course) {
            Ok(lessons) => lessons,
            Err(e) => {
                warn!(guild = %destination.guild, reason = %e, "skipping destination");
                return Ok(());
            }
        };

        let lock = self.locks.for_channel(destination.channel);
        let _guard = lock.lock().await;

        let schedule_body = DigestBuilder::schedule_lines(lessons);
        let title = crate::models::daily_title(date);

        match self
            .find_existing_daily(destination.channel, date, &title, &schedule_body)
            .await?
        {
            ExistingDigest::UpToDate => {
                debug!(channel = %destination.channel, %date, "digest already posted");
                return Ok(());
            }
            ExistingDigest::Stale(stale) => {
                info!(channel = %destination.channel, %date, "schedule changed, replacing digest");
                self.gateway.delete_message(destination.channel, stale).await?;
                self.posted.forget(destination.channel, &title);
            }
            ExistingDigest::None => {}
        }

        let homework = self.collector.collect(destination.guild, date).await?;
        let digest = self.builder.build_daily(date, lessons, &homework);
        let message = self.builder.daily_message(&digest);

        let id = self.gateway.post_message(destination.channel, message).await?;
        self.gateway
            .add_reaction(destination.channel, id, &self.config.refresh_emoji)
            .await?;
        self.posted.insert(destination.channel, digest.title.clone(), id);

        info!(channel = %destination.channel, %date, sections = digest.sections.len(), "posted daily digest");
        Ok(())
    }

    async fn distribute_weekly(
        &self,
        destination: &ScheduleDestination,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PipelineResult<()> {
        let lock = self.locks.for_channel(destination.channel);
        let _guard = lock.lock().await;

        let title = crate::models::weekly_title(start, end);
        if self.weekly_already_posted(destination.channel, &title).await? {
            debug!(channel = %destination.channel, "weekly digest already posted");
            return Ok(());
        }

        let by_date = self
            .collector
            .collect_range(destination.guild, start, end)
            .await?;
        let digest = self.builder.build_weekly(start, end, &by_date);
        let message = self.builder.weekly_message(&digest);

        let id = self.gateway.post_message(destination.channel, message).await?;
        self.gateway
            .add_reaction(destination.channel, id, &self.config.refresh_emoji)
            .await?;
        self.posted.insert(destination.channel, digest.title.clone(), id);

        info!(channel = %destination.channel, %start, %end, "posted weekly digest");
        Ok(())
    }

    /// Look for an already posted daily digest for `date`.
    ///
    /// The posted-record map is checked first; the title scan of recent
    /// history covers digests posted before a restart.
    async fn find_existing_daily(
        &self,
        channel: ChannelId,
        date: NaiveDate,
        title: &str,
        schedule_body: &str,
    ) -> PipelineResult<ExistingDigest> {
        if let Some(id) = self.posted.get(channel, title) {
            match self.gateway.fetch_message(channel, id).await {
                Ok(message) => {
                    let up_to_date = message
                        .embed
                        .as_ref()
                        .map(|embed| embed.description == schedule_body)
                        .unwrap_or(false);
                    return Ok(if up_to_date {
                        ExistingDigest::UpToDate
                    } else {
                        ExistingDigest::Stale(id)
                    });
                }
                Err(GatewayError::MessageNotFound(_)) => {
                    // Deleted externally; fall back to the title scan.
                    self.posted.forget(channel, title);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let history = self
            .gateway
            .channel_history(channel, self.config.history_limit)
            .await?;
        for message in history {
            let Some(embed) = &message.embed else { continue };
            match parse_title(&embed.title) {
                Some(DigestKind::Daily(posted_date)) if posted_date == date => {
                    return Ok(if embed.description == schedule_body {
                        ExistingDigest::UpToDate
                    } else {
                        ExistingDigest::Stale(message.id)
                    });
                }
                _ => continue,
            }
        }

        Ok(ExistingDigest::None)
    }

    async fn weekly_already_posted(
        &self,
        channel: ChannelId,
        title: &str,
    ) -> PipelineResult<bool> {
        if let Some(id) = self.posted.get(channel, title) {
            match self.gateway.fetch_message(channel, id).await {
                Ok(_) => return Ok(true),
                Err(GatewayError::MessageNotFound(_)) => self.posted.forget(channel, title),
                Err(e) => return Err(e.into()),
            }
        }

        let history = self
            .gateway
            .channel_history(channel, self.config.history_limit)
            .await?;
        Ok(history.iter().any(|message| {
            message
                .embed
                .as_ref()
                .map(|embed| embed.title == title)
                .unwrap_or(false)
        }))
    }
}
