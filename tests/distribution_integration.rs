//! Integration tests for the distribution scheduler, driven end to end
//! against the in-memory gateway and bindings store.

mod support;

use std::sync::Arc;

use classbot::db::{BindingRepository, LocalRepository};
use classbot::gateway::{ChatGateway, LocalGateway};
use classbot::models::{ChannelId, GuildId, UserId};
use classbot::services::{DestinationLocks, DistributionScheduler};

use support::{date, schedule_with, test_config, FakeScheduleSource};

const BOT: UserId = UserId(1);
const STUDENT: UserId = UserId(50);
const GUILD: GuildId = GuildId(10);
const SCHEDULE_CH: ChannelId = ChannelId(20);
const MATH_CH: ChannelId = ChannelId(30);

struct Fixture {
    scheduler: DistributionScheduler,
    gateway: LocalGateway,
    repository: Arc<LocalRepository>,
    source: Arc<FakeScheduleSource>,
}

impl Fixture {
    /// Scheduler with fresh in-process state over the same external world,
    /// as after a process restart.
    fn restarted(&self) -> DistributionScheduler {
        DistributionScheduler::new(
            test_config(),
            Arc::new(self.gateway.clone()),
            self.repository.clone() as Arc<dyn BindingRepository>,
            self.source.clone(),
            DestinationLocks::new(),
        )
    }
}

async fn fixture() -> Fixture {
    let gateway = LocalGateway::new(BOT);
    gateway.add_channel(GUILD, SCHEDULE_CH);
    gateway.add_channel(GUILD, MATH_CH);

    let repository = Arc::new(LocalRepository::new());
    repository.register_channel(GUILD, SCHEDULE_CH);
    repository.register_channel(GUILD, MATH_CH);
    repository.add_course("11m");
    repository.add_lesson("math");
    repository.set_course(GUILD, "11m").await.unwrap();
    repository
        .toggle_schedule_channel(GUILD, SCHEDULE_CH)
        .await
        .unwrap();
    repository
        .set_lesson_channel(MATH_CH, Some("math"))
        .await
        .unwrap();

    let source = Arc::new(FakeScheduleSource::new());

    let scheduler = DistributionScheduler::new(
        test_config(),
        Arc::new(gateway.clone()),
        repository.clone() as Arc<dyn BindingRepository>,
        source.clone(),
        DestinationLocks::new(),
    );

    Fixture {
        scheduler,
        gateway,
        repository,
        source,
    }
}

#[tokio::test]
async fn test_successful_weekday_run() {
    let fx = fixture().await;
    // Monday the 16th; target date is Tuesday the 17th.
    let today = date(2024, 9, 16);
    let target = date(2024, 9, 17);

    fx.source
        .publish(target, schedule_with("11m", &["Math", "", "Physics"]));
    fx.gateway.seed_message(
        MATH_CH,
        STUDENT,
        "hw 17.09.24\nSolve problems 1-10",
        vec![],
    );

    fx.scheduler.daily_tick(today).await;

    let history = fx.gateway.channel_history(SCHEDULE_CH, 10).await.unwrap();
    assert_eq!(history.len(), 1);

    let embed = history[0].embed.as_ref().unwrap();
    assert_eq!(embed.title, "Tuesday 17.09.24");
    assert_eq!(embed.description, "`1` Math\n`3` Physics");
    assert_eq!(embed.fields.len(), 1);
    assert_eq!(embed.fields[0].0, "Math");
    assert_eq!(embed.fields[0].1, "Solve problems 1-10");

    // The refresh affordance is attached to the new message.
    let reactions = fx.gateway.reactions(SCHEDULE_CH, history[0].id);
    assert_eq!(reactions, vec![(BOT, "\u{1F504}".to_string())]);
}

#[tokio::test]
async fn test_second_tick_is_idempotent() {
    let fx = fixture().await;
    let today = date(2024, 9, 16);
    fx.source
        .publish(date(2024, 9, 17), schedule_with("11m", &["Math"]));

    fx.scheduler.daily_tick(today).await;
    fx.scheduler.daily_tick(today).await;

    assert_eq!(fx.gateway.message_count(SCHEDULE_CH), 1);
}

#[tokio::test]
async fn test_idempotent_across_restart() {
    let fx = fixture().await;
    let today = date(2024, 9, 16);
    fx.source
        .publish(date(2024, 9, 17), schedule_with("11m", &["Math"]));

    fx.scheduler.daily_tick(today).await;

    // A fresh scheduler has no posted records; the title scan of channel
    // history must still suppress the duplicate.
    let restarted = fx.restarted();
    restarted.daily_tick(today).await;

    assert_eq!(fx.gateway.message_count(SCHEDULE_CH), 1);
}

#[tokio::test]
async fn test_unpublished_schedule_posts_nothing() {
    let fx = fixture().await;

    fx.scheduler.daily_tick(date(2024, 9, 16)).await;

    assert_eq!(fx.gateway.message_count(SCHEDULE_CH), 0);
}

#[tokio::test]
async fn test_friday_targets_monday() {
    let fx = fixture().await;
    // Friday the 20th; tomorrow is a weekend, so Monday the 23rd is next.
    let monday = date(2024, 9, 23);
    fx.source.publish(monday, schedule_with("11m", &["Math"]));

    fx.scheduler.daily_tick(date(2024, 9, 20)).await;

    let history = fx.gateway.channel_history(SCHEDULE_CH, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].embed.as_ref().unwrap().title, "Monday 23.09.24");
}

#[tokio::test]
async fn test_revised_schedule_replaces_digest() {
    let fx = fixture().await;
    let today = date(2024, 9, 16);
    let target = date(2024, 9, 17);

    fx.source.publish(target, schedule_with("11m", &["Math"]));
    fx.scheduler.daily_tick(today).await;

    // The site publishes a corrected table for the same day.
    fx.source
        .publish(target, schedule_with("11m", &["Math", "Physics"]));
    fx.scheduler.daily_tick(today).await;

    let history = fx.gateway.channel_history(SCHEDULE_CH, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].embed.as_ref().unwrap().description,
        "`1` Math\n`2` Physics"
    );
}

#[tokio::test]
async fn test_missing_destination_does_not_block_others() {
    let fx = fixture().await;

    // A second guild whose destination channel is gone from the platform.
    // It registers first, so it is attempted first.
    let ghost_guild = GuildId(11);
    let ghost_channel = ChannelId(99);
    let repository = Arc::new(LocalRepository::new());
    repository.register_channel(ghost_guild, ghost_channel);
    repository.register_channel(GUILD, SCHEDULE_CH);
    repository.add_course("11m");
    repository.set_course(ghost_guild, "11m").await.unwrap();
    repository.set_course(GUILD, "11m").await.unwrap();
    repository
        .toggle_schedule_channel(ghost_guild, ghost_channel)
        .await
        .unwrap();
    repository
        .toggle_schedule_channel(GUILD, SCHEDULE_CH)
        .await
        .unwrap();

    let scheduler = DistributionScheduler::new(
        test_config(),
        Arc::new(fx.gateway.clone()),
        repository as Arc<dyn BindingRepository>,
        fx.source.clone(),
        DestinationLocks::new(),
    );

    fx.source
        .publish(date(2024, 9, 17), schedule_with("11m", &["Math"]));
    scheduler.daily_tick(date(2024, 9, 16)).await;

    assert_eq!(fx.gateway.message_count(SCHEDULE_CH), 1);
}

#[tokio::test]
async fn test_unknown_course_destination_skipped() {
    let fx = fixture().await;
    fx.repository.add_course("9z");
    fx.repository.set_course(GUILD, "9z").await.unwrap();

    fx.source
        .publish(date(2024, 9, 17), schedule_with("11m", &["Math"]));
    fx.scheduler.daily_tick(date(2024, 9, 16)).await;

    assert_eq!(fx.gateway.message_count(SCHEDULE_CH), 0);
}

#[tokio::test]
async fn test_weekly_digest_posted_on_friday() {
    let fx = fixture().await;
    let friday = date(2024, 9, 20);
    fx.gateway
        .seed_message(MATH_CH, STUDENT, "hw 24.09.24\nIntegrals", vec![]);

    fx.scheduler.weekly_tick(friday).await;

    let history = fx.gateway.channel_history(SCHEDULE_CH, 10).await.unwrap();
    assert_eq!(history.len(), 1);

    let embed = history[0].embed.as_ref().unwrap();
    assert_eq!(embed.title, "Homework 23.09.24 to 27.09.24");
    assert_eq!(embed.fields.len(), 5);
    assert_eq!(embed.fields[1].0, "24.09.24");
    assert!(embed.fields[1].1.contains("Integrals"));
    // Days with no homework carry the placeholder.
    assert_eq!(embed.fields[0].1, "Nothing assigned yet");

    let reactions = fx.gateway.reactions(SCHEDULE_CH, history[0].id);
    assert_eq!(reactions.len(), 1);
}

#[tokio::test]
async fn test_weekly_digest_idempotent() {
    let fx = fixture().await;
    let friday = date(2024, 9, 20);

    fx.scheduler.weekly_tick(friday).await;
    fx.scheduler.weekly_tick(friday).await;
    fx.restarted().weekly_tick(friday).await;

    assert_eq!(fx.gateway.message_count(SCHEDULE_CH), 1);
}

#[tokio::test]
async fn test_weekly_tick_skips_non_friday() {
    let fx = fixture().await;

    fx.scheduler.weekly_tick(date(2024, 9, 18)).await;

    assert_eq!(fx.gateway.message_count(SCHEDULE_CH), 0);
}
