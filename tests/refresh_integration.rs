//! Integration tests for the reaction-driven refresh flow.

mod support;

use std::sync::Arc;

use classbot::db::{BindingRepository, LocalRepository};
use classbot::gateway::{ChatGateway, LocalGateway};
use classbot::models::{ChannelId, GuildId, MessageId, UserId};
use classbot::services::refresh::RefreshOutcome;
use classbot::services::{
    DestinationLocks, DistributionScheduler, RefreshHandler,
};

use support::{date, schedule_with, test_config, FakeScheduleSource};

const BOT: UserId = UserId(1);
const STUDENT: UserId = UserId(50);
const GUILD: GuildId = GuildId(10);
const SCHEDULE_CH: ChannelId = ChannelId(20);
const MATH_CH: ChannelId = ChannelId(30);

const REFRESH: &str = "\u{1F504}";

struct Fixture {
    scheduler: DistributionScheduler,
    refresher: RefreshHandler,
    gateway: LocalGateway,
    repository: Arc<LocalRepository>,
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
    source.publish(
        date(2024, 9, 17),
        schedule_with("11m", &["Math", "", "Physics"]),
    );

    let locks = DestinationLocks::new();
    let scheduler = DistributionScheduler::new(
        test_config(),
        Arc::new(gateway.clone()),
        repository.clone() as Arc<dyn BindingRepository>,
        source,
        locks.clone(),
    );
    let refresher = RefreshHandler::new(
        test_config(),
        Arc::new(gateway.clone()),
        repository.clone() as Arc<dyn BindingRepository>,
        locks,
    );

    Fixture {
        scheduler,
        refresher,
        gateway,
        repository,
    }
}

/// Post the daily digest for Tuesday the 17th and return its message id.
async fn post_digest(fx: &Fixture) -> MessageId {
    fx.scheduler.daily_tick(date(2024, 9, 16)).await;
    let history = fx.gateway.channel_history(SCHEDULE_CH, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    history[0].id
}

#[tokio::test]
async fn test_refresh_picks_up_new_homework() {
    let fx = fixture().await;
    let digest = post_digest(&fx).await;

    // Homework posted after the digest went out.
    fx.gateway.seed_message(
        MATH_CH,
        STUDENT,
        "hw 17.09.24\nRead chapter 4",
        vec!["https://files.example/notes.pdf".into()],
    );

    let event = fx
        .gateway
        .press_reaction(SCHEDULE_CH, digest, STUDENT, REFRESH)
        .unwrap();
    let outcome = fx.refresher.handle(event).await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Refreshed);

    let message = fx.gateway.fetch_message(SCHEDULE_CH, digest).await.unwrap();
    let embed = message.embed.unwrap();
    // Schedule portion untouched, homework rebuilt.
    assert_eq!(embed.title, "Tuesday 17.09.24");
    assert_eq!(embed.description, "`1` Math\n`3` Physics");
    assert_eq!(embed.fields.len(), 1);
    assert!(embed.fields[0].1.contains("Read chapter 4"));
    assert!(embed.fields[0].1.contains("notes.pdf"));

    // The triggering reaction is retracted; the bot's affordance stays.
    let reactions = fx.gateway.reactions(SCHEDULE_CH, digest);
    assert_eq!(reactions, vec![(BOT, REFRESH.to_string())]);
}

#[tokio::test]
async fn test_refresh_drops_stale_sections() {
    let fx = fixture().await;
    // Homework exists when the digest is posted, then the post is deleted.
    let hw = fx
        .gateway
        .seed_message(MATH_CH, STUDENT, "hw 17.09.24\nOld assignment", vec![]);
    let digest = post_digest(&fx).await;
    fx.gateway.delete_message(MATH_CH, hw).await.unwrap();

    let event = fx
        .gateway
        .press_reaction(SCHEDULE_CH, digest, STUDENT, REFRESH)
        .unwrap();
    fx.refresher.handle(event).await.unwrap();

    let message = fx.gateway.fetch_message(SCHEDULE_CH, digest).await.unwrap();
    assert!(message.embed.unwrap().fields.is_empty());
}

#[tokio::test]
async fn test_stray_reaction_is_removed() {
    let fx = fixture().await;
    let digest = post_digest(&fx).await;

    let event = fx
        .gateway
        .press_reaction(SCHEDULE_CH, digest, STUDENT, "👍")
        .unwrap();
    let outcome = fx.refresher.handle(event).await.unwrap();
    assert_eq!(outcome, RefreshOutcome::StrayRemoved);

    let reactions = fx.gateway.reactions(SCHEDULE_CH, digest);
    assert_eq!(reactions, vec![(BOT, REFRESH.to_string())]);
}

#[tokio::test]
async fn test_reaction_outside_destinations_ignored() {
    let fx = fixture().await;
    let post = fx
        .gateway
        .seed_message(MATH_CH, STUDENT, "hw 17.09.24\nSolve", vec![]);

    let event = fx
        .gateway
        .press_reaction(MATH_CH, post, STUDENT, REFRESH)
        .unwrap();
    let outcome = fx.refresher.handle(event).await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Ignored);

    // The reaction is left alone in non-destination channels.
    assert_eq!(fx.gateway.reactions(MATH_CH, post).len(), 1);
}

#[tokio::test]
async fn test_bots_own_reaction_ignored() {
    let fx = fixture().await;
    let digest = post_digest(&fx).await;

    let event = fx
        .gateway
        .press_reaction(SCHEDULE_CH, digest, BOT, REFRESH)
        .unwrap();
    let outcome = fx.refresher.handle(event).await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Ignored);
}

#[tokio::test]
async fn test_refresh_respects_fuzzy_join() {
    let fx = fixture().await;
    let digest = post_digest(&fx).await;

    // A chemistry post for the date; the schedule has no chemistry lesson,
    // so the refresh must not attach it.
    let chem = ChannelId(31);
    fx.gateway.add_channel(GUILD, chem);
    fx.repository.register_channel(GUILD, chem);
    fx.repository.add_lesson("chemistry");
    fx.repository
        .set_lesson_channel(chem, Some("chemistry"))
        .await
        .unwrap();
    fx.gateway
        .seed_message(chem, STUDENT, "hw 17.09.24\nBalance equations", vec![]);

    let event = fx
        .gateway
        .press_reaction(SCHEDULE_CH, digest, STUDENT, REFRESH)
        .unwrap();
    fx.refresher.handle(event).await.unwrap();

    let message = fx.gateway.fetch_message(SCHEDULE_CH, digest).await.unwrap();
    assert!(message.embed.unwrap().fields.is_empty());
}

#[tokio::test]
async fn test_weekly_refresh_rebuilds_days() {
    let fx = fixture().await;
    fx.scheduler.weekly_tick(date(2024, 9, 20)).await;
    let history = fx.gateway.channel_history(SCHEDULE_CH, 10).await.unwrap();
    let digest = history[0].id;

    fx.gateway
        .seed_message(MATH_CH, STUDENT, "hw 25.09.24\nNew worksheet", vec![]);

    let event = fx
        .gateway
        .press_reaction(SCHEDULE_CH, digest, STUDENT, REFRESH)
        .unwrap();
    let outcome = fx.refresher.handle(event).await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Refreshed);

    let message = fx.gateway.fetch_message(SCHEDULE_CH, digest).await.unwrap();
    let embed = message.embed.unwrap();
    assert_eq!(embed.title, "Homework 23.09.24 to 27.09.24");
    assert_eq!(embed.fields.len(), 5);
    assert!(embed.fields[2].1.contains("New worksheet"));
}
