//! Repository trait for abstracting binding storage.
//!
//! This trait defines the interface for all binding reads and writes,
//! allowing different implementations (Postgres, in-memory) to be swapped
//! via dependency injection.

mod error;

pub use error::{RepositoryError, RepositoryResult};

use async_trait::async_trait;

use crate::models::{ChannelId, GuildId};

/// A channel that receives the schedule digest for its guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDestination {
    pub guild: GuildId,
    pub channel: ChannelId,
    /// Course the guild follows, if one has been configured
    pub course: Option<String>,
}

/// A channel homework is collected from, tagged with a lesson name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonBinding {
    pub channel: ChannelId,
    /// Lesson name as registered in the lesson catalog (lowercase)
    pub lesson: String,
}

/// Outcome of toggling a guild's schedule destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleToggle {
    /// The channel became the guild's schedule destination
    Enabled(ChannelId),
    /// The destination moved from one channel to another
    Moved { from: ChannelId, to: ChannelId },
    /// The channel was the destination and distribution is now off
    Disabled(ChannelId),
}

/// Repository trait for binding storage.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust and allow
/// sharing across tasks.
///
/// # Error Handling
/// All methods return [`RepositoryResult<T>`] which wraps either the expected
/// return type or a [`RepositoryError`] describing what went wrong. Writes
/// that reference an unregistered course or lesson fail with
/// `ConfigurationError`.
#[async_trait]
pub trait BindingRepository: Send + Sync {
    /// Check if the storage backend is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// All schedule destinations across guilds, with each guild's course.
    async fn schedule_destinations(&self) -> RepositoryResult<Vec<ScheduleDestination>>;

    /// Lesson-tagged channels of one guild, in registration order.
    async fn lesson_channels(&self, guild: GuildId) -> RepositoryResult<Vec<LessonBinding>>;

    /// The course a guild follows, if configured.
    async fn guild_course(&self, guild: GuildId) -> RepositoryResult<Option<String>>;

    /// Set the course a guild follows.
    ///
    /// # Errors
    /// `ConfigurationError` when the course is not in the course catalog;
    /// `NotFound` when the guild is unknown.
    async fn set_course(&self, guild: GuildId, course: &str) -> RepositoryResult<()>;

    /// Toggle a channel as the guild's schedule destination.
    ///
    /// First call on a guild enables the channel; calling with a different
    /// channel moves the destination; calling with the current destination
    /// disables distribution for the guild.
    async fn toggle_schedule_channel(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> RepositoryResult<ScheduleToggle>;

    /// Tag a channel with a lesson name, or clear the tag with `None`.
    ///
    /// # Errors
    /// `ConfigurationError` when the lesson is not in the lesson catalog;
    /// `NotFound` when the channel is unknown.
    async fn set_lesson_channel(
        &self,
        channel: ChannelId,
        lesson: Option<&str>,
    ) -> RepositoryResult<()>;

    /// All registered course names.
    async fn known_courses(&self) -> RepositoryResult<Vec<String>>;

    /// All registered lesson names.
    async fn known_lessons(&self) -> RepositoryResult<Vec<String>>;
}
