//! In-memory binding repository implementation.
//!
//! Stores all bindings in memory using HashMaps, providing fast,
//! deterministic and isolated execution for unit tests and local
//! development. The course and lesson catalogs emulate the database's
//! foreign key constraints.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::repository::{
    BindingRepository, LessonBinding, RepositoryError, RepositoryResult, ScheduleDestination,
    ScheduleToggle,
};
use crate::models::{ChannelId, GuildId};

/// In-memory binding repository.
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

#[derive(Default)]
struct LocalData {
    /// Course each guild follows
    guild_courses: HashMap<GuildId, Option<String>>,
    /// Channel rows: guild, schedule flag, lesson tag. Vec keeps
    /// registration order so lesson bindings iterate deterministically.
    channels: Vec<ChannelRow>,
    /// Registered course names (FK target for guild_courses)
    courses: Vec<String>,
    /// Registered lesson names (FK target for channel lesson tags)
    lessons: Vec<String>,
    is_healthy: bool,
}

struct ChannelRow {
    channel: ChannelId,
    guild: GuildId,
    is_schedule: bool,
    lesson: Option<String>,
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData {
                is_healthy: true,
                ..Default::default()
            })),
        }
    }

    /// Register a guild so its course can be set.
    pub fn register_guild(&self, guild: GuildId) {
        let mut data = self.data.write();
        data.guild_courses.entry(guild).or_insert(None);
    }

    /// Register a channel row under a guild.
    pub fn register_channel(&self, guild: GuildId, channel: ChannelId) {
        let mut data = self.data.write();
        data.guild_courses.entry(guild).or_insert(None);
        if !data.channels.iter().any(|row| row.channel == channel) {
            data.channels.push(ChannelRow {
                channel,
                guild,
                is_schedule: false,
                lesson: None,
            });
        }
    }

    /// Add a course to the course catalog.
    pub fn add_course(&self, course: impl Into<String>) {
        self.data.write().courses.push(course.into());
    }

    /// Add a lesson to the lesson catalog.
    pub fn add_lesson(&self, lesson: impl Into<String>) {
        self.data.write().lessons.push(lesson.into());
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BindingRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        let data = self.data.read();
        if !data.is_healthy {
            return Err(RepositoryError::ConnectionError(
                "Local repository marked unhealthy".into(),
            ));
        }
        Ok(true)
    }

    async fn schedule_destinations(&self) -> RepositoryResult<Vec<ScheduleDestination>> {
        let data = self.data.read();
        Ok(data
            .channels
            .iter()
            .filter(|row| row.is_schedule)
            .map(|row| ScheduleDestination {
                guild: row.guild,
                channel: row.channel,
                course: data.guild_courses.get(&row.guild).cloned().flatten(),
            })
            .collect())
    }

    async fn lesson_channels(&self, guild: GuildId) -> RepositoryResult<Vec<LessonBinding>> {
        let data = self.data.read();
        Ok(data
            .channels
            .iter()
            .filter(|row| row.guild == guild)
            .filter_map(|row| {
                row.lesson.as_ref().map(|lesson| LessonBinding {
                    channel: row.channel,
                    lesson: lesson.clone(),
                })
            })
            .collect())
    }

    async fn guild_course(&self, guild: GuildId) -> RepositoryResult<Option<String>> {
        let data = self.data.read();
        data.guild_courses
            .get(&guild)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("Guild {guild} not registered")))
    }

    async fn set_course(&self, guild: GuildId, course: &str) -> RepositoryResult<()> {
        let mut data = self.data.write();
        if !data.courses.iter().any(|c| c == course) {
            return Err(RepositoryError::ConfigurationError(format!(
                "Course {course} is not registered"
            )));
        }
        match data.guild_courses.get_mut(&guild) {
            Some(slot) => {
                *slot = Some(course.to_string());
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!(
                "Guild {guild} not registered"
            ))),
        }
    }

    async fn toggle_schedule_channel(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> RepositoryResult<ScheduleToggle> {
        let mut data = self.data.write();
        if !data.channels.iter().any(|row| row.channel == channel) {
            return Err(RepositoryError::NotFound(format!(
                "Channel {channel} not registered"
            )));
        }

        let current = data
            .channels
            .iter()
            .find(|row| row.guild == guild && row.is_schedule)
            .map(|row| row.channel);

        let toggle = match current {
            None => {
                set_schedule_flag(&mut data.channels, channel, true);
                ScheduleToggle::Enabled(channel)
            }
            Some(existing) if existing != channel => {
                set_schedule_flag(&mut data.channels, existing, false);
                set_schedule_flag(&mut data.channels, channel, true);
                ScheduleToggle::Moved {
                    from: existing,
                    to: channel,
                }
            }
            Some(existing) => {
                set_schedule_flag(&mut data.channels, existing, false);
                ScheduleToggle::Disabled(existing)
            }
        };

        Ok(toggle)
    }

    async fn set_lesson_channel(
        &self,
        channel: ChannelId,
        lesson: Option<&str>,
    ) -> RepositoryResult<()> {
        let mut data = self.data.write();
        if let Some(lesson) = lesson {
            if !data.lessons.iter().any(|l| l == lesson) {
                return Err(RepositoryError::ConfigurationError(format!(
                    "Lesson {lesson} is not registered"
                )));
            }
        }
        match data.channels.iter_mut().find(|row| row.channel == channel) {
            Some(row) => {
                row.lesson = lesson.map(|l| l.to_string());
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!(
                "Channel {channel} not registered"
            ))),
        }
    }

    async fn known_courses(&self) -> RepositoryResult<Vec<String>> {
        Ok(self.data.read().courses.clone())
    }

    async fn known_lessons(&self) -> RepositoryResult<Vec<String>> {
        Ok(self.data.read().lessons.clone())
    }
}

fn set_schedule_flag(channels: &mut [ChannelRow], channel: ChannelId, value: bool) {
    if let Some(row) = channels.iter_mut().find(|row| row.channel == channel) {
        row.is_schedule = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId(1);
    const SCHEDULE_CH: ChannelId = ChannelId(10);
    const MATH_CH: ChannelId = ChannelId(11);

    fn repo() -> LocalRepository {
        let repo = LocalRepository::new();
        repo.register_channel(GUILD, SCHEDULE_CH);
        repo.register_channel(GUILD, MATH_CH);
        repo.add_course("11m");
        repo.add_lesson("math");
        repo
    }

    #[tokio::test]
    async fn test_health_check() {
        let repo = repo();
        assert!(repo.health_check().await.unwrap());

        repo.set_healthy(false);
        assert!(repo.health_check().await.is_err());
    }

    #[tokio::test]
    async fn test_toggle_schedule_lifecycle() {
        let repo = repo();

        let first = repo.toggle_schedule_channel(GUILD, SCHEDULE_CH).await.unwrap();
        assert_eq!(first, ScheduleToggle::Enabled(SCHEDULE_CH));
        assert_eq!(repo.schedule_destinations().await.unwrap().len(), 1);

        let moved = repo.toggle_schedule_channel(GUILD, MATH_CH).await.unwrap();
        assert_eq!(
            moved,
            ScheduleToggle::Moved {
                from: SCHEDULE_CH,
                to: MATH_CH
            }
        );

        let disabled = repo.toggle_schedule_channel(GUILD, MATH_CH).await.unwrap();
        assert_eq!(disabled, ScheduleToggle::Disabled(MATH_CH));
        assert!(repo.schedule_destinations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_course_enforces_catalog() {
        let repo = repo();
        repo.set_course(GUILD, "11m").await.unwrap();
        assert_eq!(
            repo.guild_course(GUILD).await.unwrap(),
            Some("11m".to_string())
        );

        let err = repo.set_course(GUILD, "13z").await.unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn test_catalogs_listed() {
        let repo = repo();
        assert_eq!(repo.known_courses().await.unwrap(), vec!["11m"]);
        assert_eq!(repo.known_lessons().await.unwrap(), vec!["math"]);
    }

    #[tokio::test]
    async fn test_set_lesson_enforces_catalog() {
        let repo = repo();
        repo.set_lesson_channel(MATH_CH, Some("math")).await.unwrap();

        let bindings = repo.lesson_channels(GUILD).await.unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].lesson, "math");

        let err = repo
            .set_lesson_channel(MATH_CH, Some("alchemy"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationError(_)));

        repo.set_lesson_channel(MATH_CH, None).await.unwrap();
        assert!(repo.lesson_channels(GUILD).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_guild_and_channel() {
        let repo = repo();
        assert!(repo.guild_course(GuildId(99)).await.is_err());
        assert!(repo
            .set_lesson_channel(ChannelId(99), Some("math"))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_destination_carries_guild_course() {
        let repo = repo();
        repo.set_course(GUILD, "11m").await.unwrap();
        repo.toggle_schedule_channel(GUILD, SCHEDULE_CH).await.unwrap();

        let destinations = repo.schedule_destinations().await.unwrap();
        assert_eq!(destinations[0].course.as_deref(), Some("11m"));
        assert_eq!(destinations[0].guild, GUILD);
    }
}
