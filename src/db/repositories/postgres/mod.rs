//! Postgres binding repository implementation using Diesel.
//!
//! Implements [`BindingRepository`] against the bot's existing binding
//! tables. The schema is owned by the wider bot process; this module only
//! reads and updates rows.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: connection string (required)
//! - `PG_POOL_MAX`: maximum pool size (default: 10)
//! - `PG_CONN_TIMEOUT_SEC`: connection timeout in seconds (default: 30)

use std::time::Duration;

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use tokio::task;

use crate::db::repository::{
    BindingRepository, LessonBinding, RepositoryError, RepositoryResult, ScheduleDestination,
    ScheduleToggle,
};
use crate::models::{ChannelId, GuildId};

mod models;
mod schema;

use models::{ChannelRow, GuildRow};
use schema::{course, ds_channel, ds_guild, lesson};

type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            connection_timeout_sec: 30,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let max_pool_size = std::env::var("PG_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let connection_timeout_sec = std::env::var("PG_CONN_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        Ok(Self {
            database_url,
            max_pool_size,
            connection_timeout_sec,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed binding repository for Postgres.
///
/// Failed operations are not retried here: the distribution scheduler's next
/// timer tick is the pipeline's only retry mechanism.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Create a new repository with a connection pool.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| RepositoryError::ConnectionError(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Run a blocking Diesel operation on the pool.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| RepositoryError::InternalError(format!("Task join error: {e}")))?
    }
}

#[async_trait]
impl BindingRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1").execute(conn)?;
            Ok(true)
        })
        .await
    }

    async fn schedule_destinations(&self) -> RepositoryResult<Vec<ScheduleDestination>> {
        self.with_conn(|conn| {
            let rows: Vec<(i64, i64, Option<String>)> = ds_channel::table
                .inner_join(ds_guild::table)
                .filter(ds_channel::is_schedule.eq(true))
                .select((
                    ds_channel::guild_id,
                    ds_channel::channel_id,
                    ds_guild::course_name,
                ))
                .load(conn)?;

            Ok(rows
                .into_iter()
                .map(|(guild, channel, course)| ScheduleDestination {
                    guild: GuildId::new(guild as u64),
                    channel: ChannelId::new(channel as u64),
                    course,
                })
                .collect())
        })
        .await
    }

    async fn lesson_channels(&self, guild: GuildId) -> RepositoryResult<Vec<LessonBinding>> {
        let guild_id = guild.value() as i64;
        self.with_conn(move |conn| {
            let rows: Vec<ChannelRow> = ds_channel::table
                .filter(ds_channel::guild_id.eq(guild_id))
                .filter(ds_channel::lesson_name.is_not_null())
                .select(ChannelRow::as_select())
                .load(conn)?;

            Ok(rows
                .into_iter()
                .filter_map(|row| {
                    row.lesson_name.map(|lesson| LessonBinding {
                        channel: ChannelId::new(row.channel_id as u64),
                        lesson,
                    })
                })
                .collect())
        })
        .await
    }

    async fn guild_course(&self, guild: GuildId) -> RepositoryResult<Option<String>> {
        let guild_id = guild.value() as i64;
        self.with_conn(move |conn| {
            let row: Option<GuildRow> = ds_guild::table
                .find(guild_id)
                .select(GuildRow::as_select())
                .first(conn)
                .optional()?;

            row.map(|row| row.course_name).ok_or_else(|| {
                RepositoryError::NotFound(format!("Guild {guild_id} not registered"))
            })
        })
        .await
    }

    async fn set_course(&self, guild: GuildId, course: &str) -> RepositoryResult<()> {
        let guild_id = guild.value() as i64;
        let course = course.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(ds_guild::table.find(guild_id))
                .set(ds_guild::course_name.eq(&course))
                .execute(conn)?;

            if updated == 0 {
                return Err(RepositoryError::NotFound(format!(
                    "Guild {guild_id} not registered"
                )));
            }
            Ok(())
        })
        .await
    }

    async fn toggle_schedule_channel(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> RepositoryResult<ScheduleToggle> {
        let guild_id = guild.value() as i64;
        let channel_id = channel.value() as i64;
        self.with_conn(move |conn| {
            conn.transaction(|conn| {
                let exists: i64 = ds_channel::table
                    .filter(ds_channel::channel_id.eq(channel_id))
                    .count()
                    .get_result(conn)?;
                if exists == 0 {
                    return Err(RepositoryError::NotFound(format!(
                        "Channel {channel_id} not registered"
                    )));
                }

                let current: Option<i64> = ds_channel::table
                    .filter(ds_channel::guild_id.eq(guild_id))
                    .filter(ds_channel::is_schedule.eq(true))
                    .select(ds_channel::channel_id)
                    .first(conn)
                    .optional()?;

                let toggle = match current {
                    None => {
                        set_schedule_flag(conn, channel_id, true)?;
                        ScheduleToggle::Enabled(ChannelId::new(channel_id as u64))
                    }
                    Some(existing) if existing != channel_id => {
                        set_schedule_flag(conn, existing, false)?;
                        set_schedule_flag(conn, channel_id, true)?;
                        ScheduleToggle::Moved {
                            from: ChannelId::new(existing as u64),
                            to: ChannelId::new(channel_id as u64),
                        }
                    }
                    Some(existing) => {
                        set_schedule_flag(conn, existing, false)?;
                        ScheduleToggle::Disabled(ChannelId::new(existing as u64))
                    }
                };

                Ok(toggle)
            })
        })
        .await
    }

    async fn set_lesson_channel(
        &self,
        channel: ChannelId,
        lesson: Option<&str>,
    ) -> RepositoryResult<()> {
        let channel_id = channel.value() as i64;
        let lesson = lesson.map(|l| l.to_string());
        self.with_conn(move |conn| {
            let updated = diesel::update(ds_channel::table.find(channel_id))
                .set(ds_channel::lesson_name.eq(lesson))
                .execute(conn)?;

            if updated == 0 {
                return Err(RepositoryError::NotFound(format!(
                    "Channel {channel_id} not registered"
                )));
            }
            Ok(())
        })
        .await
    }

    async fn known_courses(&self) -> RepositoryResult<Vec<String>> {
        self.with_conn(|conn| {
            Ok(course::table
                .select(course::course_name)
                .order(course::course_name.asc())
                .load(conn)?)
        })
        .await
    }

    async fn known_lessons(&self) -> RepositoryResult<Vec<String>> {
        self.with_conn(|conn| {
            Ok(lesson::table
                .select(lesson::lesson_name)
                .order(lesson::lesson_name.asc())
                .load(conn)?)
        })
        .await
    }
}

fn set_schedule_flag(
    conn: &mut PgConnection,
    channel_id: i64,
    value: bool,
) -> Result<(), RepositoryError> {
    diesel::update(ds_channel::table.find(channel_id))
        .set(ds_channel::is_schedule.eq(value))
        .execute(conn)?;
    Ok(())
}
