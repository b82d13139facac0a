use diesel::prelude::*;

use super::schema::{ds_channel, ds_guild};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = ds_guild)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GuildRow {
    pub guild_id: i64,
    pub course_name: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = ds_channel)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChannelRow {
    pub channel_id: i64,
    pub guild_id: i64,
    pub is_schedule: bool,
    pub lesson_name: Option<String>,
}
