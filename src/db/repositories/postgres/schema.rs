// Binding tables owned by the wider bot; mirrored here, not migrated here.

diesel::table! {
    ds_guild (guild_id) {
        guild_id -> Int8,
        course_name -> Nullable<Text>,
    }
}

diesel::table! {
    ds_channel (channel_id) {
        channel_id -> Int8,
        guild_id -> Int8,
        is_schedule -> Bool,
        lesson_name -> Nullable<Text>,
    }
}

diesel::table! {
    course (course_name) {
        course_name -> Text,
    }
}

diesel::table! {
    lesson (lesson_name) {
        lesson_name -> Text,
    }
}

diesel::joinable!(ds_channel -> ds_guild (guild_id));

diesel::allow_tables_to_appear_in_same_query!(ds_guild, ds_channel, course, lesson);
