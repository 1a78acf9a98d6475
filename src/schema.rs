// Diesel table definitions for the song-play star schema.

diesel::table! {
    artists (artist_id) {
        artist_id -> Text,
        name -> Text,
        location -> Nullable<Text>,
        latitude -> Nullable<Double>,
        longitude -> Nullable<Double>,
    }
}

diesel::table! {
    songplays (songplay_id) {
        songplay_id -> Integer,
        start_time -> Timestamp,
        user_id -> Integer,
        level -> Nullable<Text>,
        song_id -> Nullable<Text>,
        artist_id -> Nullable<Text>,
        session_id -> Integer,
        location -> Nullable<Text>,
        user_agent -> Nullable<Text>,
    }
}

diesel::table! {
    songs (song_id) {
        song_id -> Text,
        title -> Text,
        artist_id -> Text,
        year -> SmallInt,
        duration -> Double,
    }
}

diesel::table! {
    #[sql_name = "time"]
    time_dim (start_time) {
        start_time -> Timestamp,
        hour -> SmallInt,
        day -> SmallInt,
        week -> SmallInt,
        month -> SmallInt,
        year -> SmallInt,
        weekday -> SmallInt,
    }
}

diesel::table! {
    users (user_id) {
        user_id -> Integer,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        gender -> Nullable<Text>,
        level -> Nullable<Text>,
    }
}

diesel::joinable!(songs -> artists (artist_id));

diesel::allow_tables_to_appear_in_same_query!(artists, songplays, songs, time_dim, users,);
