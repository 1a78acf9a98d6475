//! End-to-end load tests against an in-memory SQLite warehouse
//!
//! Run with `cargo test --no-default-features --features sqlite`.

#![cfg(feature = "sqlite")]

use chrono::{NaiveDate, Timelike};
use diesel::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use sparkload::models::{Artist, Song, SongPlay, TimeRow, User};
use sparkload::schema::{artists, songplays, songs, time_dim, users};
use sparkload::transform::timestamp_from_millis;
use sparkload::{loader, schema_init, Database, DbConnection, EtlError, UserPolicy, WarehouseConfig};

const HARMONIA: &str = r#"{"num_songs": 1, "artist_id": "ARZ1", "artist_latitude": 51.5, "artist_longitude": -0.12, "artist_location": "London", "artist_name": "Harmonia", "song_id": "SOKOSMISCH", "title": "Sehr kosmisch", "duration": 655.77751, "year": 1974}"#;
const CASUAL: &str = r#"{"num_songs": 1, "artist_id": "ARD7", "artist_latitude": null, "artist_longitude": null, "artist_location": "", "artist_name": "Casual", "song_id": "SOMZWCG", "title": "I Didn't Mean To", "duration": 218.93179, "year": 0}"#;

fn log_line(page: &str, ts: i64, user: &str, level: &str, song: Option<(&str, &str, f64)>) -> String {
    let (title, artist, length) = match song {
        Some((title, artist, length)) => (
            format!("\"{}\"", title),
            format!("\"{}\"", artist),
            length.to_string(),
        ),
        None => ("null".to_string(), "null".to_string(), "null".to_string()),
    };
    format!(
        r#"{{"artist":{artist},"auth":"Logged In","firstName":"First{user}","gender":"F","itemInSession":0,"lastName":"Last{user}","length":{length},"level":"{level}","location":"Lansing-East Lansing, MI","method":"PUT","page":"{page}","registration":1540919166796.0,"sessionId":139,"song":{title},"status":200,"ts":{ts},"userAgent":"Mozilla/5.0","userId":"{user}"}}"#
    )
}

fn write(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Song tree with two songs and a log tree spanning two days.
fn fixture() -> (TempDir, WarehouseConfig) {
    let dir = TempDir::new().unwrap();
    let song_data = dir.path().join("song_data");
    let log_data = dir.path().join("log_data");

    write(&song_data, "A/A/A/TRAAAHARMONIA.json", HARMONIA);
    write(&song_data, "A/B/C/TRABCCASUAL.json", CASUAL);

    let day_one = [
        log_line("Home", 1541105830796, "10", "free", None),
        log_line("NextSong", 1541106106796, "10", "free", Some(("Sehr kosmisch", "Harmonia", 655.77751))),
        log_line("NextSong", 1541106352796, "11", "free", Some(("Unknown Song", "Nobody", 100.0))),
        log_line("Settings", 1541106400000, "12", "paid", None),
        r#"{"artist":null,"auth":"Logged Out","firstName":null,"gender":null,"itemInSession":0,"lastName":null,"length":null,"level":"free","location":null,"method":"GET","page":"Home","registration":null,"sessionId":52,"song":null,"status":200,"ts":1541106500000,"userAgent":null,"userId":""}"#.to_string(),
    ]
    .join("\n");
    let day_two = [
        log_line("NextSong", 1541193053796, "10", "paid", Some(("Sehr kosmisch", "Harmonia", 655.77751))),
        log_line("Logout", 1541193100000, "10", "paid", None),
    ]
    .join("\n");

    write(&log_data, "2018/11/2018-11-01-events.json", &day_one);
    write(&log_data, "2018/11/2018-11-02-events.json", &day_two);

    let config = WarehouseConfig {
        database_url: ":memory:".to_string(),
        song_data,
        log_data,
        ..WarehouseConfig::default()
    };
    (dir, config)
}

fn fresh_connection() -> DbConnection {
    let mut conn = DbConnection::establish(":memory:").unwrap();
    schema_init::reset_schema(&mut conn).unwrap();
    conn
}

fn all_songs(conn: &mut DbConnection) -> Vec<Song> {
    songs::table
        .select(Song::as_select())
        .order(songs::song_id)
        .load(conn)
        .unwrap()
}

fn all_artists(conn: &mut DbConnection) -> Vec<Artist> {
    artists::table
        .select(Artist::as_select())
        .order(artists::artist_id)
        .load(conn)
        .unwrap()
}

fn all_users(conn: &mut DbConnection) -> Vec<User> {
    users::table
        .select(User::as_select())
        .order(users::user_id)
        .load(conn)
        .unwrap()
}

fn all_times(conn: &mut DbConnection) -> Vec<TimeRow> {
    time_dim::table
        .select(TimeRow::as_select())
        .order(time_dim::start_time)
        .load(conn)
        .unwrap()
}

fn all_plays(conn: &mut DbConnection) -> Vec<SongPlay> {
    songplays::table
        .select(SongPlay::as_select())
        .order(songplays::songplay_id)
        .load(conn)
        .unwrap()
}

#[test]
fn test_full_load() {
    let (_dir, config) = fixture();
    let mut conn = fresh_connection();

    let stats = loader::run(&mut conn, &config).unwrap();

    assert_eq!(stats.song_files, 2);
    assert_eq!(stats.log_files, 2);
    assert_eq!(stats.songs_written, 2);
    assert_eq!(stats.artists_written, 2);
    assert_eq!(stats.songplays_written, 3);
    assert_eq!(stats.songplays_matched, 2);
    assert_eq!(stats.time_written, 3);
    assert_eq!(stats.rows_skipped, 4);

    let casual = &all_songs(&mut conn)[1];
    assert_eq!(casual.song_id, "SOMZWCG");
    assert_eq!(casual.year, 0);
    let harmonia = &all_artists(&mut conn)[1];
    assert_eq!(harmonia.name, "Harmonia");
    assert_eq!(harmonia.latitude, Some(51.5));
}

#[test]
fn test_song_load_is_idempotent() {
    let (_dir, config) = fixture();
    let mut conn = fresh_connection();

    let mut first = loader::LoadStats::default();
    loader::process_data(&mut conn, &config.song_data, "json", &mut first, loader::process_song_file)
        .unwrap();
    let songs_once = all_songs(&mut conn);
    let artists_once = all_artists(&mut conn);

    let mut second = loader::LoadStats::default();
    loader::process_data(&mut conn, &config.song_data, "json", &mut second, loader::process_song_file)
        .unwrap();

    assert_eq!(all_songs(&mut conn), songs_once);
    assert_eq!(all_artists(&mut conn), artists_once);
    assert_eq!(second.song_files, 2);
    assert_eq!(second.songs_written, 0);
    assert_eq!(second.artists_written, 0);
}

#[test]
fn test_rerun_leaves_time_and_users_unchanged() {
    for policy in [UserPolicy::AllRows, UserPolicy::SongPlays] {
        let (_dir, mut config) = fixture();
        config.user_policy = policy;
        let mut conn = fresh_connection();
        diesel::sql_query("PRAGMA foreign_keys = ON")
            .execute(&mut conn)
            .unwrap();

        loader::run(&mut conn, &config).unwrap();
        let times_once = all_times(&mut conn);
        let users_once = all_users(&mut conn);

        let second = loader::run(&mut conn, &config).unwrap();

        assert_eq!(all_times(&mut conn), times_once);
        assert_eq!(all_users(&mut conn), users_once);
        assert_eq!(times_once.len(), 3);
        assert_eq!(second.time_written, 0);
        assert_eq!(second.songs_written, 0);
        assert_eq!(second.artists_written, 0);
    }
}

#[test]
fn test_concatenated_song_file_loads_every_song() {
    let (_dir, config) = fixture();
    fs::remove_dir_all(&config.song_data).unwrap();
    write(&config.song_data, "A/A/TRAAABOTH.json", &format!("{}\n{}\n", HARMONIA, CASUAL));
    let mut conn = fresh_connection();

    let mut stats = loader::LoadStats::default();
    loader::process_data(&mut conn, &config.song_data, "json", &mut stats, loader::process_song_file)
        .unwrap();

    assert_eq!(stats.song_files, 1);
    assert_eq!(stats.songs_written, 2);
    let ids: Vec<String> = all_songs(&mut conn).into_iter().map(|s| s.song_id).collect();
    assert_eq!(ids, vec!["SOKOSMISCH", "SOMZWCG"]);
    assert_eq!(all_artists(&mut conn).len(), 2);
}

#[test]
fn test_non_song_play_rows_produce_no_fact_rows() {
    let (_dir, config) = fixture();
    let mut conn = fresh_connection();
    loader::run(&mut conn, &config).unwrap();

    let plays = all_plays(&mut conn);
    assert_eq!(plays.len(), 3);
    assert!(plays.iter().all(|p| p.user_id == 10 || p.user_id == 11));

    // User 12 only ever visited Settings; the default policy still records them.
    let user_ids: Vec<i32> = all_users(&mut conn).iter().map(|u| u.user_id).collect();
    assert_eq!(user_ids, vec![10, 11, 12]);
}

#[test]
fn test_song_plays_policy_limits_users() {
    let (_dir, mut config) = fixture();
    config.user_policy = UserPolicy::SongPlays;
    let mut conn = fresh_connection();
    loader::run(&mut conn, &config).unwrap();

    let user_ids: Vec<i32> = all_users(&mut conn).iter().map(|u| u.user_id).collect();
    assert_eq!(user_ids, vec![10, 11]);
}

#[test]
fn test_time_rows_match_epoch_calendar_fields() {
    let (_dir, config) = fixture();
    let mut conn = fresh_connection();
    loader::run(&mut conn, &config).unwrap();

    let rows: Vec<TimeRow> = time_dim::table
        .select(TimeRow::as_select())
        .order(time_dim::start_time)
        .load(&mut conn)
        .unwrap();
    assert_eq!(rows.len(), 3);

    for row in &rows {
        let rebuilt = NaiveDate::from_ymd_opt(row.year as i32, row.month as u32, row.day as u32)
            .unwrap()
            .and_hms_opt(row.hour as u32, 0, 0)
            .unwrap();
        assert_eq!(rebuilt.date(), row.start_time.date());
        assert_eq!(rebuilt.hour(), row.start_time.hour());
    }

    // Every fact row points at a time row.
    for play in all_plays(&mut conn) {
        assert!(rows.iter().any(|r| r.start_time == play.start_time));
    }

    let first = timestamp_from_millis(1541106106796).unwrap();
    assert_eq!(rows[0].start_time, first);
}

#[test]
fn test_matching_plays_share_song_and_artist() {
    let (_dir, config) = fixture();
    let mut conn = fresh_connection();
    loader::run(&mut conn, &config).unwrap();

    let matched: Vec<SongPlay> = all_plays(&mut conn)
        .into_iter()
        .filter(|p| p.user_id == 10)
        .collect();
    assert_eq!(matched.len(), 2);
    for play in &matched {
        assert_eq!(play.song_id.as_deref(), Some("SOKOSMISCH"));
        assert_eq!(play.artist_id.as_deref(), Some("ARZ1"));
    }
}

#[test]
fn test_last_seen_user_level_wins() {
    let (_dir, config) = fixture();
    let mut conn = fresh_connection();
    loader::run(&mut conn, &config).unwrap();

    let user = users::table
        .find(10)
        .select(User::as_select())
        .first(&mut conn)
        .unwrap();
    assert_eq!(user.level.as_deref(), Some("paid"));
    assert_eq!(user.first_name.as_deref(), Some("First10"));
}

#[test]
fn test_unmatched_play_is_kept_with_null_references() {
    let (_dir, config) = fixture();
    let mut conn = fresh_connection();
    loader::run(&mut conn, &config).unwrap();

    let unmatched: Vec<SongPlay> = all_plays(&mut conn)
        .into_iter()
        .filter(|p| p.user_id == 11)
        .collect();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].song_id, None);
    assert_eq!(unmatched[0].artist_id, None);
    assert_eq!(unmatched[0].session_id, 139);
}

#[test]
fn test_reset_schema_empties_tables() {
    let (_dir, config) = fixture();
    let mut conn = fresh_connection();
    loader::run(&mut conn, &config).unwrap();

    schema_init::reset_schema(&mut conn).unwrap();

    assert!(all_songs(&mut conn).is_empty());
    assert!(all_users(&mut conn).is_empty());
    assert!(all_plays(&mut conn).is_empty());
}

#[test]
fn test_malformed_log_aborts_but_keeps_earlier_rows() {
    let (dir, config) = fixture();
    write(&config.log_data, "2018/11/2018-11-03-events.json", "{\"page\": \"NextSong\"\n");
    let mut conn = fresh_connection();

    let err = loader::run(&mut conn, &config).unwrap_err();
    assert!(matches!(err, EtlError::Json { record: 1, .. }));

    // Earlier files were committed row by row.
    assert_eq!(all_songs(&mut conn).len(), 2);
    assert_eq!(all_plays(&mut conn).len(), 3);
    drop(dir);
}

#[test]
fn test_missing_log_tree_is_fatal() {
    let (_dir, mut config) = fixture();
    config.log_data = config.log_data.join("missing");
    let mut conn = fresh_connection();

    assert!(matches!(
        loader::run(&mut conn, &config),
        Err(EtlError::Io { .. })
    ));
}

#[test]
fn test_load_through_pooled_connection() {
    let (_dir, config) = fixture();
    let db = Database::connect(&config.database_url).unwrap();
    db.test_connection().unwrap();
    let mut conn = db.get_connection().unwrap();

    schema_init::reset_schema(&mut conn).unwrap();
    let stats = loader::run(&mut conn, &config).unwrap();
    assert_eq!(stats.songplays_written, 3);
}
