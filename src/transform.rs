//! Record to row transformations
//!
//! Everything here is pure: song/artist lookups against the database happen in
//! the loader, on the [`PendingSongPlay`] values produced by [`LogBatch::from_records`].

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use indexmap::IndexMap;
use std::path::Path;

use crate::config::UserPolicy;
use crate::error::EtlError;
use crate::models::{Artist, NewSongPlay, Song, TimeRow, User};
use crate::records::{LogRecord, SongRecord};

impl SongRecord {
    pub fn to_song(&self) -> Song {
        Song {
            song_id: self.song_id.clone(),
            title: self.title.clone(),
            artist_id: self.artist_id.clone(),
            year: self.year,
            duration: self.duration,
        }
    }

    pub fn to_artist(&self) -> Artist {
        Artist {
            artist_id: self.artist_id.clone(),
            name: self.artist_name.clone(),
            location: self.artist_location.clone(),
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        }
    }
}

/// Convert epoch milliseconds to a UTC timestamp.
pub fn timestamp_from_millis(ms: i64) -> Result<NaiveDateTime, EtlError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .ok_or(EtlError::Timestamp(ms))
}

/// Split a timestamp into its time-dimension attributes.
pub fn decompose(start_time: NaiveDateTime) -> Result<TimeRow, EtlError> {
    let year = i16::try_from(start_time.year())
        .map_err(|_| EtlError::Timestamp(start_time.and_utc().timestamp_millis()))?;

    // The remaining fields are bounded by the calendar (hour < 24, week <= 53, ...).
    Ok(TimeRow {
        start_time,
        hour: start_time.hour() as i16,
        day: start_time.day() as i16,
        week: start_time.iso_week().week() as i16,
        month: start_time.month() as i16,
        year,
        weekday: start_time.weekday().num_days_from_monday() as i16,
    })
}

/// A song play whose song and artist ids are still to be looked up.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSongPlay {
    pub start_time: NaiveDateTime,
    pub user_id: i32,
    pub level: Option<String>,
    pub session_id: i32,
    pub location: Option<String>,
    pub user_agent: Option<String>,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
}

/// Lookup key into `songs ⋈ artists`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SongLookup<'a> {
    pub title: &'a str,
    pub artist_name: &'a str,
    pub duration: f64,
}

impl PendingSongPlay {
    /// `None` when the row lacks any of title, artist or length; such plays can never match.
    pub fn lookup_key(&self) -> Option<SongLookup<'_>> {
        Some(SongLookup {
            title: self.song.as_deref()?,
            artist_name: self.artist.as_deref()?,
            duration: self.length?,
        })
    }

    /// Compose the fact row from the lookup result `(song_id, artist_id)`.
    pub fn into_song_play(self, matched: Option<(String, String)>) -> NewSongPlay {
        let (song_id, artist_id) = match matched {
            Some((song_id, artist_id)) => (Some(song_id), Some(artist_id)),
            None => (None, None),
        };
        NewSongPlay {
            start_time: self.start_time,
            user_id: self.user_id,
            level: self.level,
            song_id,
            artist_id,
            session_id: self.session_id,
            location: self.location,
            user_agent: self.user_agent,
        }
    }
}

/// Rows derived from one activity-log file, in write order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogBatch {
    /// One row per distinct song-play timestamp, first-seen order.
    pub time_rows: Vec<TimeRow>,
    /// Every user occurrence in file order; later rows overwrite earlier ones on write.
    pub users: Vec<User>,
    pub plays: Vec<PendingSongPlay>,
    /// Rows dropped by the song-play filter.
    pub skipped: usize,
}

impl LogBatch {
    /// Reshape the rows of one log file. `path` is only used for error context.
    pub fn from_records(
        path: &Path,
        records: &[LogRecord],
        policy: UserPolicy,
    ) -> Result<Self, EtlError> {
        let mut times: IndexMap<NaiveDateTime, TimeRow> = IndexMap::new();
        let mut batch = LogBatch::default();

        for (index, record) in records.iter().enumerate() {
            let is_play = record.is_song_play();

            if is_play || policy == UserPolicy::AllRows {
                if let Some(user) = user_row(record) {
                    batch.users.push(user);
                }
            }

            if !is_play {
                batch.skipped += 1;
                continue;
            }

            let user_id = record.user_id.ok_or_else(|| EtlError::InvalidRecord {
                path: path.to_path_buf(),
                record: index + 1,
                reason: "song play without userId".to_string(),
            })?;

            let time_row = timestamp_from_millis(record.ts)
                .and_then(decompose)
                .map_err(|e| EtlError::InvalidRecord {
                    path: path.to_path_buf(),
                    record: index + 1,
                    reason: e.to_string(),
                })?;
            let start_time = time_row.start_time;
            times.entry(start_time).or_insert(time_row);

            batch.plays.push(PendingSongPlay {
                start_time,
                user_id,
                level: record.level.clone(),
                session_id: record.session_id,
                location: record.location.clone(),
                user_agent: record.user_agent.clone(),
                song: record.song.clone(),
                artist: record.artist.clone(),
                length: record.length,
            });
        }

        batch.time_rows = times.into_values().collect();
        Ok(batch)
    }
}

fn user_row(record: &LogRecord) -> Option<User> {
    Some(User {
        user_id: record.user_id?,
        first_name: record.first_name.clone(),
        last_name: record.last_name.clone(),
        gender: record.gender.clone(),
        level: record.level.clone(),
    })
}
