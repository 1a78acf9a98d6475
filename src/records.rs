//! Typed source records
//!
//! Song files hold one JSON object (several concatenated objects are accepted);
//! activity logs are newline-delimited JSON. Both are validated here, so the
//! transformation layer only sees well-formed records.

use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

use crate::error::EtlError;

/// Page value marking a song-play event in the activity log.
pub const SONG_PLAY_PAGE: &str = "NextSong";

/// Song metadata record, one per song file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub artist_name: String,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
    pub year: i16,
    pub duration: f64,
    #[serde(default)]
    pub num_songs: Option<u32>,
}

/// One row of a user-activity log.
///
/// Only `page`, `ts` and `sessionId` are required on every row; the song fields
/// are null outside of song plays and the user fields are null for logged-out traffic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub auth: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub item_in_session: Option<i64>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    pub page: String,
    #[serde(default)]
    pub registration: Option<f64>,
    pub session_id: i32,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub status: Option<i32>,
    pub ts: i64,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "deserialize_user_id")]
    pub user_id: Option<i32>,
}

impl LogRecord {
    pub fn is_song_play(&self) -> bool {
        self.page == SONG_PLAY_PAGE
    }
}

/// `userId` shows up as `"39"`, `39`, `""` or `null`; the last two mean "no user".
fn deserialize_user_id<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawUserId {
        Int(i64),
        Text(String),
    }

    match Option::<RawUserId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawUserId::Int(id)) => i32::try_from(id)
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("userId {} out of range", id))),
        Some(RawUserId::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed
                    .parse::<i32>()
                    .map(Some)
                    .map_err(|_| serde::de::Error::custom(format!("invalid userId '{}'", text)))
            }
        }
    }
}

pub fn read_song_file(path: &Path) -> Result<Vec<SongRecord>, EtlError> {
    let contents = fs::read_to_string(path).map_err(|e| EtlError::io(path, e))?;
    parse_song_records(path, &contents)
}

pub fn read_log_file(path: &Path) -> Result<Vec<LogRecord>, EtlError> {
    let contents = fs::read_to_string(path).map_err(|e| EtlError::io(path, e))?;
    parse_log_records(path, &contents)
}

/// Parse every JSON object in a song file. `path` is only used for error context.
pub fn parse_song_records(path: &Path, contents: &str) -> Result<Vec<SongRecord>, EtlError> {
    let mut records = Vec::new();
    for (index, record) in serde_json::Deserializer::from_str(contents)
        .into_iter::<SongRecord>()
        .enumerate()
    {
        let record = record.map_err(|source| EtlError::Json {
            path: path.to_path_buf(),
            record: index + 1,
            source,
        })?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(EtlError::InvalidRecord {
            path: path.to_path_buf(),
            record: 0,
            reason: "song file contains no records".to_string(),
        });
    }
    Ok(records)
}

/// Parse a newline-delimited log file; blank lines are skipped and record numbers
/// in errors are 1-based line numbers.
pub fn parse_log_records(path: &Path, contents: &str) -> Result<Vec<LogRecord>, EtlError> {
    let mut records = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: LogRecord = serde_json::from_str(line).map_err(|source| EtlError::Json {
            path: path.to_path_buf(),
            record: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
