//! Extract-transform-load over the song and log trees
//!
//! Song files are loaded first so that song plays can be matched against the
//! song and artist dimensions.

use std::fmt;
use std::path::Path;

use crate::config::{UserPolicy, WarehouseConfig};
use crate::diesel_runtime::DbConnection;
use crate::discovery::find_files;
use crate::error::EtlError;
use crate::records::{read_log_file, read_song_file};
use crate::transform::LogBatch;
use crate::writer::{find_song, Persist};

/// Row counters for a load; "written" counts exclude ignored duplicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub song_files: usize,
    pub log_files: usize,
    pub songs_written: usize,
    pub artists_written: usize,
    pub time_written: usize,
    pub users_written: usize,
    pub songplays_written: usize,
    pub songplays_matched: usize,
    pub rows_skipped: usize,
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} song files, {} log files; rows written: songs={} artists={} time={} users={} songplays={} ({} matched); {} non-play rows skipped",
            self.song_files,
            self.log_files,
            self.songs_written,
            self.artists_written,
            self.time_written,
            self.users_written,
            self.songplays_written,
            self.songplays_matched,
            self.rows_skipped,
        )
    }
}

/// Load one song file into `songs` and `artists`.
pub fn process_song_file(
    conn: &mut DbConnection,
    path: &Path,
    stats: &mut LoadStats,
) -> Result<(), EtlError> {
    for record in read_song_file(path)? {
        stats.songs_written += record.to_song().persist(conn)?;
        stats.artists_written += record.to_artist().persist(conn)?;
    }
    stats.song_files += 1;
    Ok(())
}

/// Load one activity-log file into `time`, `users` and `songplays`.
pub fn process_log_file(
    conn: &mut DbConnection,
    path: &Path,
    policy: UserPolicy,
    stats: &mut LoadStats,
) -> Result<(), EtlError> {
    let records = read_log_file(path)?;
    let batch = LogBatch::from_records(path, &records, policy)?;
    stats.rows_skipped += batch.skipped;

    for row in &batch.time_rows {
        stats.time_written += row.persist(conn)?;
    }

    for user in &batch.users {
        stats.users_written += user.persist(conn)?;
    }

    for pending in batch.plays {
        let matched = match pending.lookup_key() {
            Some(key) => find_song(conn, key)?,
            None => None,
        };
        if matched.is_some() {
            stats.songplays_matched += 1;
        }
        stats.songplays_written += pending.into_song_play(matched).persist(conn)?;
    }

    stats.log_files += 1;
    Ok(())
}

/// Run `func` on every record file under `root`.
pub fn process_data<F>(
    conn: &mut DbConnection,
    root: &Path,
    extension: &str,
    stats: &mut LoadStats,
    mut func: F,
) -> Result<(), EtlError>
where
    F: FnMut(&mut DbConnection, &Path, &mut LoadStats) -> Result<(), EtlError>,
{
    let files = find_files(root, extension)?;
    let total = files.len();
    tracing::info!("{} files found in \"{}\"", total, root.display());

    for (i, file) in files.iter().enumerate() {
        func(conn, file, stats)?;
        tracing::info!("{:03}/{:03} files processed", i + 1, total);
    }
    Ok(())
}

/// Load the song tree, then the log tree.
pub fn run(conn: &mut DbConnection, config: &WarehouseConfig) -> Result<LoadStats, EtlError> {
    let mut stats = LoadStats::default();

    process_data(
        conn,
        &config.song_data,
        &config.extension,
        &mut stats,
        process_song_file,
    )?;
    tracing::info!(
        songs = stats.songs_written,
        artists = stats.artists_written,
        "Song data loaded"
    );

    let policy = config.user_policy;
    process_data(
        conn,
        &config.log_data,
        &config.extension,
        &mut stats,
        |conn, path, stats| process_log_file(conn, path, policy, stats),
    )?;
    tracing::info!(
        time = stats.time_written,
        users = stats.users_written,
        songplays = stats.songplays_written,
        matched = stats.songplays_matched,
        "Log data loaded"
    );

    Ok(stats)
}
