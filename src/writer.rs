//! Per-table write policies
//!
//! - `songs`, `artists`, `time`: ignore on conflict (first-seen wins)
//! - `users`: upsert (last-seen wins)
//! - `songplays`: plain insert
//!
//! Each statement runs on its own and commits immediately, so a run that fails
//! half-way can simply be restarted.

use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::upsert::excluded;

use crate::diesel_runtime::DbConnection;
use crate::models::{Artist, NewSongPlay, Song, TimeRow, User};
use crate::schema::{artists, songplays, songs, time_dim, users};
use crate::transform::SongLookup;

/// Write one row with the policy of its table.
pub trait Persist {
    /// Table name, for logging.
    const TABLE: &'static str;

    /// Returns the number of rows written (0 when a duplicate was ignored).
    fn persist(&self, conn: &mut DbConnection) -> Result<usize, DieselError>;
}

impl Persist for Song {
    const TABLE: &'static str = "songs";

    fn persist(&self, conn: &mut DbConnection) -> Result<usize, DieselError> {
        diesel::insert_into(songs::table)
            .values(self)
            .on_conflict(songs::song_id)
            .do_nothing()
            .execute(conn)
    }
}

impl Persist for Artist {
    const TABLE: &'static str = "artists";

    fn persist(&self, conn: &mut DbConnection) -> Result<usize, DieselError> {
        diesel::insert_into(artists::table)
            .values(self)
            .on_conflict(artists::artist_id)
            .do_nothing()
            .execute(conn)
    }
}

impl Persist for TimeRow {
    const TABLE: &'static str = "time";

    fn persist(&self, conn: &mut DbConnection) -> Result<usize, DieselError> {
        diesel::insert_into(time_dim::table)
            .values(self)
            .on_conflict(time_dim::start_time)
            .do_nothing()
            .execute(conn)
    }
}

impl Persist for User {
    const TABLE: &'static str = "users";

    fn persist(&self, conn: &mut DbConnection) -> Result<usize, DieselError> {
        diesel::insert_into(users::table)
            .values(self)
            .on_conflict(users::user_id)
            .do_update()
            .set((
                users::first_name.eq(excluded(users::first_name)),
                users::last_name.eq(excluded(users::last_name)),
                users::gender.eq(excluded(users::gender)),
                users::level.eq(excluded(users::level)),
            ))
            .execute(conn)
    }
}

impl Persist for NewSongPlay {
    const TABLE: &'static str = "songplays";

    fn persist(&self, conn: &mut DbConnection) -> Result<usize, DieselError> {
        diesel::insert_into(songplays::table)
            .values(self)
            .execute(conn)
    }
}

/// Find `(song_id, artist_id)` by exact title, artist name and duration.
///
/// Ties are broken by song id so repeated lookups agree.
pub fn find_song(
    conn: &mut DbConnection,
    key: SongLookup<'_>,
) -> Result<Option<(String, String)>, DieselError> {
    songs::table
        .inner_join(artists::table)
        .filter(songs::title.eq(key.title))
        .filter(artists::name.eq(key.artist_name))
        .filter(songs::duration.eq(key.duration))
        .select((songs::song_id, songs::artist_id))
        .order(songs::song_id.asc())
        .first::<(String, String)>(conn)
        .optional()
}
