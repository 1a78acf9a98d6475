//! Drop and recreate the star schema
//!
//! Tables are dropped fact-first and created dimensions-first so the
//! `songplays` references resolve on backends that enforce them.

use diesel::prelude::*;

use crate::diesel_runtime::DbConnection;
use crate::error::EtlError;

/// Drop order: the fact table first, then the dimensions it references.
pub const TABLE_NAMES: [&str; 5] = ["songplays", "users", "songs", "artists", "time"];

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
mod ddl {
    pub const SONGPLAY_ID: &str = "songplay_id SERIAL PRIMARY KEY";
    pub const FLOAT: &str = "DOUBLE PRECISION";
}

#[cfg(feature = "sqlite")]
mod ddl {
    pub const SONGPLAY_ID: &str = "songplay_id INTEGER PRIMARY KEY AUTOINCREMENT";
    pub const FLOAT: &str = "REAL";
}

/// `CREATE TABLE` statements in creation order.
pub fn create_table_queries() -> Vec<String> {
    vec![
        "CREATE TABLE IF NOT EXISTS users (\n  \
           user_id INTEGER PRIMARY KEY,\n  \
           first_name VARCHAR,\n  \
           last_name VARCHAR,\n  \
           gender VARCHAR,\n  \
           level VARCHAR\n\
         )"
        .to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS songs (\n  \
               song_id VARCHAR PRIMARY KEY,\n  \
               title VARCHAR NOT NULL,\n  \
               artist_id VARCHAR NOT NULL,\n  \
               year SMALLINT NOT NULL,\n  \
               duration {float} NOT NULL\n\
             )",
            float = ddl::FLOAT
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS artists (\n  \
               artist_id VARCHAR PRIMARY KEY,\n  \
               name VARCHAR NOT NULL,\n  \
               location VARCHAR,\n  \
               latitude {float},\n  \
               longitude {float}\n\
             )",
            float = ddl::FLOAT
        ),
        "CREATE TABLE IF NOT EXISTS \"time\" (\n  \
           start_time TIMESTAMP PRIMARY KEY,\n  \
           hour SMALLINT NOT NULL,\n  \
           day SMALLINT NOT NULL,\n  \
           week SMALLINT NOT NULL,\n  \
           month SMALLINT NOT NULL,\n  \
           year SMALLINT NOT NULL,\n  \
           weekday SMALLINT NOT NULL\n\
         )"
        .to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS songplays (\n  \
               {id},\n  \
               start_time TIMESTAMP NOT NULL REFERENCES \"time\" (start_time),\n  \
               user_id INTEGER NOT NULL REFERENCES users (user_id),\n  \
               level VARCHAR,\n  \
               song_id VARCHAR REFERENCES songs (song_id),\n  \
               artist_id VARCHAR REFERENCES artists (artist_id),\n  \
               session_id INTEGER NOT NULL,\n  \
               location VARCHAR,\n  \
               user_agent VARCHAR\n\
             )",
            id = ddl::SONGPLAY_ID
        ),
    ]
}

pub fn drop_table_queries() -> Vec<String> {
    TABLE_NAMES
        .iter()
        .map(|table| format!("DROP TABLE IF EXISTS \"{}\"", table))
        .collect()
}

pub fn execute_queries(conn: &mut DbConnection, queries: &[String]) -> Result<(), EtlError> {
    for query in queries {
        diesel::sql_query(query.as_str()).execute(conn)?;
    }
    Ok(())
}

/// Drop every known table and create all of them again, leaving an empty schema.
pub fn reset_schema(conn: &mut DbConnection) -> Result<(), EtlError> {
    execute_queries(conn, &drop_table_queries())?;
    tracing::debug!("Dropped tables: {}", TABLE_NAMES.join(", "));

    execute_queries(conn, &create_table_queries())?;
    tracing::info!("Created {} tables", TABLE_NAMES.len());
    Ok(())
}

/// Drop and recreate the target database through a maintenance database.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub fn recreate_database(maintenance_url: &str, database_url: &str) -> Result<(), EtlError> {
    use crate::config::{database_name, is_plain_identifier, redact_url};
    use diesel::pg::PgConnection;

    let dbname = database_name(database_url).ok_or_else(|| {
        EtlError::Config(format!(
            "cannot determine database name from {}",
            redact_url(database_url)
        ))
    })?;
    if !is_plain_identifier(dbname) {
        return Err(EtlError::Config(format!("invalid database name '{}'", dbname)));
    }

    let mut conn = PgConnection::establish(maintenance_url)?;
    tracing::info!("Connected to {}", redact_url(maintenance_url));

    diesel::sql_query(format!("DROP DATABASE IF EXISTS {}", dbname)).execute(&mut conn)?;
    diesel::sql_query(format!(
        "CREATE DATABASE {} WITH ENCODING 'UTF8' TEMPLATE template0",
        dbname
    ))
    .execute(&mut conn)?;

    tracing::info!("Recreated database {}", dbname);
    Ok(())
}

/// Remove the database file; it is created again on the next connection.
#[cfg(feature = "sqlite")]
pub fn recreate_database(_maintenance_url: &str, database_url: &str) -> Result<(), EtlError> {
    let path = std::path::Path::new(database_url);
    if database_url == ":memory:" || !path.exists() {
        return Ok(());
    }
    std::fs::remove_file(path).map_err(|e| EtlError::io(path, e))?;
    tracing::info!("Removed database file {}", path.display());
    Ok(())
}
