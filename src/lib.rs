//! # Sparkload: song-play star-schema loader
//!
//! Sparkload reads song metadata files and user-activity logs and loads them
//! into a star schema for analytical queries:
//!
//! - **Fact**: `songplays`, one row per `NextSong` event
//! - **Dimensions**: `users`, `songs`, `artists`, `time`
//!
//! ## Features
//!
//! - **Schema initializer**: drop and recreate all five tables (`create-tables` binary)
//! - **Loader**: walk the song and log trees and insert rows (`etl` binary)
//! - **Idempotent writes**: dimensions ignore duplicates, users are upserted (last-seen wins)
//! - **Backends**: PostgreSQL (feature `postgres`, default) or SQLite (feature `sqlite`)
//!
//! ## Example
//!
//! ```ignore
//! use sparkload::{loader, schema_init, Database, WarehouseConfig};
//!
//! let config = WarehouseConfig::load(None)?;
//! let db = Database::connect(&config.database_url)?;
//! let mut conn = db.get_connection()?;
//!
//! schema_init::reset_schema(&mut conn)?;
//! let stats = loader::run(&mut conn, &config)?;
//! println!("{}", stats);
//! ```

pub mod config;
pub mod error;
pub mod records;
pub mod transform;
pub mod discovery;

// Persistence
pub mod diesel_runtime;
pub mod schema;
pub mod models;
pub mod schema_init;
pub mod writer;

pub mod loader;

// Re-export key types
pub use config::{UserPolicy, WarehouseConfig};
pub use error::EtlError;
pub use diesel_runtime::{Database, DatabaseConfig, DbConnection};
pub use loader::LoadStats;
pub use writer::Persist;

/// Install the fmt subscriber used by the binaries (`RUST_LOG`, default `info`).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
