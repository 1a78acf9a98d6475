//! Diesel ORM runtime infrastructure
//!
//! Connection handling for the warehouse. The backend is picked at build time:
//!
//! - `postgres` (default): PostgreSQL through libpq
//! - `sqlite`: embedded SQLite, used by the integration tests

pub mod database;

pub use database::{Database, DatabaseConfig, DbConnection, Pool, PooledConnection};
