//! etl - load song and activity-log files into the star schema
//!
//! Run `create-tables` first; this binary only inserts.

use clap::Parser;
use std::path::PathBuf;
use std::process;

use sparkload::{loader, Database, DatabaseConfig, EtlError, UserPolicy, WarehouseConfig};

#[derive(Parser)]
#[command(name = "etl")]
#[command(version, about = "Load song and activity-log files into the star schema", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target database URL (overrides DATABASE_URL)
    #[arg(short, long)]
    database_url: Option<String>,

    /// Root of the song metadata tree
    #[arg(long)]
    song_data: Option<PathBuf>,

    /// Root of the activity-log tree
    #[arg(long)]
    log_data: Option<PathBuf>,

    /// Extension of record files
    #[arg(short, long)]
    extension: Option<String>,

    /// Which log rows feed the users table
    #[arg(long, value_enum)]
    user_policy: Option<UserPolicy>,
}

fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    sparkload::init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("❌ {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), EtlError> {
    let mut config = WarehouseConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    if let Some(dir) = cli.song_data {
        config.song_data = dir;
    }
    if let Some(dir) = cli.log_data {
        config.log_data = dir;
    }
    if let Some(extension) = cli.extension {
        config.extension = extension;
    }
    if let Some(policy) = cli.user_policy {
        config.user_policy = policy;
    }

    let db = Database::connect_with_config(
        &config.database_url,
        DatabaseConfig {
            connection_timeout_secs: config.connection_timeout_secs,
        },
    )?;
    db.test_connection()?;
    tracing::info!("Connected to {}", config.redacted_database_url());

    let mut conn = db.get_connection()?;
    let stats = loader::run(&mut conn, &config)?;

    println!("✅ {}", stats);
    Ok(())
}
