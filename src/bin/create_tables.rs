//! create-tables - (re)initialize the song-play star schema
//!
//! Drops every table of the schema and creates them again, empty.

use clap::Parser;
use std::path::PathBuf;
use std::process;

use sparkload::{schema_init, Database, DatabaseConfig, EtlError, WarehouseConfig};

#[derive(Parser)]
#[command(name = "create-tables")]
#[command(version, about = "Drop and recreate the song-play star schema", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target database URL (overrides DATABASE_URL)
    #[arg(short, long)]
    database_url: Option<String>,

    /// Drop and recreate the whole database before creating the tables
    #[arg(long)]
    recreate_database: bool,

    /// Database to connect to while recreating the target database
    #[arg(long)]
    maintenance_url: Option<String>,
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
    if let Some(url) = cli.maintenance_url {
        config.maintenance_url = url;
    }

    if cli.recreate_database {
        schema_init::recreate_database(&config.maintenance_url, &config.database_url)?;
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
    schema_init::reset_schema(&mut conn)?;

    println!("✅ All tables were successfully created!");
    Ok(())
}
