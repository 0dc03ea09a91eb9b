//! MACON Sync
//!
//! Keeps controller variables and database records in step.
//!
//! # Commands
//!
//! - `sync` - Run the reconciliation loop forever (default)
//! - `push` - Write the current records to the controller once
//! - `pull` - Read the controller into the current records once
//! - `backup` - Export the three collections to JSON files

mod commands;
mod config;
mod error;
mod logging;

use clap::{Parser, ValueEnum};
use config::AppConfig;
use error::CliResult;
use macon_ads::AdsClient;
use macon_mongo::MongoStore;
use macon_sync_engine::IntervalTicker;
use std::path::PathBuf;
use tracing::{error, info};

/// Two-way sync between a TwinCAT controller and MongoDB.
#[derive(Parser, Debug)]
#[command(name = "macon-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// What to do. Unknown commands are rejected, not run as sync
    #[arg(value_enum, ignore_case = true, default_value_t = Command::Sync)]
    command: Command,

    /// Configuration file (JSON)
    #[arg(short, long, env = "MACON_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Directory for backup files
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Field mapping table (JSON) replacing the built-in one
    #[arg(long)]
    mappings: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Command {
    /// Run the reconciliation loop forever
    Sync,
    /// Write the current records to the controller once
    Push,
    /// Read the controller into the current records once
    Pull,
    /// Export the three collections once
    Backup,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(
        cli.log_dir,
        cli.backup_dir,
        cli.mappings,
    );
    let _guard = logging::init(&config.log_dir, cli.verbose)?;

    if let Err(e) = run(cli.command, &config) {
        error!(error = %e, "{:?} failed", cli.command);
        return Err(e.into());
    }
    Ok(())
}

fn run(command: Command, config: &AppConfig) -> CliResult<()> {
    let registry = config.registry()?;
    info!(
        command = ?command,
        fields = registry.len(),
        mappings = ?config.mappings,
        "starting"
    );

    match command {
        Command::Sync => {
            let (device, store) = open_sessions(config)?;
            let mut ticker = IntervalTicker::new(config.poll_interval());
            commands::sync::run(config.sync_config(), registry, device, store, &mut ticker);
        }
        Command::Push => {
            let (device, store) = open_sessions(config)?;
            let summary = commands::push::run(&device, &store, &registry, &config.domains);
            commands::ensure_complete("push", &summary)?;
        }
        Command::Pull => {
            let (device, store) = open_sessions(config)?;
            let summary = commands::pull::run(&device, &store, &registry, &config.domains);
            commands::ensure_complete("pull", &summary)?;
        }
        Command::Backup => {
            let store = MongoStore::connect(&config.mongo_uri)?;
            commands::backup::run(&store, &config.domains, &config.backup_dir)?;
        }
    }
    Ok(())
}

/// Opens the controller and database sessions. Either failing is fatal.
fn open_sessions(config: &AppConfig) -> CliResult<(AdsClient, MongoStore)> {
    let device = AdsClient::connect(config.device.clone(), config.reconnect())?;
    let store = MongoStore::connect(&config.mongo_uri)?;
    Ok((device, store))
}
