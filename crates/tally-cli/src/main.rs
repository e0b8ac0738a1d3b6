use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tally_cli::commands::{daemon, employee, record, report, run, status};
use tally_cli::{Cli, Commands, Config, EmployeeAction};
use tally_engine::{EngineConfig, ScheduleConfig};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(tally_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db =
        tally_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

/// Build engine settings from the loaded configuration.
fn engine_config(config: &Config) -> Result<EngineConfig> {
    let utc_offset = config
        .utc_offset
        .parse()
        .with_context(|| format!("invalid utc_offset {:?} in configuration", config.utc_offset))?;
    Ok(EngineConfig {
        utc_offset,
        workers: config.batch_workers,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Employee { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                EmployeeAction::Add { id, name } => {
                    employee::add(&mut stdout, &db, id, name.as_deref())?;
                }
                EmployeeAction::List => employee::list(&mut stdout, &db)?,
            }
        }
        Some(Commands::Record {
            kind,
            employee,
            at,
            note,
        }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            record::run(&mut stdout, &db, *kind, employee, *at, note.clone())?;
        }
        Some(Commands::Run { week, employee }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let engine = engine_config(&config)?;
            run::run(&mut stdout, Arc::new(db), engine, *week, employee.as_deref())?;
        }
        Some(Commands::Daemon { every_hours }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let engine = engine_config(&config)?;
            let hours = every_hours.unwrap_or(config.schedule_interval_hours);
            let schedule = ScheduleConfig {
                interval: Duration::from_secs(hours * 3600),
            };
            daemon::run(&mut stdout, Arc::new(db), engine, schedule)?;
        }
        Some(Commands::Report {
            employee,
            month,
            week,
            json,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let engine = engine_config(&config)?;
            report::run(
                &mut stdout,
                Arc::new(db),
                engine,
                employee,
                month.as_deref(),
                *week,
                *json,
            )?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, &config.database_path)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
