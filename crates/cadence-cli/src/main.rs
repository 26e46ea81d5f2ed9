use clap::Parser;
use cadence_core::db;
use cadence_core::error::CoreError;
use cadence_core::recurrence::MaterializationManager;
use cadence_core::repository::SqliteRepository;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "could not load configuration, using defaults");
            config::Config::default()
        }
    };

    let cli = cli::Cli::parse();

    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let materialization_manager = MaterializationManager::new(config.materialization());
    let repository = SqliteRepository::new(db_pool, materialization_manager);

    let result = match cli.command {
        cli::Commands::Add(command) => commands::add::add_template(&repository, command).await,
        cli::Commands::Templates(command) => {
            commands::templates::list_templates(&repository, command).await
        }
        cli::Commands::Preview(command) => {
            commands::preview::preview_template(&repository, command, &config).await
        }
        cli::Commands::Materialize(command) => {
            commands::materialize::materialize(&repository, command).await
        }
        cli::Commands::Calendar(command) => {
            commands::calendar::show_calendar(&repository, command, &config).await
        }
        cli::Commands::Record(command) => commands::record::add_record(&repository, command).await,
        cli::Commands::Settle(command) => commands::settle::settle_record(&repository, command).await,
        cli::Commands::Move(command) => commands::r#move::move_instance(&repository, command).await,
        cli::Commands::Stop(command) => commands::stop::stop_template(&repository, command).await,
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

/// Logs go to stderr. `CADENCE_LOG` wins over `RUST_LOG`; the default is `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CADENCE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::AmbiguousId(candidates) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, label) in candidates {
                    eprintln!("  {} ({})", id.yellow(), label);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::DuplicateRecord(key, period) => {
                eprintln!(
                    "{} A record for {} already exists in {}",
                    "Error:".style(error_style),
                    key.yellow(),
                    period.yellow()
                );
            }
            CoreError::Database(e) => {
                eprintln!("{} Database error: {}", "Error:".style(error_style), e);
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
