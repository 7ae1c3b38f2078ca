use anyhow::{Context, Result};
use clap::Parser;
use repodeck::adapters::persistence::FileConfigStore;
use repodeck::cli::{CliArgs, CliCommand, DevCommand};
use repodeck::logging::{self, Fallback};
use repodeck::services::AppService;
use repodeck::tui;
use repodeck_core::app::SyncProgress;
use repodeck_core::cancel::CancelToken;
use repodeck_core::ports::ConfigStore;
use tracing::{error, info};

fn main() {
    if let Err(err) = run() {
        error!(error = %err, "repodeck failed");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();
    let command = args.command();

    let store = FileConfigStore::resolve(args.config)?;
    let config = store.load()?;

    // the search UI owns the terminal
    let fallback = match command {
        CliCommand::Search => Fallback::Discard,
        _ => Fallback::Stderr,
    };
    logging::init(&config.logs, fallback)?;
    info!(config = %store.path().display(), command = ?command, "starting repodeck");

    if let CliCommand::Dev(DevCommand::Config) = command {
        print!("{}", toml::to_string_pretty(&config).context("Failed to render configuration")?);
        return Ok(());
    }

    let service = AppService::new(config)?;
    match command {
        CliCommand::Cache => {
            let progress = |progress: SyncProgress| {
                eprintln!(
                    "[{}/{}] {} repositories",
                    progress.sources_done, progress.sources_total, progress.repositories
                );
            };
            let cancel = CancelToken::new();
            let on_interrupt = cancel.clone();
            ctrlc::set_handler(move || {
                eprintln!("Interrupted, cancelling sync");
                on_interrupt.cancel();
            })
            .context("Failed to install Ctrl+C handler")?;

            let summary = service.cache(&cancel, &progress)?;
            println!(
                "Cached {} repositories from {} sources",
                summary.repositories, summary.sources
            );
        }
        CliCommand::Search => {
            if let Some(message) = tui::run(&service)? {
                println!("{message}");
            }
        }
        CliCommand::List => {
            for repo in service.projection()?.iter() {
                println!("{}", repo.display_name());
            }
        }
        CliCommand::Readme { repo } => {
            let repo = service.find(&repo)?;
            println!("{}", service.readme(&repo)?);
        }
        CliCommand::Refresh { repo } => {
            let repo = service.refresh(&repo)?;
            println!("Refreshed {}", repo.display_name());
        }
        CliCommand::Dev(_) => {}
    }
    Ok(())
}
