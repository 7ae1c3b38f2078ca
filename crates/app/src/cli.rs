use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::adapters::persistence::CONFIG_ENV;

#[derive(Parser, Debug, PartialEq)]
#[command(name = "repodeck", version)]
#[command(about = "Sync, search, and act on your remote repositories from the terminal")]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Sync every configured source into the local store
    Cache,
    /// Search stored repositories interactively (default)
    Search,
    /// Print every stored repository
    List,
    /// Print a repository's readme
    Readme {
        /// Repository as owner/name
        repo: String,
    },
    /// Re-fetch a single repository from its provider
    Refresh {
        /// Repository as owner/name
        repo: String,
    },
    #[command(hide = true, subcommand)]
    Dev(DevCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DevCommand {
    /// Print the effective configuration
    Config,
}

impl CliArgs {
    pub fn command(&self) -> CliCommand {
        self.command.clone().unwrap_or(CliCommand::Search)
    }
}
