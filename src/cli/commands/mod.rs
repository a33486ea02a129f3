//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod init;
mod lookup;
mod process;
mod watch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use medisort::config::{load_settings_with_options, Config, LoadOptions, Settings};

#[derive(Parser)]
#[command(name = "medisort")]
#[command(about = "Automatic filing of scanned medical documents")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Inbox directory to watch (overrides config file)
    #[arg(long, global = true, env = "MEDISORT_INBOX")]
    inbox: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the inbox and file documents as they arrive
    Watch,

    /// Process documents once and print a report
    Process {
        /// Files or directories (directories are not descended into)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Route documents without moving them
        #[arg(long)]
        dry_run: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Match a name against the patient directory
    Match {
        /// Name as it would appear on a document, e.g. "DUPONT Jean"
        name: String,
    },

    /// List the loaded patient directory
    Patients,

    /// Check OCR tools, directories and the patient source
    Check,

    /// Create directories, an example patient file and a config file
    Init {
        /// Overwrite existing patient and config files
        #[arg(long)]
        force: bool,
    },
}

/// Load settings using the global CLI flags.
pub async fn load_settings(cli: &Cli) -> anyhow::Result<(Settings, Config)> {
    let options = LoadOptions {
        config_path: cli.config.clone(),
        inbox_dir: cli.inbox.clone(),
    };
    Ok(load_settings_with_options(options).await?)
}

/// Run the parsed command.
pub async fn run(cli: Cli, settings: Settings, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Watch => watch::cmd_watch(&settings).await,
        Commands::Process {
            paths,
            dry_run,
            json,
        } => process::cmd_process(&settings, &paths, dry_run, json).await,
        Commands::Match { name } => lookup::cmd_match(&settings, &name),
        Commands::Patients => lookup::cmd_patients(&settings),
        Commands::Check => check::cmd_check(&settings),
        Commands::Init { force } => init::cmd_init(&settings, &config, cli.config, force).await,
    }
}
