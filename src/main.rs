//! medisort - automatic filing of scanned medical documents.

mod cli;

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    let (settings, config) = cli::load_settings(&cli).await?;

    init_logging(cli.verbose, settings.log_file.as_deref());

    cli::run(cli, settings, config).await
}

/// Log to stdout and, if configured, append to the log file.
fn init_logging(verbose: bool, log_file: Option<&Path>) {
    let default_filter = if verbose {
        "medisort=debug"
    } else {
        "medisort=info"
    };

    let file_layer = log_file.and_then(|path| match open_log_file(path) {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        ),
        Err(e) => {
            eprintln!("{:#}", e);
            None
        }
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
}

/// Open the log file for appending, creating its directory first.
fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("medisort.log");
        open_log_file(&path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_bad_log_directory_reports_cause() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("logs");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = open_log_file(&blocker.join("medisort.log")).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.starts_with("Cannot create log directory"));
        assert!(message.contains(&blocker.display().to_string()));
    }
}
