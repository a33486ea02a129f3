//! Long-running inbox watcher.

use std::sync::Arc;

use medisort::config::Settings;
use medisort::ocr::TextExtractor;
use medisort::patients::PatientDirectory;
use medisort::services::ScanPipeline;
use medisort::watcher::{FolderWatcher, NotifySource};

use super::process::print_summary;
use crate::cli::icons;

/// Watch the inbox until Ctrl-C.
pub async fn cmd_watch(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let directory = Arc::new(PatientDirectory::load(&settings.patients));
    println!(
        "{} {} patients loaded from {}",
        icons::info(),
        directory.len(),
        directory.source()
    );
    if directory.is_empty() {
        println!(
            "{} Patient directory is empty: every document will be rejected",
            icons::warn()
        );
    }

    let extractor = TextExtractor::tesseract(&settings.ocr);
    if !extractor.backend().is_available() {
        println!("{} {}", icons::warn(), extractor.backend().availability_hint());
    }

    let pipeline = Arc::new(ScanPipeline::from_settings(
        settings,
        directory,
        Arc::new(extractor),
    ));
    let stats = pipeline.stats();

    let handle = FolderWatcher::new(
        &settings.inbox_dir,
        settings.watch.clone(),
        NotifySource::new(),
        pipeline,
    )
    .start()?;

    println!(
        "{} Watching {} (Ctrl-C to stop)",
        icons::success(),
        settings.inbox_dir.display()
    );
    println!("  Accepted:  {}", settings.import_dir.display());
    println!("  Processed: {}", settings.processed_dir.display());

    tokio::signal::ctrl_c().await?;
    println!("\n{} Stopping, finishing documents in progress...", icons::info());
    handle.stop().await;

    print_summary(&stats.snapshot());
    Ok(())
}
