//! One-shot batch processing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use medisort::config::Settings;
use medisort::models::{FailureReason, ProcessingOutcome, StatsSnapshot};
use medisort::ocr::TextExtractor;
use medisort::patients::PatientDirectory;
use medisort::services::ScanPipeline;
use medisort::watcher::should_ignore;

use crate::cli::icons;

#[derive(Serialize)]
struct BatchReport<'a> {
    dry_run: bool,
    documents: &'a [ProcessingOutcome],
    summary: StatsSnapshot,
}

/// Expand directories (one level) into their files, sorted by name.
fn collect_documents(
    paths: &[PathBuf],
    ignored_suffixes: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| !should_ignore(p, ignored_suffixes))
                .collect();
            entries.sort();
            documents.extend(entries);
        } else if path.exists() {
            documents.push(path.clone());
        } else {
            anyhow::bail!("No such file: {}", path.display());
        }
    }
    Ok(documents)
}

/// Process documents once.
pub async fn cmd_process(
    settings: &Settings,
    paths: &[PathBuf],
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let documents = collect_documents(paths, &settings.watch.ignored_suffixes)?;
    if documents.is_empty() {
        println!("{} No documents to process", icons::warn());
        return Ok(());
    }

    let directory = Arc::new(PatientDirectory::load(&settings.patients));
    let extractor = Arc::new(TextExtractor::tesseract(&settings.ocr));
    let pipeline = ScanPipeline::from_settings(settings, directory, extractor).dry_run(dry_run);
    let stats = pipeline.stats();

    let progress = if json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(documents.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb
    };

    let pb = progress.clone();
    let outcomes = tokio::task::spawn_blocking(move || {
        documents
            .iter()
            .map(|path| {
                pb.set_message(file_label(path));
                let outcome = pipeline.handle(path);
                if !json {
                    pb.println(outcome_line(&outcome));
                }
                pb.inc(1);
                outcome
            })
            .collect::<Vec<_>>()
    })
    .await?;
    progress.finish_and_clear();

    let summary = stats.snapshot();
    if json {
        let report = BatchReport {
            dry_run,
            documents: &outcomes,
            summary,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if dry_run {
            println!("{} Dry run: no files were moved", icons::info());
        }
        print_summary(&summary);
    }
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn outcome_line(outcome: &ProcessingOutcome) -> String {
    let name = file_label(outcome.source_path());
    match outcome {
        ProcessingOutcome::Success {
            patient_id,
            surname,
            given_name,
            confidence,
            ..
        } => format!(
            "{} {} {} {} {} (id {}, {:.0}%)",
            icons::success(),
            name,
            icons::info(),
            surname,
            given_name,
            patient_id,
            confidence * 100.0
        ),
        ProcessingOutcome::Failure {
            reason,
            extracted_name,
            confidence,
            ..
        } => {
            let mut line = format!("{} {}: {}", icons::error(), name, reason.describe());
            if let Some(extracted) = extracted_name {
                line.push_str(&format!(" [{}]", extracted));
            }
            if let Some(c) = confidence {
                line.push_str(&format!(" ({:.0}%)", c * 100.0));
            }
            line
        }
    }
}

/// Print success rate and failures per reason.
pub fn print_summary(summary: &StatsSnapshot) {
    println!();
    println!("{}", style("Summary").bold());
    println!("  Documents: {}", summary.total);
    println!(
        "  Accepted:  {} ({:.1}%)",
        style(summary.success).green(),
        summary.success_rate()
    );
    println!("  Rejected:  {}", style(summary.failed()).red());
    for reason in FailureReason::ALL {
        let count = summary.count_for(reason);
        if count > 0 {
            println!("    {} {}: {}", icons::bullet(), reason.describe(), count);
        }
    }
}
