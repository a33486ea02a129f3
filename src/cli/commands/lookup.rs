//! Patient directory inspection: `match` and `patients`.

use console::style;

use medisort::config::Settings;
use medisort::matching::{close_matches, NameMatcher};
use medisort::patients::PatientDirectory;

use crate::cli::icons;

/// Show how a name would be matched.
pub fn cmd_match(settings: &Settings, name: &str) -> anyhow::Result<()> {
    let directory = PatientDirectory::load(&settings.patients);
    let matcher = NameMatcher::new(&settings.matching);
    let threshold = settings.matching.acceptance_threshold;

    let normalized = name.trim().to_uppercase();
    let candidates = directory.lookup_candidates();
    let ranked = close_matches(
        &normalized,
        &candidates,
        settings.matching.max_candidates,
        matcher.cutoff(),
    );

    match matcher.find_patient(name, &directory) {
        Some(result) => {
            let accepted = result.confidence >= threshold;
            println!(
                "{} {} (id {}) confidence {:.3}",
                if accepted { icons::success() } else { icons::warn() },
                style(result.patient.display_name()).bold(),
                result.patient.id,
                result.confidence
            );
            if !accepted {
                println!(
                    "  Below the acceptance threshold ({:.2}): would be rejected as low confidence",
                    threshold
                );
            }
        }
        None => {
            println!(
                "{} No patient within cutoff {:.2} for '{}'",
                icons::error(),
                matcher.cutoff(),
                normalized
            );
        }
    }

    if ranked.len() > 1 {
        println!("  Candidates:");
        for (candidate, score) in ranked {
            println!("    {} {} ({:.3})", icons::bullet(), candidate, score);
        }
    }
    Ok(())
}

/// Print the loaded patient directory.
pub fn cmd_patients(settings: &Settings) -> anyhow::Result<()> {
    let directory = PatientDirectory::load(&settings.patients);
    println!(
        "{} {} patients from {}",
        icons::info(),
        directory.len(),
        directory.source()
    );

    if directory.is_empty() {
        return Ok(());
    }

    let id_width = directory
        .records()
        .iter()
        .map(|p| p.id.chars().count())
        .max()
        .unwrap_or(2)
        .max(2);

    println!("  {:<width$}  NAME", "ID", width = id_width);
    for patient in directory.records() {
        println!(
            "  {:<width$}  {}",
            patient.id,
            patient.display_name(),
            width = id_width
        );
    }
    Ok(())
}
