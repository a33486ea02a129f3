//! Prerequisite check.

use std::path::Path;

use console::style;

use medisort::config::Settings;
use medisort::ocr::{check_binary, check_pdftoppm_hint, languages_installed, tesseract_languages};
use medisort::patients::PatientDirectory;

use crate::cli::icons;

fn report(ok: bool, label: &str, detail: &str) {
    let icon = if ok { icons::success() } else { icons::error() };
    println!("  {} {}: {}", icon, label, detail);
}

fn report_dir(label: &str, dir: &Path) {
    if dir.is_dir() {
        report(true, label, &dir.display().to_string());
    } else {
        println!(
            "  {} {}: {} (missing, created by `medisort init` or `medisort watch`)",
            icons::warn(),
            label,
            dir.display()
        );
    }
}

/// Check OCR tools, directories and the patient source.
pub fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    let mut missing = 0;

    println!("{}", style("OCR").bold());
    let tesseract = check_binary("tesseract");
    report(
        tesseract,
        "tesseract",
        if tesseract {
            "installed"
        } else {
            "not found (apt install tesseract-ocr / brew install tesseract)"
        },
    );
    missing += usize::from(!tesseract);

    match check_pdftoppm_hint() {
        None => report(true, "pdftoppm", "installed"),
        Some(hint) => {
            report(false, "pdftoppm", &hint);
            missing += 1;
        }
    }

    if tesseract {
        let installed = tesseract_languages();
        let ok = languages_installed(&settings.ocr.language, &installed);
        let detail = if ok {
            format!("'{}' available", settings.ocr.language)
        } else {
            format!(
                "'{}' missing (installed: {})",
                settings.ocr.language,
                installed.join(", ")
            )
        };
        report(ok, "language", &detail);
        missing += usize::from(!ok);
    }

    println!("{}", style("Directories").bold());
    report_dir("inbox", &settings.inbox_dir);
    report_dir("processed", &settings.processed_dir);
    report_dir("import", &settings.import_dir);

    println!("{}", style("Patients").bold());
    let directory = PatientDirectory::load(&settings.patients);
    if directory.is_empty() {
        println!(
            "  {} no patients loaded (file: {})",
            icons::warn(),
            settings.patients.file.display()
        );
    } else {
        report(
            true,
            "directory",
            &format!("{} patients from {}", directory.len(), directory.source()),
        );
    }

    println!();
    if missing > 0 {
        anyhow::bail!("{} prerequisite(s) missing", missing);
    }
    println!("{} All prerequisites are installed", icons::success());
    Ok(())
}
