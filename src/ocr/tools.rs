//! Helpers for the external command-line tools OCR depends on.

use std::process::Command;

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Check pdftoppm availability, returning a hint message if missing.
pub fn check_pdftoppm_hint() -> Option<String> {
    if check_binary("pdftoppm") {
        None
    } else {
        Some("pdftoppm not installed. Install with: apt install poppler-utils".to_string())
    }
}

/// Languages installed for Tesseract, from `tesseract --list-langs`.
///
/// Returns an empty list if tesseract is missing or fails.
pub fn tesseract_languages() -> Vec<String> {
    match Command::new("tesseract").arg("--list-langs").output() {
        Ok(output) if output.status.success() => {
            // Older versions print the list on stderr
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).to_string()
            } else {
                String::from_utf8_lossy(&output.stdout).to_string()
            };
            parse_language_list(&text)
        }
        _ => Vec::new(),
    }
}

/// Parse `tesseract --list-langs` output, skipping the header line.
fn parse_language_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .map(str::to_string)
        .collect()
}

/// Whether every `+`-separated language in `languages` (e.g. "fra+eng") is installed.
pub fn languages_installed(languages: &str, installed: &[String]) -> bool {
    languages
        .split('+')
        .filter(|lang| !lang.is_empty())
        .all(|lang| installed.iter().any(|i| i == lang))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_list() {
        let output = "List of available languages in \"/usr/share/tesseract-ocr/5/tessdata/\" (3):\neng\nfra\nosd\n";
        assert_eq!(parse_language_list(output), vec!["eng", "fra", "osd"]);
    }

    #[test]
    fn test_languages_installed() {
        let installed = vec!["eng".to_string(), "fra".to_string()];
        assert!(languages_installed("fra", &installed));
        assert!(languages_installed("fra+eng", &installed));
        assert!(!languages_installed("fra+deu", &installed));
    }

    #[test]
    fn test_missing_binary() {
        assert!(!check_binary("definitely-not-a-real-binary-name"));
    }
}
