//! Patient name extraction from OCR text.
//!
//! Patterns are tried in priority order:
//! 1. An explicit label: `Patient : DUPONT Jean`, `Nom: DUPONT Jean`
//! 2. A civility prefix: `M. DUPONT Jean`, `Mme MARTIN Marie`
//! 3. Birth context: `DUPONT Jean né le ...` (surname only)
//!
//! If none match, the first upper-case line among the first ten is taken as
//! a letterhead-style name line.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::ExtractionResult;

/// Lines scanned by the upper-case fallback.
const FALLBACK_LINES: usize = 10;

/// Minimum length (exclusive, in characters) of an upper-case fallback line.
const FALLBACK_MIN_CHARS: usize = 5;

/// One name word: letters (accented included), inner hyphens and apostrophes.
const WORD: &str = r"[A-ZÀ-Ÿ][A-ZÀ-Ÿ'\-]*";

static LABEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:Patient|Nom)[ \t]*:[ \t]*({w}(?: {w})*)",
        w = WORD
    ))
    .unwrap()
});

static CIVILITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:Monsieur|Madame|Mme|Mlle|Mr|M\.)[ \t]+({w}[ \t]+{w})",
        w = WORD
    ))
    .unwrap()
});

static BIRTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({w})[ \t]+({w})\s+née?\b", w = WORD)).unwrap()
});

/// Find the patient name in OCR text, if any.
pub fn extract_patient_name(text: &str) -> Option<String> {
    if let Some(caps) = LABEL_PATTERN.captures(text) {
        return Some(caps[1].trim().to_string());
    }

    if let Some(caps) = CIVILITY_PATTERN.captures(text) {
        return Some(normalize_spaces(&caps[1]));
    }

    if let Some(caps) = BIRTH_PATTERN.captures(text) {
        return Some(caps[1].to_string());
    }

    text.lines()
        .take(FALLBACK_LINES)
        .map(str::trim)
        .find(|line| line.chars().count() > FALLBACK_MIN_CHARS && is_upper_case_line(line))
        .map(str::to_string)
}

/// Pair OCR text with the name found in it.
pub fn extract(text: String) -> ExtractionResult {
    let candidate_name = extract_patient_name(&text);
    ExtractionResult {
        raw_text: text,
        candidate_name,
    }
}

/// At least one cased letter and no lower-case letters.
fn is_upper_case_line(line: &str) -> bool {
    let mut has_cased = false;
    for c in line.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_pattern() {
        assert_eq!(
            extract_patient_name("Compte rendu\nPatient: DUPONT Jean\nDate: 12/03/2024"),
            Some("DUPONT Jean".to_string())
        );
        assert_eq!(
            extract_patient_name("Nom : MARTIN Marie"),
            Some("MARTIN Marie".to_string())
        );
        assert_eq!(
            extract_patient_name("nom du patient : bernard pierre"),
            Some("bernard pierre".to_string())
        );
    }

    #[test]
    fn test_label_stops_at_column_gap() {
        assert_eq!(
            extract_patient_name("Patient: DUPONT Jean    Date: 12/03/2024"),
            Some("DUPONT Jean".to_string())
        );
    }

    #[test]
    fn test_label_keeps_compound_names() {
        assert_eq!(
            extract_patient_name("Patient : LEFÈVRE-DURAND Jean-Pierre"),
            Some("LEFÈVRE-DURAND Jean-Pierre".to_string())
        );
    }

    #[test]
    fn test_civility_pattern() {
        assert_eq!(
            extract_patient_name("Cher confrère,\nj'ai vu Mme MARTIN Marie en consultation"),
            Some("MARTIN Marie".to_string())
        );
        assert_eq!(
            extract_patient_name("Concernant M. DUPONT  Jean, 45 ans"),
            Some("DUPONT Jean".to_string())
        );
    }

    #[test]
    fn test_label_wins_over_civility() {
        let text = "Mme MARTIN Marie\nPatient: DUPONT Jean";
        assert_eq!(extract_patient_name(text), Some("DUPONT Jean".to_string()));
    }

    #[test]
    fn test_birth_pattern() {
        assert_eq!(
            extract_patient_name("Enfant BERNARD Pierre né le 01/02/2015"),
            Some("BERNARD".to_string())
        );
        assert_eq!(
            extract_patient_name("ROUX Anne\nnée le 3 mars 1960"),
            Some("ROUX".to_string())
        );
    }

    #[test]
    fn test_upper_case_fallback() {
        let text = "\n  DUPONT JEAN  \nrésultats d'analyse\n";
        assert_eq!(extract_patient_name(text), Some("DUPONT JEAN".to_string()));
    }

    #[test]
    fn test_fallback_skips_short_lines() {
        // "ABCDE" is only five characters
        let text = "ABCDE\nresultats\nCABINET MEDICAL 12";
        assert_eq!(
            extract_patient_name(text),
            Some("CABINET MEDICAL 12".to_string())
        );
    }

    #[test]
    fn test_fallback_limited_to_first_lines() {
        let mut text = String::new();
        for i in 0..10 {
            text.push_str(&format!("ligne numero {}\n", i));
        }
        text.push_str("DUPONT JEAN\n");
        assert_eq!(extract_patient_name(&text), None);
    }

    #[test]
    fn test_no_name() {
        assert_eq!(
            extract_patient_name("résultats normaux\ncontrôle dans six mois\n"),
            None
        );
        assert_eq!(extract_patient_name("123456 78/90"), None);
        assert_eq!(extract_patient_name(""), None);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let text = "Patient: DUPOND Jean\n".to_string();
        assert_eq!(extract(text.clone()), extract(text));
    }
}
