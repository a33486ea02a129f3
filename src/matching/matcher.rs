//! Fuzzy lookup of an extracted name in the patient directory.

use crate::config::MatchingSettings;
use crate::models::MatchResult;
use crate::patients::PatientDirectory;

use super::similarity::{close_matches, ratio};

/// Finds the directory entry closest to a name read off a document.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    /// Minimum similarity for a candidate to be considered at all.
    cutoff: f64,
    /// How many close candidates to rank before picking the best.
    max_candidates: usize,
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::new(&MatchingSettings::default())
    }
}

impl NameMatcher {
    pub fn new(settings: &MatchingSettings) -> Self {
        Self {
            cutoff: settings.cutoff,
            max_candidates: settings.max_candidates,
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Find the patient whose "SURNAME GIVENNAME" best matches `raw_name`.
    ///
    /// Returns `None` when no candidate reaches the cutoff. The confidence is
    /// the similarity between the normalized input and the winning candidate.
    pub fn find_patient(
        &self,
        raw_name: &str,
        directory: &PatientDirectory,
    ) -> Option<MatchResult> {
        let name = raw_name.trim().to_uppercase();
        let candidates = directory.lookup_candidates();

        let matches = close_matches(&name, &candidates, self.max_candidates, self.cutoff);
        let (best, _) = matches.first()?;

        let Some(patient) = directory.find_by_key(best) else {
            tracing::debug!("Candidate '{}' has no owning record", best);
            return None;
        };

        let confidence = ratio(&name, &best.to_uppercase());
        tracing::debug!(
            "Matched '{}' to {} (id {}) with confidence {:.3}",
            name,
            patient.display_name(),
            patient.id,
            confidence
        );

        Some(MatchResult {
            patient: patient.clone(),
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientRecord;

    fn directory() -> PatientDirectory {
        PatientDirectory::new(vec![
            PatientRecord::new("1", "DUPONT", "Jean"),
            PatientRecord::new("2", "MARTIN", "Marie"),
            PatientRecord::new("3", "BERNARD", "Pierre"),
        ])
    }

    #[test]
    fn test_exact_match() {
        let result = NameMatcher::default()
            .find_patient("DUPONT Jean", &directory())
            .unwrap();
        assert_eq!(result.patient.id, "1");
        assert!((result.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_case_and_whitespace_normalization() {
        let matcher = NameMatcher::default();
        let dir = directory();
        let lower = matcher.find_patient("  dupont jean ", &dir).unwrap();
        let upper = matcher.find_patient("DUPONT JEAN", &dir).unwrap();
        assert_eq!(lower.patient, upper.patient);
        assert_eq!(lower.confidence, upper.confidence);
    }

    #[test]
    fn test_typo_still_matches() {
        let result = NameMatcher::default()
            .find_patient("MARTlN MARIE", &directory())
            .unwrap();
        assert_eq!(result.patient.id, "2");
        assert!((result.confidence - 22.0 / 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_name_matches_below_acceptance() {
        let result = NameMatcher::default()
            .find_patient("DUPONT", &directory())
            .unwrap();
        assert_eq!(result.patient.id, "1");
        assert!(result.confidence >= 0.6 && result.confidence < 0.8);
    }

    #[test]
    fn test_unknown_name_returns_none() {
        assert!(NameMatcher::default()
            .find_patient("LEFEBVRE Sophie", &directory())
            .is_none());
    }

    #[test]
    fn test_empty_directory_returns_none() {
        assert!(NameMatcher::default()
            .find_patient("DUPONT Jean", &PatientDirectory::empty())
            .is_none());
    }

    #[test]
    fn test_absent_iff_no_candidate_clears_cutoff() {
        let matcher = NameMatcher::default();
        let dir = directory();
        for input in ["DUPONT JEAN", "DUPOND JAN", "BERNARD", "ZZZZ", "MARIE", "PIERRE BERNARD"] {
            let normalized = input.trim().to_uppercase();
            let any_clears = dir
                .lookup_candidates()
                .iter()
                .any(|c| ratio(&normalized, c) >= matcher.cutoff());
            assert_eq!(matcher.find_patient(input, &dir).is_some(), any_clears, "{}", input);
        }
    }

    #[test]
    fn test_duplicate_names_first_record_wins() {
        let dir = PatientDirectory::new(vec![
            PatientRecord::new("10", "DUPONT", "Jean"),
            PatientRecord::new("11", "Dupont", "JEAN"),
        ]);
        let result = NameMatcher::default().find_patient("DUPONT JEAN", &dir).unwrap();
        assert_eq!(result.patient.id, "10");
    }

    #[test]
    fn test_custom_cutoff() {
        let strict = NameMatcher::new(&MatchingSettings {
            cutoff: 0.95,
            ..MatchingSettings::default()
        });
        assert!(strict.find_patient("DUPOND JEAN", &directory()).is_none());
    }
}
