//! Per-document processing results.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::PatientRecord;

/// Text pulled out of a document, plus the patient name found in it (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub raw_text: String,
    pub candidate_name: Option<String>,
}

/// Best directory entry for an extracted name.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub patient: PatientRecord,
    /// Similarity between the extracted name and the patient's lookup key (0.0 - 1.0).
    pub confidence: f64,
}

/// Why a document was not filed into a patient record.
///
/// These are expected outcomes, not errors: the document is routed into a
/// rejection folder named after the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// OCR produced no text.
    NoText,
    /// No patient name pattern matched the text.
    NoName,
    /// No directory entry cleared the matcher cutoff.
    PatientNotFound,
    /// A patient matched, but below the acceptance threshold.
    LowConfidence,
}

impl FailureReason {
    pub const ALL: [FailureReason; 4] = [
        FailureReason::NoText,
        FailureReason::NoName,
        FailureReason::PatientNotFound,
        FailureReason::LowConfidence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoText => "no_text",
            Self::NoName => "no_name",
            Self::PatientNotFound => "patient_not_found",
            Self::LowConfidence => "low_confidence",
        }
    }

    /// Human-readable description for reports.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::NoText => "No text extracted",
            Self::NoName => "No patient name found",
            Self::PatientNotFound => "Patient not found",
            Self::LowConfidence => "Confidence too low",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of routing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingOutcome {
    Success {
        patient_id: String,
        surname: String,
        given_name: String,
        confidence: f64,
        source_path: PathBuf,
    },
    Failure {
        reason: FailureReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extracted_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
        source_path: PathBuf,
    },
}

impl ProcessingOutcome {
    pub fn accepted(matched: &MatchResult, source_path: PathBuf) -> Self {
        Self::Success {
            patient_id: matched.patient.id.clone(),
            surname: matched.patient.surname.clone(),
            given_name: matched.patient.given_name.clone(),
            confidence: matched.confidence,
            source_path,
        }
    }

    pub fn rejected(
        reason: FailureReason,
        extracted_name: Option<String>,
        confidence: Option<f64>,
        source_path: PathBuf,
    ) -> Self {
        Self::Failure {
            reason,
            extracted_name,
            confidence,
            source_path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn source_path(&self) -> &PathBuf {
        match self {
            Self::Success { source_path, .. } | Self::Failure { source_path, .. } => source_path,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(*reason),
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            Self::Success { confidence, .. } => Some(*confidence),
            Self::Failure { confidence, .. } => *confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_tags_match_serialized_names() {
        for reason in FailureReason::ALL {
            let json = serde_json::to_value(reason).unwrap();
            assert_eq!(json, reason.as_str());
        }
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = ProcessingOutcome::rejected(
            FailureReason::LowConfidence,
            Some("DUPONT".to_string()),
            Some(0.7),
            PathBuf::from("/inbox/scan.pdf"),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["reason"], "low_confidence");
        assert_eq!(json["extracted_name"], "DUPONT");
    }

    #[test]
    fn test_failure_without_name_omits_field() {
        let outcome = ProcessingOutcome::rejected(
            FailureReason::NoText,
            None,
            None,
            PathBuf::from("scan.png"),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("extracted_name").is_none());
        assert!(json.get("confidence").is_none());
        assert_eq!(outcome.failure_reason(), Some(FailureReason::NoText));
        assert!(!outcome.is_success());
    }
}
