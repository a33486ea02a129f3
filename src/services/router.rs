//! Per-document routing decision.
//!
//! A document moves through a fixed sequence of stages and stops at the
//! first terminal one:
//!
//! ```text
//! Received -> TextExtracted | NoText
//!          -> NameExtracted | NoName
//!          -> PatientMatched | PatientNotFound
//!          -> ConfidenceChecked -> Accepted | LowConfidence
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::config::MatchingSettings;
use crate::matching::NameMatcher;
use crate::models::{FailureReason, MatchResult, ProcessingOutcome};
use crate::ocr::{self, TextSource};
use crate::patients::PatientDirectory;

/// Routing stages, logged as each one is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    Received,
    TextExtracted,
    NameExtracted,
    PatientMatched,
    ConfidenceChecked,
    Accepted,
    Rejected(FailureReason),
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::TextExtracted => "text_extracted",
            Self::NameExtracted => "name_extracted",
            Self::PatientMatched => "patient_matched",
            Self::ConfidenceChecked => "confidence_checked",
            Self::Accepted => "accepted",
            Self::Rejected(reason) => reason.as_str(),
        }
    }
}

/// Turn a match (or its absence) into an outcome.
///
/// The threshold is inclusive: a confidence equal to it is accepted.
pub fn decide(
    matched: Option<MatchResult>,
    extracted_name: String,
    acceptance_threshold: f64,
    source_path: &Path,
) -> ProcessingOutcome {
    match matched {
        Some(m) if m.confidence >= acceptance_threshold => {
            ProcessingOutcome::accepted(&m, source_path.to_path_buf())
        }
        Some(m) => ProcessingOutcome::rejected(
            FailureReason::LowConfidence,
            Some(extracted_name),
            Some(m.confidence),
            source_path.to_path_buf(),
        ),
        None => ProcessingOutcome::rejected(
            FailureReason::PatientNotFound,
            Some(extracted_name),
            None,
            source_path.to_path_buf(),
        ),
    }
}

/// Classifies documents against the patient directory.
pub struct DocumentRouter {
    text_source: Arc<dyn TextSource>,
    matcher: NameMatcher,
    directory: Arc<PatientDirectory>,
    acceptance_threshold: f64,
}

impl DocumentRouter {
    pub fn new(
        text_source: Arc<dyn TextSource>,
        directory: Arc<PatientDirectory>,
        settings: &MatchingSettings,
    ) -> Self {
        Self {
            text_source,
            matcher: NameMatcher::new(settings),
            directory,
            acceptance_threshold: settings.acceptance_threshold,
        }
    }

    fn enter(&self, path: &Path, stage: ProcessingStage) {
        tracing::debug!("{}: {}", path.display(), stage.as_str());
    }

    fn reject(
        &self,
        path: &Path,
        reason: FailureReason,
        extracted_name: Option<String>,
    ) -> ProcessingOutcome {
        self.enter(path, ProcessingStage::Rejected(reason));
        ProcessingOutcome::rejected(reason, extracted_name, None, path.to_path_buf())
    }

    /// Route one document to an outcome. Never fails: every problem is one
    /// of the rejection reasons.
    pub fn process(&self, path: &Path) -> ProcessingOutcome {
        self.enter(path, ProcessingStage::Received);

        let text = self.text_source.extract_text(path);
        if text.trim().is_empty() {
            return self.reject(path, FailureReason::NoText, None);
        }
        self.enter(path, ProcessingStage::TextExtracted);

        let extraction = ocr::extract(text);
        let Some(name) = extraction.candidate_name else {
            return self.reject(path, FailureReason::NoName, None);
        };
        self.enter(path, ProcessingStage::NameExtracted);
        tracing::debug!("{}: candidate name '{}'", path.display(), name);

        let matched = self.matcher.find_patient(&name, &self.directory);
        if matched.is_none() {
            return self.reject(path, FailureReason::PatientNotFound, Some(name));
        }
        self.enter(path, ProcessingStage::PatientMatched);
        self.enter(path, ProcessingStage::ConfidenceChecked);

        let outcome = decide(matched, name, self.acceptance_threshold, path);
        match outcome.failure_reason() {
            None => self.enter(path, ProcessingStage::Accepted),
            Some(reason) => self.enter(path, ProcessingStage::Rejected(reason)),
        }
        outcome
    }
}
