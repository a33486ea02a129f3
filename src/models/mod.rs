//! Data models for medisort.

mod outcome;
mod patient;
mod stats;

pub use outcome::{ExtractionResult, FailureReason, MatchResult, ProcessingOutcome};
pub use patient::PatientRecord;
pub use stats::{ProcessingStats, StatsSnapshot};
