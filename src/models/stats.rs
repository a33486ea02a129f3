//! Running counters for processed documents.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::{FailureReason, ProcessingOutcome};

/// Thread-safe outcome counters, shared by all in-flight documents.
#[derive(Debug, Default)]
pub struct ProcessingStats {
    total: AtomicU64,
    success: AtomicU64,
    no_text: AtomicU64,
    no_name: AtomicU64,
    patient_not_found: AtomicU64,
    low_confidence: AtomicU64,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: &ProcessingOutcome) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome.failure_reason() {
            None => &self.success,
            Some(FailureReason::NoText) => &self.no_text,
            Some(FailureReason::NoName) => &self.no_name,
            Some(FailureReason::PatientNotFound) => &self.patient_not_found,
            Some(FailureReason::LowConfidence) => &self.low_confidence,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        // record() bumps total first, so loading success first keeps success <= total
        let success = self.success.load(Ordering::Relaxed);
        StatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            success,
            no_text: self.no_text.load(Ordering::Relaxed),
            no_name: self.no_name.load(Ordering::Relaxed),
            patient_not_found: self.patient_not_found.load(Ordering::Relaxed),
            low_confidence: self.low_confidence.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ProcessingStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub success: u64,
    pub no_text: u64,
    pub no_name: u64,
    pub patient_not_found: u64,
    pub low_confidence: u64,
}

impl StatsSnapshot {
    pub fn failed(&self) -> u64 {
        self.total.saturating_sub(self.success)
    }

    /// Share of accepted documents, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.success as f64 / self.total as f64 * 100.0
        }
    }

    pub fn count_for(&self, reason: FailureReason) -> u64 {
        match reason {
            FailureReason::NoText => self.no_text,
            FailureReason::NoName => self.no_name,
            FailureReason::PatientNotFound => self.patient_not_found,
            FailureReason::LowConfidence => self.low_confidence,
        }
    }
}
