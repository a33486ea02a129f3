//! One-document processing: route, file, deliver, count.

use std::path::Path;
use std::sync::Arc;

use crate::config::Settings;
use crate::models::{PatientRecord, ProcessingOutcome, ProcessingStats};
use crate::ocr::TextSource;
use crate::patients::PatientDirectory;
use crate::watcher::DocumentHandler;

use super::delivery::{self, Delivery, NoDelivery};
use super::mover::DestinationMover;
use super::router::DocumentRouter;

/// Full per-document pipeline shared by the watcher and batch processing.
pub struct ScanPipeline {
    router: DocumentRouter,
    mover: DestinationMover,
    delivery: Box<dyn Delivery>,
    stats: Arc<ProcessingStats>,
}

impl ScanPipeline {
    pub fn new(router: DocumentRouter, mover: DestinationMover) -> Self {
        Self {
            router,
            mover,
            delivery: Box::new(NoDelivery),
            stats: Arc::new(ProcessingStats::new()),
        }
    }

    /// Pipeline wired from settings.
    pub fn from_settings(
        settings: &Settings,
        directory: Arc<PatientDirectory>,
        text_source: Arc<dyn TextSource>,
    ) -> Self {
        let router = DocumentRouter::new(text_source, directory, &settings.matching);
        let mover = DestinationMover::new(&settings.processed_dir, &settings.import_dir);
        Self::new(router, mover).with_delivery(delivery::from_settings(&settings.delivery))
    }

    pub fn with_delivery(mut self, delivery: Box<dyn Delivery>) -> Self {
        self.delivery = delivery;
        self
    }

    /// Route documents without moving them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.mover = self.mover.dry_run(dry_run);
        self
    }

    pub fn stats(&self) -> Arc<ProcessingStats> {
        Arc::clone(&self.stats)
    }

    /// Process one document end to end.
    pub fn handle(&self, path: &Path) -> ProcessingOutcome {
        let outcome = self.router.process(path);

        match &outcome {
            ProcessingOutcome::Success {
                patient_id,
                surname,
                given_name,
                confidence,
                ..
            } => {
                let patient = PatientRecord::new(patient_id, surname, given_name);
                tracing::info!(
                    "Accepted {}: {} (id {}, confidence {:.2})",
                    path.display(),
                    patient.display_name(),
                    patient.id,
                    confidence
                );
                self.file_accepted(path, &patient);
            }
            ProcessingOutcome::Failure {
                reason,
                extracted_name,
                confidence,
                ..
            } => {
                tracing::warn!(
                    "Rejected {}: {} (name: {}, confidence: {})",
                    path.display(),
                    reason.describe(),
                    extracted_name.as_deref().unwrap_or("-"),
                    confidence.map_or_else(|| "-".to_string(), |c| format!("{:.2}", c))
                );
                if let Err(e) = self.mover.reject(path, *reason) {
                    tracing::error!("Failed to file rejected document: {}", e);
                }
            }
        }

        self.stats.record(&outcome);
        outcome
    }

    fn file_accepted(&self, path: &Path, patient: &PatientRecord) {
        let copy = match self.mover.copy_to_import(path, patient) {
            Ok(copy) => copy,
            Err(e) => {
                tracing::error!("Import copy failed, leaving original in place: {}", e);
                return;
            }
        };

        if !self.mover.is_dry_run() {
            if let Err(e) = self.delivery.deliver(&copy, patient) {
                tracing::warn!("Delivery via {} failed: {}", self.delivery.name(), e);
            }
        }

        if let Err(e) = self.mover.archive(path, patient) {
            tracing::error!("Failed to archive original: {}", e);
        }
    }
}

impl DocumentHandler for ScanPipeline {
    fn handle_document(&self, path: &Path) {
        self.handle(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchingSettings;
    use crate::models::FailureReason;
    use crate::services::delivery::DeliveryError;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Reads documents as UTF-8 text.
    struct FileText;

    impl TextSource for FileText {
        fn extract_text(&self, path: &Path) -> String {
            fs::read_to_string(path).unwrap_or_default()
        }
    }

    #[derive(Default)]
    struct RecordingDelivery {
        delivered: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl Delivery for Arc<RecordingDelivery> {
        fn name(&self) -> &str {
            "recording"
        }

        fn deliver(&self, document: &Path, patient: &PatientRecord) -> Result<(), DeliveryError> {
            self.delivered.lock().unwrap().push((
                document.file_name().unwrap().to_string_lossy().into_owned(),
                patient.id.clone(),
            ));
            if self.fail {
                return Err(DeliveryError::Failed {
                    command: "recording".to_string(),
                    status: "1".to_string(),
                    stderr: String::new(),
                });
            }
            Ok(())
        }
    }

    fn pipeline(dir: &TempDir) -> ScanPipeline {
        let directory = PatientDirectory::new(vec![PatientRecord::new("1", "DUPONT", "Jean")]);
        let router = DocumentRouter::new(
            Arc::new(FileText),
            Arc::new(directory),
            &MatchingSettings::default(),
        );
        let mover = DestinationMover::new(dir.path().join("processed"), dir.path().join("import"));
        ScanPipeline::new(router, mover)
    }

    fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_accepted_document_is_imported_delivered_and_archived() {
        let dir = TempDir::new().unwrap();
        let delivery = Arc::new(RecordingDelivery::default());
        let pipeline = pipeline(&dir).with_delivery(Box::new(Arc::clone(&delivery)));
        let src = write(&dir, "scan.txt", "Patient: DUPONT Jean\n");

        let outcome = pipeline.handle(&src);
        assert!(outcome.is_success());
        assert!(!src.exists());
        assert!(dir.path().join("processed/DUPONT_Jean_scan.txt").exists());

        let imported: Vec<_> = fs::read_dir(dir.path().join("import"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(imported.len(), 1);
        assert!(imported[0].starts_with("1_") && imported[0].ends_with("_scan.txt"));

        let delivered = delivery.delivered.lock().unwrap();
        assert_eq!(delivered.as_slice(), &[(imported[0].clone(), "1".to_string())]);
    }

    #[test]
    fn test_delivery_failure_keeps_outcome() {
        let dir = TempDir::new().unwrap();
        let delivery = Arc::new(RecordingDelivery {
            fail: true,
            ..Default::default()
        });
        let pipeline = pipeline(&dir).with_delivery(Box::new(delivery));
        let src = write(&dir, "scan.txt", "Patient: DUPONT Jean\n");

        assert!(pipeline.handle(&src).is_success());
        assert!(dir.path().join("processed/DUPONT_Jean_scan.txt").exists());
    }

    #[test]
    fn test_rejected_document_goes_to_reason_folder() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir);
        let src = write(&dir, "unknown.txt", "Patient: LEFEBVRE Sophie\n");

        let outcome = pipeline.handle(&src);
        assert_eq!(outcome.failure_reason(), Some(FailureReason::PatientNotFound));
        assert!(dir
            .path()
            .join("processed/patient_not_found/patient_not_found_unknown.txt")
            .exists());
    }

    #[test]
    fn test_stats_are_recorded() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir);
        pipeline.handle(&write(&dir, "a.txt", "Patient: DUPONT Jean"));
        pipeline.handle(&write(&dir, "b.txt", "   "));
        pipeline.handle(&write(&dir, "c.txt", "rien a signaler"));

        let snapshot = pipeline.stats().snapshot();
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.success, 1);
        assert_eq!(snapshot.no_text, 1);
        assert_eq!(snapshot.no_name, 1);
    }

    #[test]
    fn test_dry_run_leaves_files() {
        let dir = TempDir::new().unwrap();
        let delivery = Arc::new(RecordingDelivery::default());
        let pipeline = pipeline(&dir)
            .with_delivery(Box::new(Arc::clone(&delivery)))
            .dry_run(true);
        let src = write(&dir, "scan.txt", "Patient: DUPONT Jean");

        assert!(pipeline.handle(&src).is_success());
        assert!(src.exists());
        assert!(!dir.path().join("import").exists());
        assert!(delivery.delivered.lock().unwrap().is_empty());
    }
}
