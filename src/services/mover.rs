//! Filing of routed documents.
//!
//! Layout:
//! - accepted: copied to `{import}/{id}_{YYYYMMDD_HHMMSS}_scan.{ext}`, the
//!   original archived as `{processed}/{SURNAME}_{GivenName}_{filename}`
//! - rejected: `{processed}/{reason}/{reason}_{filename}`

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::models::{FailureReason, PatientRecord};

const DEFAULT_EXTENSION: &str = "pdf";

/// Errors from filing a document.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("{path} has no file name")]
    NoFileName { path: PathBuf },

    #[error("Failed to {action} {from} to {to}: {source}")]
    Io {
        action: &'static str,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Name of the import copy for a patient document.
pub fn import_file_name(patient_id: &str, source: &Path, now: DateTime<Local>) -> String {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("{}_{}_scan.{}", patient_id, now.format("%Y%m%d_%H%M%S"), ext)
}

fn file_name(path: &Path) -> Result<String, MoveError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| MoveError::NoFileName {
            path: path.to_path_buf(),
        })
}

/// Moves documents into the import and processed directories.
#[derive(Debug, Clone)]
pub struct DestinationMover {
    processed_dir: PathBuf,
    import_dir: PathBuf,
    dry_run: bool,
}

impl DestinationMover {
    pub fn new(processed_dir: impl Into<PathBuf>, import_dir: impl Into<PathBuf>) -> Self {
        Self {
            processed_dir: processed_dir.into(),
            import_dir: import_dir.into(),
            dry_run: false,
        }
    }

    /// Compute destinations without touching the filesystem.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Copy an accepted document into the import directory.
    pub fn copy_to_import(
        &self,
        source: &Path,
        patient: &PatientRecord,
    ) -> Result<PathBuf, MoveError> {
        let dest = self
            .import_dir
            .join(import_file_name(&patient.id, source, Local::now()));
        if self.dry_run {
            return Ok(dest);
        }

        let io_err = |source_err| MoveError::Io {
            action: "copy",
            from: source.to_path_buf(),
            to: dest.clone(),
            source: source_err,
        };
        fs::create_dir_all(&self.import_dir).map_err(io_err)?;
        let dest = reserve(&dest).map_err(io_err)?;
        if let Err(e) = fs::copy(source, &dest) {
            let _ = fs::remove_file(&dest);
            return Err(io_err(e));
        }
        tracing::info!("Copied {} to {}", source.display(), dest.display());
        Ok(dest)
    }

    /// Archive the original of an accepted document.
    pub fn archive(&self, source: &Path, patient: &PatientRecord) -> Result<PathBuf, MoveError> {
        let name = format!(
            "{}_{}_{}",
            patient.surname,
            patient.given_name,
            file_name(source)?
        );
        self.move_file(source, &self.processed_dir.join(name))
    }

    /// Move a rejected document into its reason subfolder.
    pub fn reject(&self, source: &Path, reason: FailureReason) -> Result<PathBuf, MoveError> {
        let tag = reason.as_str();
        let dest = self
            .processed_dir
            .join(tag)
            .join(format!("{}_{}", tag, file_name(source)?));
        self.move_file(source, &dest)
    }

    /// Move `from` to `to`, or to a numbered variant if `to` is taken.
    fn move_file(&self, from: &Path, to: &Path) -> Result<PathBuf, MoveError> {
        if self.dry_run {
            return Ok(to.to_path_buf());
        }

        let io_err = |source| MoveError::Io {
            action: "move",
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        };

        if !from.is_file() {
            return Err(io_err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "source file not found",
            )));
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let dest = reserve(to).map_err(io_err)?;

        if let Err(e) = fs::rename(from, &dest) {
            // Different filesystem: fall back to copy + remove
            tracing::debug!("rename failed ({}), copying instead", e);
            if let Err(e) = fs::copy(from, &dest) {
                let _ = fs::remove_file(&dest);
                return Err(io_err(e));
            }
            fs::remove_file(from).map_err(io_err)?;
        }

        tracing::debug!("Moved {} to {}", from.display(), dest.display());
        Ok(dest)
    }
}

/// Claim `path`, or `stem_2.ext`, `stem_3.ext`... if taken, by creating an
/// empty placeholder that the caller then overwrites.
fn reserve(path: &Path) -> std::io::Result<PathBuf> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n = 1u32;
    loop {
        let candidate = match (n, &ext) {
            (1, _) => path.to_path_buf(),
            (_, Some(ext)) => path.with_file_name(format!("{}_{}.{}", stem, n, ext)),
            (_, None) => path.with_file_name(format!("{}_{}", stem, n)),
        };
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    struct Layout {
        _dir: TempDir,
        inbox: PathBuf,
        mover: DestinationMover,
        processed: PathBuf,
        import: PathBuf,
    }

    fn layout() -> Layout {
        let dir = TempDir::new().unwrap();
        let inbox = dir.path().join("inbox");
        let processed = dir.path().join("processed");
        let import = dir.path().join("import");
        fs::create_dir_all(&inbox).unwrap();
        Layout {
            mover: DestinationMover::new(&processed, &import),
            _dir: dir,
            inbox,
            processed,
            import,
        }
    }

    fn patient() -> PatientRecord {
        PatientRecord::new("7", "DUPONT", "Jean")
    }

    #[test]
    fn test_import_file_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 12, 9, 5, 7).unwrap();
        assert_eq!(
            import_file_name("7", Path::new("/inbox/SCAN.PDF"), now),
            "7_20240312_090507_scan.pdf"
        );
        assert_eq!(
            import_file_name("7", Path::new("/inbox/scan"), now),
            "7_20240312_090507_scan.pdf"
        );
        assert_eq!(
            import_file_name("7", Path::new("scan.jpg"), now),
            "7_20240312_090507_scan.jpg"
        );
    }

    #[test]
    fn test_accept_copies_then_archives() {
        let l = layout();
        let src = l.inbox.join("scan1.pdf");
        fs::write(&src, b"pdf").unwrap();

        let copy = l.mover.copy_to_import(&src, &patient()).unwrap();
        assert!(copy.starts_with(&l.import));
        assert!(copy.file_name().unwrap().to_str().unwrap().starts_with("7_"));
        assert_eq!(fs::read(&copy).unwrap(), b"pdf");
        assert!(src.exists());

        let archived = l.mover.archive(&src, &patient()).unwrap();
        assert_eq!(archived, l.processed.join("DUPONT_Jean_scan1.pdf"));
        assert!(archived.exists());
        assert!(!src.exists());
    }

    #[test]
    fn test_reject_goes_to_reason_folder() {
        let l = layout();
        let src = l.inbox.join("scan2.png");
        fs::write(&src, b"png").unwrap();

        let dest = l.mover.reject(&src, FailureReason::LowConfidence).unwrap();
        assert_eq!(
            dest,
            l.processed.join("low_confidence").join("low_confidence_scan2.png")
        );
        assert!(dest.exists());
        assert!(!src.exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let l = layout();
        let mover = l.mover.clone().dry_run(true);
        let src = l.inbox.join("scan3.pdf");
        fs::write(&src, b"pdf").unwrap();

        mover.copy_to_import(&src, &patient()).unwrap();
        let dest = mover.reject(&src, FailureReason::NoName).unwrap();
        assert_eq!(dest, l.processed.join("no_name").join("no_name_scan3.pdf"));
        assert!(src.exists());
        assert!(!l.import.exists());
        assert!(!l.processed.exists());
    }

    #[test]
    fn test_existing_destination_is_not_overwritten() {
        let l = layout();
        let first = l.inbox.join("scan.pdf");
        fs::write(&first, b"first").unwrap();
        let a = l.mover.copy_to_import(&first, &patient()).unwrap();
        let b = l.mover.copy_to_import(&first, &patient()).unwrap();
        assert_ne!(a, b);
        assert_eq!(fs::read(&b).unwrap(), b"first");

        l.mover.archive(&first, &patient()).unwrap();
        let second = l.inbox.join("scan.pdf");
        fs::write(&second, b"second").unwrap();
        let archived = l.mover.archive(&second, &patient()).unwrap();
        assert_eq!(archived, l.processed.join("DUPONT_Jean_scan_2.pdf"));
        assert_eq!(fs::read(l.processed.join("DUPONT_Jean_scan.pdf")).unwrap(), b"first");
        assert_eq!(fs::read(&archived).unwrap(), b"second");
    }

    #[test]
    fn test_missing_source_is_error() {
        let l = layout();
        let src = l.inbox.join("gone.pdf");
        assert!(matches!(
            l.mover.copy_to_import(&src, &patient()),
            Err(MoveError::Io { action: "copy", .. })
        ));
        assert!(matches!(
            l.mover.reject(&src, FailureReason::NoText),
            Err(MoveError::Io { action: "move", .. })
        ));
    }
}
