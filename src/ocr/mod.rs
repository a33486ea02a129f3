//! Text extraction from scanned documents.
//!
//! Documents go through an [`OcrBackend`] (Tesseract by default) and the
//! resulting text is searched for a patient name by [`extract_patient_name`].

mod backend;
mod extractor;
mod names;
mod tesseract;
mod tools;

use std::path::Path;

pub use backend::{OcrBackend, OcrError, OcrResult};
pub use extractor::{DocumentKind, TextExtractor};
pub use names::{extract, extract_patient_name};
pub use tesseract::TesseractBackend;
pub use tools::{check_binary, check_pdftoppm_hint, languages_installed, tesseract_languages};

/// Anything that can turn a document into text.
///
/// Implementations never fail: an unreadable document yields empty text,
/// which routing treats as "no text".
pub trait TextSource: Send + Sync {
    fn extract_text(&self, path: &Path) -> String;
}
