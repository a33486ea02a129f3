//! Text extraction from scanned documents.

use std::path::Path;

use crate::config::OcrSettings;

use super::backend::{OcrBackend, OcrError};
use super::tesseract::TesseractBackend;
use super::TextSource;

/// Image MIME types handed straight to the OCR backend.
const OCR_IMAGE_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/tiff",
    "image/gif",
    "image/bmp",
];

/// How a document's text is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// Scanned PDF: the first page is rasterised and OCR'd.
    Pdf,
    /// Image file: OCR'd directly.
    Image,
    /// Already text: read as-is.
    PlainText,
    /// Anything else, with the detected MIME type.
    Unsupported(String),
}

impl DocumentKind {
    /// Detect the kind from the file extension, sniffing content if that fails.
    pub fn detect(path: &Path) -> Self {
        let mime = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .or_else(|| {
                infer::get_from_path(path)
                    .ok()
                    .flatten()
                    .map(|kind| kind.mime_type().to_string())
            });

        match mime {
            Some(mime) => Self::from_mime(&mime),
            None => Self::Unsupported("unknown".to_string()),
        }
    }

    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "application/pdf" => Self::Pdf,
            "text/plain" => Self::PlainText,
            m if OCR_IMAGE_TYPES.contains(&m) => Self::Image,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

/// Extracts document text with an OCR backend.
pub struct TextExtractor {
    backend: Box<dyn OcrBackend>,
}

impl TextExtractor {
    pub fn new(backend: Box<dyn OcrBackend>) -> Self {
        Self { backend }
    }

    /// Extractor backed by the Tesseract command line tool.
    pub fn tesseract(settings: &OcrSettings) -> Self {
        Self::new(Box::new(TesseractBackend::new(settings)))
    }

    pub fn backend(&self) -> &dyn OcrBackend {
        self.backend.as_ref()
    }

    /// Extract text, surfacing failures. Multi-page PDFs only have their
    /// first page read: the patient name lives on the cover page.
    pub fn try_extract(&self, path: &Path) -> Result<String, OcrError> {
        let kind = DocumentKind::detect(path);
        tracing::debug!("Extracting {} as {:?}", path.display(), kind);

        let result = match kind {
            DocumentKind::Pdf => self.backend.ocr_pdf_page(path, 1)?,
            DocumentKind::Image => self.backend.ocr_image(path)?,
            DocumentKind::PlainText => return Ok(std::fs::read_to_string(path)?),
            DocumentKind::Unsupported(mime) => return Err(OcrError::UnsupportedFileType(mime)),
        };

        tracing::debug!(
            "{} extracted {} chars from {} in {}ms",
            self.backend.name(),
            result.text.len(),
            path.display(),
            result.processing_time_ms
        );
        Ok(result.text)
    }
}

impl TextSource for TextExtractor {
    fn extract_text(&self, path: &Path) -> String {
        match self.try_extract(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("OCR error on {}: {}", path.display(), e);
                String::new()
            }
        }
    }
}
