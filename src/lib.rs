//! medisort - automatic filing of scanned medical documents.
//!
//! Watches an inbox folder, reads new scans with OCR, finds the patient name
//! in the text, fuzzy-matches it against the patient directory and files the
//! document either into the import folder or a rejection folder.

pub mod config;
pub mod matching;
pub mod models;
pub mod ocr;
pub mod patients;
pub mod services;
pub mod watcher;
