//! Loading the patient directory from a flat file or a SQLite database.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use thiserror::Error;

use crate::config::PatientSettings;
use crate::models::PatientRecord;

use super::{DirectorySource, PatientDirectory};

/// Errors from a single patient source. Never fatal: the loader falls back.
#[derive(Debug, Error)]
pub enum PatientSourceError {
    #[error("Patient file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Patient database not found: {0}")]
    DatabaseNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Parse a comma-delimited patient list.
///
/// The first line is a header and is skipped. Blank lines, `#` comments and
/// lines with fewer than three fields are ignored; extra fields are dropped.
pub fn parse_patient_list(contents: &str) -> Vec<PatientRecord> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);

    contents
        .lines()
        .enumerate()
        .skip(1)
        .filter_map(|(index, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            match fields.as_slice() {
                [id, surname, given_name, ..] if !id.is_empty() => {
                    Some(PatientRecord::new(*id, *surname, *given_name))
                }
                _ => {
                    tracing::debug!("Skipping malformed patient line {}: {}", index + 1, line);
                    None
                }
            }
        })
        .collect()
}

/// Read patients from a flat file.
pub fn load_from_file(path: &Path) -> Result<Vec<PatientRecord>, PatientSourceError> {
    if !path.exists() {
        return Err(PatientSourceError::FileNotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_patient_list(&contents))
}

/// Render any SQLite column as text (integer ids become decimal strings).
fn column_as_string(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).trim().to_string()
        }
    })
}

/// Read patients from a SQLite database with a query returning
/// `(id, surname, given_name)` rows. The database is opened read-only.
pub fn load_from_database(
    path: &Path,
    query: &str,
) -> Result<Vec<PatientRecord>, PatientSourceError> {
    if !path.exists() {
        return Err(PatientSourceError::DatabaseNotFound(path.to_path_buf()));
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare(query)?;
    let rows = stmt.query_map([], |row| {
        Ok(PatientRecord::new(
            column_as_string(row, 0)?,
            column_as_string(row, 1)?,
            column_as_string(row, 2)?,
        ))
    })?;

    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

impl PatientDirectory {
    /// Load the directory, preferring the database and falling back to the file.
    ///
    /// Never fails: if no source is usable the directory is empty and every
    /// document will be rejected as patient-not-found.
    pub fn load(settings: &PatientSettings) -> Self {
        tracing::info!("Loading patient directory...");

        if let Some(ref db_path) = settings.database {
            match load_from_database(db_path, &settings.query) {
                Ok(records) => {
                    tracing::info!("{} patients loaded from database", records.len());
                    return Self::with_source(records, DirectorySource::Database(db_path.clone()));
                }
                Err(e) => {
                    tracing::error!("Failed to load patient database: {}", e);
                    tracing::info!("Falling back to patient file {}", settings.file.display());
                }
            }
        }

        match load_from_file(&settings.file) {
            Ok(records) => {
                tracing::info!("{} patients loaded from file", records.len());
                Self::with_source(records, DirectorySource::File(settings.file.clone()))
            }
            Err(e) => {
                tracing::warn!("{}; continuing with an empty patient directory", e);
                Self::empty()
            }
        }
    }
}
