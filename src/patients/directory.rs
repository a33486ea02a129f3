//! In-memory patient directory.

use std::fmt;

use crate::models::PatientRecord;

/// Where the directory's records were read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorySource {
    /// Flat comma-delimited file.
    File(std::path::PathBuf),
    /// SQLite database.
    Database(std::path::PathBuf),
    /// Built in memory (tests, fixtures).
    Memory,
    /// No source was available.
    Empty,
}

impl fmt::Display for DirectorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Database(path) => write!(f, "database {}", path.display()),
            Self::Memory => f.write_str("memory"),
            Self::Empty => f.write_str("none"),
        }
    }
}

/// Ordered, read-only list of patients, loaded once per process.
#[derive(Debug, Clone)]
pub struct PatientDirectory {
    records: Vec<PatientRecord>,
    source: DirectorySource,
}

impl PatientDirectory {
    pub fn new(records: Vec<PatientRecord>) -> Self {
        Self::with_source(records, DirectorySource::Memory)
    }

    pub fn with_source(records: Vec<PatientRecord>, source: DirectorySource) -> Self {
        Self { records, source }
    }

    pub fn empty() -> Self {
        Self::with_source(Vec::new(), DirectorySource::Empty)
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn source(&self) -> &DirectorySource {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// "SURNAME GIVENNAME" for every record, in directory order.
    pub fn lookup_candidates(&self) -> Vec<String> {
        self.records.iter().map(PatientRecord::lookup_key).collect()
    }

    /// First record whose lookup key equals `key`, ignoring case.
    pub fn find_by_key(&self, key: &str) -> Option<&PatientRecord> {
        let key = key.to_uppercase();
        self.records.iter().find(|p| p.lookup_key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PatientDirectory {
        PatientDirectory::new(vec![
            PatientRecord::new("1", "DUPONT", "Jean"),
            PatientRecord::new("2", "MARTIN", "Marie"),
            PatientRecord::new("1", "DURAND", "Paul"),
        ])
    }

    #[test]
    fn test_lookup_candidates_in_order() {
        assert_eq!(
            sample().lookup_candidates(),
            vec!["DUPONT JEAN", "MARTIN MARIE", "DURAND PAUL"]
        );
    }

    #[test]
    fn test_find_by_key_is_case_insensitive() {
        let dir = sample();
        assert_eq!(dir.find_by_key("martin marie").unwrap().id, "2");
        assert!(dir.find_by_key("MARTIN").is_none());
    }

    #[test]
    fn test_empty() {
        let dir = PatientDirectory::empty();
        assert!(dir.is_empty());
        assert!(dir.lookup_candidates().is_empty());
        assert_eq!(dir.source().to_string(), "none");
    }
}
