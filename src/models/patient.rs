//! Patient records as loaded from the patient directory.

use serde::{Deserialize, Serialize};

/// A single patient known to the practice.
///
/// Records are immutable once loaded. Identifiers are expected to be unique
/// but this is not enforced; lookups return the first matching record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub surname: String,
    pub given_name: String,
}

impl PatientRecord {
    pub fn new(
        id: impl Into<String>,
        surname: impl Into<String>,
        given_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            surname: surname.into(),
            given_name: given_name.into(),
        }
    }

    /// Upper-cased "SURNAME GIVENNAME" string used as a fuzzy matching candidate.
    pub fn lookup_key(&self) -> String {
        format!("{} {}", self.surname, self.given_name).to_uppercase()
    }

    /// Name as printed in logs and reports, e.g. "DUPONT Jean".
    pub fn display_name(&self) -> String {
        format!("{} {}", self.surname, self.given_name)
    }
}
