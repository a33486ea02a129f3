//! Patient directory: the known patients documents are matched against.

mod directory;
mod source;

pub use directory::{DirectorySource, PatientDirectory};
pub use source::{load_from_database, load_from_file, parse_patient_list, PatientSourceError};
