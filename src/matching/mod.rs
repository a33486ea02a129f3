//! Fuzzy name matching against the patient directory.

mod matcher;
pub mod similarity;

pub use matcher::NameMatcher;
pub use similarity::{close_matches, ratio};
