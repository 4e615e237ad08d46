//! Watched-folder matching and output name derivation.
//!
//! Folder matching is a plain string prefix test: `reporting/sikfoo.csv`
//! belongs to the folder `reporting/sik`.
//!
//! Name derivation has two strategies:
//! - [`NameTrim::CharacterSet`] strips the leading run of characters that occur
//!   anywhere in the folder prefix, then the trailing run of `.`, `c`, `s`, `v`.
//!   This is what the deployed relay has always produced, so downstream
//!   consumers may depend on it (`reporting/sik/report.csv` becomes `.csv`).
//! - [`NameTrim::Literal`] removes the folder prefix and the `.csv` suffix as
//!   substrings (`reporting/sik/report.csv` becomes `report.csv` / `report`).

use crate::types::DerivedNames;
use serde::{Deserialize, Serialize};

const CSV_SUFFIX: &str = ".csv";

/// Strategy used to strip the folder prefix and `.csv` suffix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameTrim {
    /// Character-set trimming, byte-compatible with existing outputs.
    #[default]
    CharacterSet,
    /// Substring removal of the prefix and suffix.
    Literal,
}

/// True iff `name` starts with `folder_prefix`. Not path-segment aware.
pub fn belongs_to_watched_folder(name: &str, folder_prefix: &str) -> bool {
    name.starts_with(folder_prefix)
}

/// Removes the watched folder from the front of `name`.
pub fn strip_folder_prefix(name: &str, folder_prefix: &str, trim: NameTrim) -> String {
    match trim {
        NameTrim::CharacterSet => name
            .trim_start_matches(|c: char| folder_prefix.contains(c))
            .to_string(),
        NameTrim::Literal => name
            .strip_prefix(folder_prefix)
            .unwrap_or(name)
            .trim_start_matches('/')
            .to_string(),
    }
}

/// Removes the `.csv` extension from the end of `name`.
pub fn strip_csv_suffix(name: &str, trim: NameTrim) -> String {
    match trim {
        NameTrim::CharacterSet => name
            .trim_end_matches(|c: char| CSV_SUFFIX.contains(c))
            .to_string(),
        NameTrim::Literal => name.strip_suffix(CSV_SUFFIX).unwrap_or(name).to_string(),
    }
}

/// Folder prefix and `.csv` suffix removed: the stem of the remote archive.
pub fn derive_entry_name(name: &str, folder_prefix: &str, trim: NameTrim) -> String {
    strip_csv_suffix(&strip_folder_prefix(name, folder_prefix, trim), trim)
}

/// Both names used by one invocation.
pub fn derive_names(name: &str, folder_prefix: &str, trim: NameTrim) -> DerivedNames {
    let entry_name = strip_folder_prefix(name, folder_prefix, trim);
    let base_name = strip_csv_suffix(&entry_name, trim);
    DerivedNames {
        entry_name,
        base_name,
    }
}
