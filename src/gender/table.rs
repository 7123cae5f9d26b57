//! Name-frequency table backing the gender classifier.
//!
//! The table is a plain `name,grade` CSV. Grades follow the usual
//! name-dictionary convention:
//!
//! | grade | meaning        |
//! |-------|----------------|
//! | `M`   | male           |
//! | `?M`  | mostly male    |
//! | `F`   | female         |
//! | `?F`  | mostly female  |
//! | `?`   | androgynous    |
//!
//! The builtin table is embedded at compile time and parsed once per process.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::domain::Sex;
use crate::error::TableError;
use crate::text::name_key;

const BUILTIN_NAMES: &str = include_str!("../../data/names.csv");

/// Graded result of a name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderGrade {
    Male,
    MostlyMale,
    Female,
    MostlyFemale,
    Androgynous,
    /// The name is not in the table.
    NotFound,
    /// Empty or non-text input.
    Invalid,
}

impl GenderGrade {
    /// Parse a table grade code (`M`, `?M`, `F`, `?F`, `?`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "M" => Some(GenderGrade::Male),
            "?M" | "1M" => Some(GenderGrade::MostlyMale),
            "F" => Some(GenderGrade::Female),
            "?F" | "1F" => Some(GenderGrade::MostlyFemale),
            "?" => Some(GenderGrade::Androgynous),
            _ => None,
        }
    }

    /// Collapse strong and weak grades of a sex into that sex.
    pub fn sex(self) -> Sex {
        match self {
            GenderGrade::Male | GenderGrade::MostlyMale => Sex::Male,
            GenderGrade::Female | GenderGrade::MostlyFemale => Sex::Female,
            GenderGrade::Androgynous | GenderGrade::NotFound | GenderGrade::Invalid => Sex::Unknown,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            GenderGrade::Male => "male",
            GenderGrade::MostlyMale => "mostly male",
            GenderGrade::Female => "female",
            GenderGrade::MostlyFemale => "mostly female",
            GenderGrade::Androgynous => "androgynous",
            GenderGrade::NotFound => "not found",
            GenderGrade::Invalid => "invalid input",
        }
    }
}

/// Normalized given name -> grade.
#[derive(Debug, Clone, Default)]
pub struct NameGenderTable {
    entries: HashMap<String, GenderGrade>,
}

impl NameGenderTable {
    /// The embedded table, parsed on first use.
    pub fn builtin() -> &'static NameGenderTable {
        static TABLE: OnceLock<NameGenderTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            NameGenderTable::from_reader(BUILTIN_NAMES.as_bytes()).unwrap_or_else(|err| {
                log::error!("builtin name table is corrupt: {err}");
                NameGenderTable::default()
            })
        })
    }

    /// Load a `name,grade` CSV.
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let file = File::open(path).map_err(|source| TableError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let name_idx = header_index(&headers, "name")?;
        let grade_idx = header_index(&headers, "grade")?;

        let mut entries = HashMap::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let line = idx + 2;
            let name = record.get(name_idx).unwrap_or("");
            let code = record.get(grade_idx).unwrap_or("");
            if name.is_empty() {
                continue;
            }
            let grade = GenderGrade::from_code(code).ok_or_else(|| TableError::Row {
                line,
                message: format!("unknown grade '{code}' for name '{name}'"),
            })?;
            entries.insert(name_key(name), grade);
        }

        Ok(Self { entries })
    }

    /// Entries of `other` replace entries of `self` with the same key.
    pub fn merge(&mut self, other: NameGenderTable) {
        self.entries.extend(other.entries);
    }

    /// Grade of a single, already tokenized name. Case and diacritics are
    /// ignored.
    pub fn lookup(&self, token: &str) -> GenderGrade {
        self.entries
            .get(&name_key(token))
            .copied()
            .unwrap_or(GenderGrade::NotFound)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn header_index(headers: &csv::StringRecord, name: &str) -> Result<usize, TableError> {
    headers
        .iter()
        .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        .ok_or_else(|| TableError::Row {
            line: 1,
            message: format!("missing required column `{name}`"),
        })
}
