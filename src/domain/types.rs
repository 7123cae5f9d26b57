//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between ingest, the pipeline and the exporters
//! - rendered into the augmented output table
//! - summarized to JSON

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EncodingError};

/// Output header for the inferred sex column.
pub const SEX_HEADER: &str = "Sesso";
/// Output header for the fiscal code column.
pub const FISCAL_CODE_HEADER: &str = "Codice Fiscale";

/// Canonical header names the mapped input columns are renamed to.
pub const SURNAME_HEADER: &str = "Cognome";
pub const GIVEN_NAME_HEADER: &str = "Nome";
pub const BIRTH_DATE_HEADER: &str = "Data di Nascita";
pub const BIRTH_PLACE_HEADER: &str = "Comune di Nascita";

/// Sex category as used by the fiscal-code algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Sex {
    #[serde(rename = "M")]
    #[value(name = "M", alias = "m")]
    Male,
    #[serde(rename = "F")]
    #[value(name = "F", alias = "f")]
    Female,
    /// Not inferable from the given name.
    #[serde(rename = "Non determinato")]
    #[value(skip)]
    Unknown,
}

impl Sex {
    /// Label written into the `Sesso` output column.
    pub fn label(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Unknown => "Non determinato",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single spreadsheet cell as read from the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) | Cell::Date(_) => false,
        }
    }

    /// Text content of a text cell, `None` for every other kind.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the cell the way a spreadsheet shows it (integers without
    /// decimals, dates as ISO).
    pub fn display_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// A rectangular table as read from a spreadsheet or CSV.
///
/// Rows may be shorter than `headers`; missing trailing cells read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reference to an input column: a header name, a 0-based index, or a
/// spreadsheet column letter (`A`, `B`, ..., `AA`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef(pub String);

impl ColumnRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Resolve against the table headers.
    ///
    /// Header names win over indices so that a headerless table (whose
    /// columns are named `0`, `1`, ...) and an explicit index agree.
    pub fn resolve(&self, headers: &[String]) -> Option<usize> {
        let wanted = self.0.trim();
        if wanted.is_empty() {
            return None;
        }
        if let Some(idx) = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
        {
            return Some(idx);
        }
        if let Ok(idx) = wanted.parse::<usize>() {
            return (idx < headers.len()).then_some(idx);
        }
        column_letter_index(wanted).filter(|&idx| idx < headers.len())
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `A` -> 0, `Z` -> 25, `AA` -> 26. At most three letters.
fn column_letter_index(s: &str) -> Option<usize> {
    if s.is_empty() || s.len() > 3 || !s.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut idx = 0usize;
    for c in s.chars() {
        idx = idx * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(idx - 1)
}

/// Which input column furnishes each logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub surname: ColumnRef,
    pub given_name: ColumnRef,
    pub birth_date: ColumnRef,
    pub birth_place: ColumnRef,
}

/// Validated 16-character fiscal code.
///
/// Built by the encoder or through `TryFrom`, which runs the full check, so
/// `body` and `check_char` never see a short string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FiscalCode(pub(crate) String);

impl TryFrom<String> for FiscalCode {
    type Error = DecodeError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        crate::fiscal::validate(&code).map(FiscalCode)
    }
}

impl TryFrom<&str> for FiscalCode {
    type Error = DecodeError;

    fn try_from(code: &str) -> Result<Self, Self::Error> {
        crate::fiscal::validate(code).map(FiscalCode)
    }
}

impl From<FiscalCode> for String {
    fn from(code: FiscalCode) -> Self {
        code.0
    }
}

impl FiscalCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first 15 characters (everything but the check character).
    pub fn body(&self) -> &str {
        &self.0[..15]
    }

    pub fn check_char(&self) -> char {
        self.0.as_bytes()[15] as char
    }
}

impl fmt::Display for FiscalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One input row as seen by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonRecord {
    /// 0-based data row index in the input table.
    pub row_index: usize,
    pub surname: String,
    pub given_name: String,
    pub sex: Sex,
    /// Parsed birth date, `None` when the cell is blank or unparseable.
    pub birth_date: Option<NaiveDate>,
    /// Birth date cell as text, kept for error messages.
    pub birth_date_raw: String,
    pub birth_place: String,
    /// `None` until the encode phase has run.
    pub fiscal_code: Option<Result<FiscalCode, EncodingError>>,
}

impl PersonRecord {
    /// Text written into the `Codice Fiscale` column.
    pub fn fiscal_code_text(&self) -> String {
        match &self.fiscal_code {
            Some(Ok(code)) => code.to_string(),
            Some(Err(err)) => format!("Errore: {err}"),
            None => String::new(),
        }
    }
}

/// Pipeline phase reported in progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Classify,
    Encode,
}

impl Phase {
    pub fn display_name(self) -> &'static str {
        match self {
            Phase::Classify => "Calcolo del sesso",
            Phase::Encode => "Generazione del codice fiscale",
        }
    }
}

/// Emitted after each processed row. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub row_index: usize,
    pub total_rows: usize,
}

/// A full `cfgen process` run as understood by the application layer.
///
/// Derived from CLI flags, environment and defaults.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Treat the first row of the input as headers.
    pub has_header: bool,
    /// Worksheet to read; first sheet when `None`.
    pub sheet: Option<String>,
    pub mapping: ColumnMapping,
    /// Classify/encode rows in parallel (output order is preserved).
    pub parallel: bool,
    pub show_progress: bool,
    pub summary_json: Option<PathBuf>,
    /// Extra `name,grade` table merged over the builtin names.
    pub names_table: Option<PathBuf>,
    /// Extra `name,province,code` table merged over the builtin places.
    pub places_table: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn column_ref_prefers_header_names() {
        let h = headers(&["Nome", "Cognome", "Nascita", "Comune"]);
        assert_eq!(ColumnRef::new("cognome").resolve(&h), Some(1));
        assert_eq!(ColumnRef::new("3").resolve(&h), Some(3));
        assert_eq!(ColumnRef::new("C").resolve(&h), Some(2));
        assert_eq!(ColumnRef::new("7").resolve(&h), None);
        assert_eq!(ColumnRef::new("Indirizzo").resolve(&h), None);
    }

    #[test]
    fn headerless_names_match_indices() {
        let h = headers(&["0", "1", "2"]);
        assert_eq!(ColumnRef::new("2").resolve(&h), Some(2));
        assert_eq!(ColumnRef::new("A").resolve(&h), Some(0));
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter_index("A"), Some(0));
        assert_eq!(column_letter_index("z"), Some(25));
        assert_eq!(column_letter_index("AA"), Some(26));
        assert_eq!(column_letter_index("A1"), None);
    }

    #[test]
    fn fiscal_codes_are_checked_on_construction() {
        let code = FiscalCode::try_from("rssmra80a01h501u").unwrap();
        assert_eq!(code.as_str(), "RSSMRA80A01H501U");
        assert_eq!(code.body(), "RSSMRA80A01H501");
        assert_eq!(code.check_char(), 'U');

        assert!(matches!(FiscalCode::try_from("ABC"), Err(DecodeError::Length(3))));
        assert!(matches!(
            FiscalCode::try_from("RSSMRA80A01H501A".to_string()),
            Err(DecodeError::Checksum { .. })
        ));
    }

    #[test]
    fn fiscal_code_json_is_validated() {
        let code: FiscalCode = serde_json::from_str("\"RSSMRA80A01H501U\"").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"RSSMRA80A01H501U\"");
        assert!(serde_json::from_str::<FiscalCode>("\"RSS\"").is_err());
    }

    #[test]
    fn number_cells_render_like_spreadsheets() {
        assert_eq!(Cell::Number(42.0).display_text(), "42");
        assert_eq!(Cell::Number(1.5).display_text(), "1.5");
        assert!(Cell::Text("   ".into()).is_empty());
    }
}
