//! Error types.
//!
//! Components report typed errors (`ConfigurationError`, `EncodingError`,
//! `DecodeError`, `TableError`). The binary boundary collapses them into an
//! [`AppError`] carrying the process exit code.

/// Exit code for usage, configuration and input errors.
pub const EXIT_INPUT: u8 = 2;
/// Exit code when the input table has no data rows.
pub const EXIT_EMPTY: u8 = 3;
/// Exit code for output write failures.
pub const EXIT_OUTPUT: u8 = 4;
/// Exit code for single-shot `encode`/`check` requests that failed.
pub const EXIT_REJECTED: u8 = 5;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// The caller-supplied column mapping cannot be applied to the input table.
///
/// Raised before any row is processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("column `{column}` for {field} was not found in the input table")]
    MissingColumn { field: &'static str, column: String },

    #[error("{first} and {second} are both mapped to column `{column}`")]
    DuplicateColumn {
        first: &'static str,
        second: &'static str,
        column: String,
    },
}

/// A single row could not be turned into a fiscal code.
///
/// Recorded per row; never aborts a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("missing {0}")]
    EmptyField(&'static str),

    #[error("invalid birth date '{0}'")]
    InvalidDate(String),

    #[error("sex could not be determined (M or F required)")]
    UnsupportedSex,

    #[error("birthplace not found: '{0}'")]
    UnknownPlace(String),

    #[error("birthplace '{name}' is ambiguous, specify the province: {}", .candidates.join(", "))]
    AmbiguousPlace { name: String, candidates: Vec<String> },
}

/// An existing fiscal code failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected 16 characters, got {0}")]
    Length(usize),

    #[error("malformed code '{0}'")]
    Format(String),

    #[error("invalid month letter '{0}'")]
    Month(char),

    #[error("invalid birth date in code: day {day}, month {month}, year {year}")]
    Date { year: u32, month: u32, day: u32 },

    #[error("check character mismatch: expected '{expected}', found '{found}'")]
    Checksum { expected: char, found: char },
}

/// A name or place table could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to open table '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("table CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {message}")]
    Row { line: usize, message: String },
}

impl From<ConfigurationError> for AppError {
    fn from(err: ConfigurationError) -> Self {
        AppError::new(EXIT_INPUT, format!("Configuration error: {err}"))
    }
}

impl From<TableError> for AppError {
    fn from(err: TableError) -> Self {
        AppError::new(EXIT_INPUT, err.to_string())
    }
}

impl From<EncodingError> for AppError {
    fn from(err: EncodingError) -> Self {
        AppError::new(EXIT_REJECTED, format!("Errore: {err}"))
    }
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        AppError::new(EXIT_REJECTED, format!("Invalid fiscal code: {err}"))
    }
}
