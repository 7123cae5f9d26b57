//! Command-line parsing for the fiscal-code generator.
//!
//! Argument parsing and command dispatch stay separate from the encoding and
//! pipeline code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Sex;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "cfgen",
    version,
    about = "Italian fiscal code (codice fiscale) batch generator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add `Sesso` and `Codice Fiscale` columns to a spreadsheet.
    Process(ProcessArgs),
    /// Compute a single fiscal code.
    Encode(EncodeArgs),
    /// Show how given names are classified.
    Gender(GenderArgs),
    /// Validate and decode existing fiscal codes.
    Check(CheckArgs),
}

/// Lookup tables merged over the builtin ones.
#[derive(Debug, Args, Clone, Default)]
pub struct TableArgs {
    /// Extra given-name table (`name,grade` CSV).
    #[arg(long, env = "CFGEN_NAMES_TABLE", value_name = "CSV")]
    pub names_table: Option<PathBuf>,

    /// Extra birthplace table (`name,province,code[,aliases]` CSV).
    #[arg(long, env = "CFGEN_PLACES_TABLE", value_name = "CSV")]
    pub places_table: Option<PathBuf>,
}

/// Options for batch processing.
#[derive(Debug, Parser, Clone)]
pub struct ProcessArgs {
    /// Input spreadsheet (.xlsx, .xlsm, .xls, .xlsb, .ods or .csv).
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output file (.xlsx or .csv).
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,

    /// Given-name column: header name, 0-based index or letter (A, B, ...).
    /// Defaults to `Nome`.
    #[arg(long, value_name = "COL")]
    pub name_col: Option<String>,

    /// Surname column. Defaults to `Cognome`.
    #[arg(long, value_name = "COL")]
    pub surname_col: Option<String>,

    /// Birth date column. Defaults to `Data di Nascita`.
    #[arg(long, value_name = "COL")]
    pub birthdate_col: Option<String>,

    /// Birthplace column. Defaults to `Comune di Nascita`.
    #[arg(long, value_name = "COL")]
    pub birthplace_col: Option<String>,

    /// The first row holds column headers. Implied when no column is given.
    #[arg(long)]
    pub header: bool,

    /// Worksheet to read (default: first sheet).
    #[arg(long)]
    pub sheet: Option<String>,

    /// Process rows in parallel.
    #[arg(long, env = "CFGEN_PARALLEL")]
    pub parallel: bool,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,

    /// Write a JSON summary of the run.
    #[arg(long, value_name = "JSON")]
    pub summary_json: Option<PathBuf>,

    #[command(flatten)]
    pub tables: TableArgs,
}

/// Options for encoding one person.
#[derive(Debug, Parser, Clone)]
pub struct EncodeArgs {
    #[arg(long)]
    pub surname: String,

    #[arg(long)]
    pub name: String,

    /// Birth date (YYYY-MM-DD or DD/MM/YYYY).
    #[arg(long, value_name = "DATE")]
    pub birthdate: String,

    /// Municipality, `Municipality (PR)`, foreign country or cadastral code.
    #[arg(long, value_name = "PLACE")]
    pub birthplace: String,

    /// Sex; inferred from the given name when omitted.
    #[arg(long, value_enum)]
    pub sex: Option<Sex>,

    #[command(flatten)]
    pub tables: TableArgs,
}

/// Options for `cfgen gender`.
#[derive(Debug, Parser, Clone)]
pub struct GenderArgs {
    /// Given names to classify.
    #[arg(required = true, value_name = "NAME")]
    pub names: Vec<String>,

    #[command(flatten)]
    pub tables: TableArgs,
}

/// Options for `cfgen check`.
#[derive(Debug, Parser, Clone)]
pub struct CheckArgs {
    /// Fiscal codes to validate.
    #[arg(required = true, value_name = "CODE")]
    pub codes: Vec<String>,

    /// Also list the omocode variants of each valid code.
    #[arg(long)]
    pub omocodes: bool,

    #[command(flatten)]
    pub tables: TableArgs,
}
