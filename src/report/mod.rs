//! Batch summaries and terminal output.

use serde::{Deserialize, Serialize};

use crate::domain::{PersonRecord, Sex};

pub mod format;

pub use format::*;

/// A row whose fiscal code could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 1-based data row number, as a user would count it.
    pub row: usize,
    pub surname: String,
    pub given_name: String,
    pub reason: String,
}

/// Counts over a processed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_rows: usize,
    pub male: usize,
    pub female: usize,
    pub unknown_sex: usize,
    pub encoded: usize,
    pub failed: usize,
    pub failures: Vec<RowFailure>,
}

/// Summarize processed records.
pub fn summarize(records: &[PersonRecord]) -> BatchSummary {
    let mut summary = BatchSummary {
        total_rows: records.len(),
        ..BatchSummary::default()
    };

    for record in records {
        match record.sex {
            Sex::Male => summary.male += 1,
            Sex::Female => summary.female += 1,
            Sex::Unknown => summary.unknown_sex += 1,
        }
        match &record.fiscal_code {
            Some(Ok(_)) => summary.encoded += 1,
            Some(Err(err)) => {
                summary.failed += 1;
                summary.failures.push(RowFailure {
                    row: record.row_index + 1,
                    surname: record.surname.clone(),
                    given_name: record.given_name.clone(),
                    reason: err.to_string(),
                });
            }
            None => {}
        }
    }

    summary
}
