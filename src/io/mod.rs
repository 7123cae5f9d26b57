//! Input/output helpers.
//!
//! - spreadsheet/CSV ingest and date parsing (`ingest`)
//! - augmented table and summary exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
