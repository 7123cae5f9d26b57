//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - person records and the sex category (`PersonRecord`, `Sex`)
//! - the raw input table and column mapping (`RawTable`, `ColumnMapping`)
//! - run configuration and progress events (`BatchConfig`, `ProgressEvent`)

pub mod types;

pub use types::*;
