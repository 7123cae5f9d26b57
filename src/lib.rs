//! `cfgen` library crate.
//!
//! The binary (`cfgen`) is a thin wrapper around this library so that:
//!
//! - the fiscal-code and gender logic is testable without spawning processes
//! - the pipeline can be driven from other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fiscal;
pub mod gender;
pub mod io;
pub mod report;
pub mod text;
