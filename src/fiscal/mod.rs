//! Italian fiscal code (codice fiscale).
//!
//! Responsibilities:
//!
//! - resolve birthplaces to cadastral codes (`place`)
//! - encode person data into the 16-character code (`encoder`)
//! - compute and verify the check character (`checksum`)
//! - validate/decode existing codes, including omocode variants (`decode`)

pub mod checksum;
pub mod decode;
pub mod encoder;
pub mod place;

pub use checksum::*;
pub use decode::*;
pub use encoder::*;
pub use place::*;
