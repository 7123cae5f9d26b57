//! Gender inference from given names.
//!
//! - `table`: the graded name-frequency table (builtin + CSV overrides)
//! - `classifier`: first-token lookup collapsing grades to `Sex`

pub mod classifier;
pub mod table;

pub use classifier::*;
pub use table::*;
