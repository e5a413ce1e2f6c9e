//! Reporting utilities: formatted summaries of merge results.

pub mod format;

pub use format::*;
