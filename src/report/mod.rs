//! Reporting utilities: console summaries and ranking tables.

pub mod format;

pub use format::*;
