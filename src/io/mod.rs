//! Input/output helpers.
//!
//! - observation-table CSV cache (`cache`)
//! - enriched-dataset CSV export (`export`)

pub mod cache;
pub mod export;
