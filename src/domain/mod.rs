//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fixed indicator registry (`INDICATORS`)
//! - the merged observation table (`ObservationTable`)
//! - the enriched dashboard dataset (`Dataset`, `CountryYear`)
//! - income categorization (`IncomeCategory`, `categorize`)

pub mod types;

pub use types::*;
