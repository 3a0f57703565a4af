//! Data acquisition and reshaping.
//!
//! - World Bank API client + fetch orchestration (`worldbank`)
//! - wide-to-long reshaping and the outer-join merge (`normalize`)

pub mod normalize;
pub mod worldbank;

pub use normalize::{LongRow, RawIndicatorTable, RawRow, TableSchema};
pub use worldbank::{EconomyMetadata, FetchReport, WorldBankClient, YearOutcome};
