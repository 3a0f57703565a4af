//! Command-line parsing for the World Bank indicator dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the pipeline/chart code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "wbd",
    version,
    about = "World development indicators dashboard (World Bank API)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive TUI dashboard.
    ///
    /// Builds the dataset first (cache or fetch), then renders the five
    /// panels; controls recompute charts from the in-memory table.
    Tui(DataArgs),
    /// Fetch all indicators from the World Bank API and refresh the cache.
    Fetch(DataArgs),
    /// Print the top-N ranking for an indicator/year (useful for scripting).
    Top(TopArgs),
    /// Export the enriched table to CSV.
    Export(ExportArgs),
}

/// Options shared by every command that needs the dataset.
#[derive(Debug, Parser, Clone)]
pub struct DataArgs {
    /// First year of the fetch range.
    #[arg(long, default_value_t = 2010)]
    pub start_year: i32,

    /// Last year of the fetch range (inclusive).
    #[arg(long, default_value_t = 2022)]
    pub end_year: i32,

    /// Cache CSV path. The cache never expires; pass --refresh to refetch.
    #[arg(long, default_value = "world_bank_data_v3.csv")]
    pub cache: PathBuf,

    /// Ignore the cache and fetch fresh data (the cache file is rewritten).
    #[arg(long)]
    pub refresh: bool,
}

/// Options for the ranking printout.
#[derive(Debug, Parser)]
pub struct TopArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Indicator code (e.g. NY.GDP.PCAP.CD).
    #[arg(short = 'i', long, default_value = "NY.GDP.PCAP.CD")]
    pub indicator: String,

    /// Year to rank; defaults to the latest year in the dataset.
    #[arg(short = 'y', long)]
    pub year: Option<i32>,

    /// How many countries to show.
    #[arg(long, default_value_t = 20)]
    pub top: usize,
}

/// Options for the CSV export.
#[derive(Debug, Parser)]
pub struct ExportArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}
