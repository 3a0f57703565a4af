//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - initializes logging
//! - runs the data pipeline (cache or fetch)
//! - dispatches to the TUI or the printing commands

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DataArgs, ExportArgs, TopArgs};
use crate::domain::{Indicator, PipelineConfig, Selection};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `wbd` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();

    // We want `wbd` and `wbd --refresh` to behave like `wbd tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while retaining the requested UX.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Tui(args) => handle_tui(args),
        Command::Fetch(args) => handle_fetch(args),
        Command::Top(args) => handle_top(args),
        Command::Export(args) => handle_export(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn pipeline_config_from_args(args: &DataArgs) -> PipelineConfig {
    PipelineConfig {
        start_year: args.start_year,
        end_year: args.end_year,
        cache_path: args.cache.clone(),
        refresh: args.refresh,
    }
}

fn handle_tui(args: DataArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args);
    let bundle = pipeline::load_dataset(&config)?;
    crate::tui::run(bundle, config)
}

fn handle_fetch(args: DataArgs) -> Result<(), AppError> {
    let mut config = pipeline_config_from_args(&args);
    config.refresh = true;
    let bundle = pipeline::load_dataset(&config)?;
    println!(
        "{}",
        crate::report::format_summary(&bundle.dataset, bundle.from_cache, &bundle.cache_path)
    );
    Ok(())
}

fn handle_top(args: TopArgs) -> Result<(), AppError> {
    let indicator = Indicator::by_code(&args.indicator).ok_or_else(|| {
        let codes: Vec<&str> = crate::domain::INDICATORS.iter().map(|i| i.code).collect();
        AppError::new(
            2,
            format!(
                "Unknown indicator '{}'. Valid codes: {}",
                args.indicator,
                codes.join(", ")
            ),
        )
    })?;

    let config = pipeline_config_from_args(&args.data);
    let bundle = pipeline::load_dataset(&config)?;

    let selection = Selection {
        indicator,
        year: args.year.unwrap_or(bundle.dataset.year_max),
        country: None,
    };
    let spec = crate::charts::top_bar(&bundle.dataset, &selection, args.top);
    println!("{}", crate::report::format_top_table(&spec));
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.data);
    let bundle = pipeline::load_dataset(&config)?;
    crate::io::export::write_dataset_csv(&args.out, &bundle.dataset)?;
    println!(
        "Wrote {} rows to {}",
        bundle.dataset.rows.len(),
        args.out.display()
    );
    Ok(())
}

/// Rewrite argv so `wbd` defaults to `wbd tui`.
///
/// Rules:
/// - `wbd`                      -> `wbd tui`
/// - `wbd --refresh ...`        -> `wbd tui --refresh ...`
/// - `wbd --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version =
        matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "fetch" | "top" | "export");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_tui() {
        assert_eq!(rewrite_args(args(&["wbd"])), args(&["wbd", "tui"]));
    }

    #[test]
    fn leading_flag_defaults_to_tui() {
        assert_eq!(
            rewrite_args(args(&["wbd", "--refresh"])),
            args(&["wbd", "tui", "--refresh"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(args(&["wbd", "top"])), args(&["wbd", "top"]));
        assert_eq!(rewrite_args(args(&["wbd", "--help"])), args(&["wbd", "--help"]));
    }
}
