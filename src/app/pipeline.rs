//! Shared startup pipeline used by every front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! cache load -> fetch + normalize -> cache save -> metadata -> enrich
//!
//! The TUI and the CLI commands can then focus on presentation. The
//! returned dataset is built exactly once and shared read-only; nothing
//! downstream reconstructs it per request.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::data::worldbank::{self, WorldBankClient};
use crate::domain::{Dataset, ObservationTable, PipelineConfig};
use crate::enrich::enrich;
use crate::error::AppError;
use crate::io::cache;

/// The built dataset plus provenance for the summary banner.
pub struct DatasetBundle {
    pub dataset: Dataset,
    pub from_cache: bool,
    pub cache_path: PathBuf,
}

/// Build the enriched dataset: cache if present, fresh fetch otherwise.
///
/// Fatal only when both paths come up empty; every lesser failure degrades
/// (per-year fallback, indicator skip, identity metadata).
pub fn load_dataset(config: &PipelineConfig) -> Result<DatasetBundle, AppError> {
    if config.start_year > config.end_year {
        return Err(AppError::new(
            2,
            format!(
                "Invalid year range {}..{} (start after end).",
                config.start_year, config.end_year
            ),
        ));
    }

    let client = WorldBankClient::new();

    let mut from_cache = false;
    let mut table: Option<ObservationTable> = None;
    if !config.refresh {
        if let Some(cached) = cache::load(&config.cache_path) {
            info!(
                "loaded {} rows from cache ({})",
                cached.len(),
                config.cache_path.display()
            );
            from_cache = true;
            table = Some(cached);
        }
    }

    let table = match table {
        Some(t) => t,
        None => {
            let client = client.as_ref().map_err(Clone::clone)?;
            let (t, report) = worldbank::fetch_all_indicators(client, config.start_year, config.end_year);
            let dropped = report.dropped();
            if !dropped.is_empty() {
                warn!("indicators dropped after fetch: {}", dropped.join(", "));
            }
            if !t.is_empty() {
                // A cache write failure costs a refetch next run, nothing
                // more; the freshly fetched table is still served.
                match cache::save(&config.cache_path, &t) {
                    Ok(()) => info!(
                        "saved {} rows to cache ({})",
                        t.len(),
                        config.cache_path.display()
                    ),
                    Err(err) => warn!("failed to save cache: {err}"),
                }
            }
            t
        }
    };

    if table.is_empty() {
        return Err(AppError::no_data(
            "No data could be loaded from cache or fetched from the World Bank API. \
             Check your internet connection or indicator codes.",
        ));
    }

    // Metadata is best effort: either source may be down without costing us
    // the dashboard.
    let (economies, regions) = match &client {
        Ok(client) => worldbank::fetch_metadata(client),
        Err(err) => {
            warn!("metadata unavailable ({err}); using economy codes as names");
            Default::default()
        }
    };

    let dataset = enrich(&table, &economies, &regions);
    info!(
        "dataset ready: {} rows, years {}-{}",
        dataset.rows.len(),
        dataset.year_min,
        dataset.year_max
    );

    Ok(DatasetBundle {
        dataset,
        from_cache,
        cache_path: config.cache_path.clone(),
    })
}
