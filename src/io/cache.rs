//! Flat-file cache for the merged observation table.
//!
//! Format: delimited text with a header row, one row per (economy, year),
//! one column per indicator display name; empty cells are nulls.
//!
//! The cache never expires. A stale file is used indefinitely until it is
//! deleted by hand or a refetch is forced (`wbd fetch` / `--refresh`).

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use crate::domain::{Indicator, ObsKey, ObservationTable};
use crate::error::AppError;

const ECONOMY_HEADER: &str = "economy";
const YEAR_HEADER: &str = "Year";

/// Load the cached table, or `None` when no usable cache exists.
///
/// An unreadable or malformed cache is treated as absent (with a warning),
/// so the pipeline falls through to a fresh fetch instead of dying on a
/// half-written file.
pub fn load(path: &Path) -> Option<ObservationTable> {
    if !path.exists() {
        return None;
    }

    let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
        Ok(r) => r,
        Err(err) => {
            warn!("cache unreadable ({err}); refetching");
            return None;
        }
    };

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(err) => {
            warn!("cache headers unreadable ({err}); refetching");
            return None;
        }
    };

    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on
    // the first header. If we don't strip it, the economy column would be
    // reported missing.
    let headers: Vec<String> = headers
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.first().map(String::as_str) != Some(ECONOMY_HEADER)
        || headers.get(1).map(String::as_str) != Some(YEAR_HEADER)
    {
        warn!(
            "cache '{}' has an unexpected header; refetching",
            path.display()
        );
        return None;
    }

    // Map value columns back onto the registry; unknown columns are dropped.
    let mut indicators: Vec<Indicator> = Vec::new();
    let mut columns: Vec<usize> = Vec::new();
    for (idx, header) in headers.iter().enumerate().skip(2) {
        match Indicator::by_name(header) {
            Some(indicator) => {
                indicators.push(indicator);
                columns.push(idx);
            }
            None => warn!("ignoring unknown cache column '{header}'"),
        }
    }
    if indicators.is_empty() {
        warn!("cache '{}' has no indicator columns; refetching", path.display());
        return None;
    }

    let mut rows: BTreeMap<ObsKey, Vec<Option<f64>>> = BTreeMap::new();
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2;
        let record = match record {
            Ok(r) => r,
            Err(err) => {
                warn!("cache line {line}: parse error ({err}); row skipped");
                continue;
            }
        };

        let economy = record.get(0).unwrap_or("").trim().to_string();
        let year: i32 = match record.get(1).unwrap_or("").trim().parse() {
            Ok(y) => y,
            Err(_) => {
                warn!("cache line {line}: invalid year; row skipped");
                continue;
            }
        };
        if economy.is_empty() {
            warn!("cache line {line}: missing economy code; row skipped");
            continue;
        }

        let values = columns
            .iter()
            .map(|&col| {
                record
                    .get(col)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .and_then(|s| s.parse::<f64>().ok())
            })
            .collect();
        rows.insert((economy, year), values);
    }

    if rows.is_empty() {
        warn!("cache '{}' holds no rows; refetching", path.display());
        return None;
    }

    Some(ObservationTable { indicators, rows })
}

/// Persist the table, header first, rows in (economy, year) order.
pub fn save(path: &Path, table: &ObservationTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(2, format!("Failed to create cache '{}': {e}", path.display()))
    })?;

    let mut header = vec![ECONOMY_HEADER.to_string(), YEAR_HEADER.to_string()];
    header.extend(table.indicators.iter().map(|i| i.name.to_string()));
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write cache header: {e}")))?;

    for ((economy, year), values) in &table.rows {
        let mut record = vec![economy.clone(), year.to_string()];
        record.extend(
            values
                .iter()
                .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write cache row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush cache: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::INDICATORS;

    fn sample_table() -> ObservationTable {
        let mut rows: BTreeMap<ObsKey, Vec<Option<f64>>> = BTreeMap::new();
        rows.insert(("FRA".into(), 2010), vec![Some(40000.0), None]);
        rows.insert(("USA".into(), 2010), vec![Some(48000.5), Some(309_000_000.0)]);
        rows.insert(("USA".into(), 2011), vec![None, Some(311_000_000.0)]);
        ObservationTable {
            indicators: vec![INDICATORS[0], INDICATORS[1]],
            rows,
        }
    }

    #[test]
    fn round_trip_preserves_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world_bank_data_v3.csv");

        let table = sample_table();
        save(&path, &table).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded, table);
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.csv")).is_none());
    }

    #[test]
    fn malformed_cache_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "not,a,cache\n1,2,3\n").unwrap();
        assert!(load(&path).is_none());
    }

    #[test]
    fn unknown_columns_are_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.csv");
        std::fs::write(
            &path,
            "economy,Year,GDP per Capita,Mystery Metric\nUSA,2010,48000,7\n",
        )
        .unwrap();

        let table = load(&path).unwrap();
        assert_eq!(table.indicators.len(), 1);
        assert_eq!(table.indicators[0].name, "GDP per Capita");
        assert_eq!(
            table.rows.get(&("USA".into(), 2010)),
            Some(&vec![Some(48000.0)])
        );
    }
}
