//! World Bank API integration for the indicator registry.
//!
//! Two query shapes are consumed, per the v2 JSON API:
//!
//! - indicator time series for a code over a year range
//!   (`/country/all/indicator/{code}?date=A:B`)
//! - economy/region reference metadata (`/country`, `/region`)
//!
//! Either source may be wholly unavailable; the pipeline degrades rather
//! than aborting (per-year fallback, indicator skip, identity metadata).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::data::normalize::{self, LongRow, RawIndicatorTable, RawRow, TableSchema};
use crate::domain::{INDICATORS, Indicator, ObservationTable};
use crate::error::AppError;

const BASE_URL: &str = "https://api.worldbank.org/v2";
const PER_PAGE: usize = 20000;

/// Explicit per-request timeout. The original tooling relied on transport
/// defaults; 30s is a safe ceiling for the v2 API's worst pages.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct WorldBankClient {
    http: Client,
    base_url: String,
}

impl WorldBankClient {
    pub fn new() -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Batch fetch: one request (paged if needed) spanning the whole range.
    ///
    /// Fails on network errors, malformed responses, or responses with no
    /// usable economy identifiers.
    pub fn fetch_indicator(
        &self,
        indicator: Indicator,
        start_year: i32,
        end_year: i32,
    ) -> Result<RawIndicatorTable, AppError> {
        let date = if start_year == end_year {
            start_year.to_string()
        } else {
            format!("{start_year}:{end_year}")
        };
        let path = format!("country/all/indicator/{}", indicator.code);
        let rows: Vec<SeriesRow> = self.get_paged(&path, &[("date", date)])?;
        pivot_series(rows, start_year, end_year)
    }

    /// Fallback path: one request per year, each failure swallowed into an
    /// explicit per-year outcome instead of surfacing.
    pub fn fetch_indicator_per_year(
        &self,
        indicator: Indicator,
        start_year: i32,
        end_year: i32,
    ) -> (Vec<LongRow>, Vec<(i32, YearOutcome)>) {
        per_year_outcomes(start_year, end_year, |year| {
            self.fetch_indicator(indicator, year, year)
                .and_then(|raw| normalize::normalize(&raw))
        })
    }

    /// Full economy reference metadata. Returns empty maps only on success
    /// with an empty payload; transport/parse failures are an `Err` so the
    /// caller can choose its fallback.
    pub fn fetch_economies(&self) -> Result<EconomyMetadata, AppError> {
        let rows: Vec<EconomyRow> = self.get_paged("country", &[])?;

        let mut meta = EconomyMetadata::default();
        for row in rows {
            let code = row.id;
            if code.is_empty() {
                continue;
            }
            if let Some(name) = row.name {
                meta.names.insert(code.clone(), name);
            }
            let region = row.region.as_ref();
            let region_code = region.and_then(|r| r.id.clone()).unwrap_or_default();
            let region_name = region.and_then(|r| r.value.clone()).unwrap_or_default();
            // The API marks aggregates ("World", "OECD members", ...) by a
            // region literally named "Aggregates".
            let is_aggregate = region_name.trim() == "Aggregates" || region_code.is_empty();
            if !is_aggregate {
                meta.regions.insert(code.clone(), region_code);
                meta.countries.insert(code);
            }
        }
        Ok(meta)
    }

    /// Region code to display name mapping.
    pub fn fetch_regions(&self) -> Result<HashMap<String, String>, AppError> {
        let rows: Vec<RegionRow> = self.get_paged("region", &[])?;
        let mut map = HashMap::new();
        for row in rows {
            if let (Some(code), Some(name)) = (row.code, row.name) {
                if !code.is_empty() {
                    map.insert(code, name.trim().to_string());
                }
            }
        }
        Ok(map)
    }

    /// GET a v2 endpoint, walking pagination until exhausted.
    ///
    /// v2 responses are a two-element JSON array: `[page info, rows]`.
    fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        extra_query: &[(&str, String)],
    ) -> Result<Vec<T>, AppError> {
        let url = format!("{}/{path}", self.base_url);
        let mut out = Vec::new();
        let mut page = 1u32;

        loop {
            let resp = self
                .http
                .get(&url)
                .query(&[
                    ("format", "json".to_string()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .query(extra_query)
                .send()
                .map_err(|e| AppError::transport(format!("World Bank request failed: {e}")))?;

            if !resp.status().is_success() {
                return Err(AppError::transport(format!(
                    "World Bank request failed with status {}.",
                    resp.status()
                )));
            }

            let body: Vec<serde_json::Value> = resp
                .json()
                .map_err(|e| AppError::transport(format!("Failed to parse World Bank response: {e}")))?;

            // Error payloads (unknown indicator, bad query) come back as a
            // one-element array holding a message object.
            if body.len() < 2 {
                return Err(AppError::transport(format!(
                    "Unexpected World Bank response shape for '{path}'."
                )));
            }

            let meta: PageInfo = serde_json::from_value(body[0].clone())
                .map_err(|e| AppError::transport(format!("Invalid World Bank page info: {e}")))?;
            let rows: Option<Vec<T>> = serde_json::from_value(body[1].clone())
                .map_err(|e| AppError::transport(format!("Invalid World Bank rows: {e}")))?;
            out.extend(rows.unwrap_or_default());

            if page >= meta.pages.max(1) {
                break;
            }
            page += 1;
        }

        Ok(out)
    }
}

/// Result of one year's request in the per-year fallback.
#[derive(Debug, Clone)]
pub enum YearOutcome {
    /// Rows contributed by this year.
    Fetched(usize),
    Failed(String),
}

/// Per-indicator fetch summary, logged once per run.
#[derive(Debug, Clone)]
pub struct IndicatorFetch {
    pub indicator: Indicator,
    pub rows: usize,
    pub via_fallback: bool,
    /// Per-year outcomes; empty unless the fallback path ran.
    pub years: Vec<(i32, YearOutcome)>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub indicators: Vec<IndicatorFetch>,
}

impl FetchReport {
    /// Display names of indicators that contributed no rows at all.
    pub fn dropped(&self) -> Vec<&'static str> {
        self.indicators
            .iter()
            .filter(|f| f.rows == 0)
            .map(|f| f.indicator.name)
            .collect()
    }
}

/// Country display names, region codes, and the "real country" set.
///
/// All three collections are empty when the metadata source is unreachable,
/// which downstream code treats as "fall back to economy codes, skip the
/// aggregate filter".
#[derive(Debug, Clone, Default)]
pub struct EconomyMetadata {
    pub names: HashMap<String, String>,
    pub regions: HashMap<String, String>,
    pub countries: HashSet<String>,
}

/// Fetch every registry indicator sequentially and outer-join the results.
///
/// Per-indicator failures fall back to per-year requests; indicators that
/// still yield nothing are dropped with a warning. Nothing here aborts the
/// pipeline; an empty table is the caller's fatal condition to judge.
pub fn fetch_all_indicators(
    client: &WorldBankClient,
    start_year: i32,
    end_year: i32,
) -> (ObservationTable, FetchReport) {
    let mut fetched: Vec<(Indicator, Vec<LongRow>)> = Vec::new();
    let mut report = FetchReport::default();

    for indicator in INDICATORS {
        info!("fetching {} ({})", indicator.name, indicator.code);

        match client
            .fetch_indicator(indicator, start_year, end_year)
            .and_then(|raw| normalize::normalize(&raw))
        {
            Ok(long) if !long.is_empty() => {
                report.indicators.push(IndicatorFetch {
                    indicator,
                    rows: long.len(),
                    via_fallback: false,
                    years: Vec::new(),
                });
                fetched.push((indicator, long));
            }
            Ok(_) => {
                warn!("no observations for {}; skipping", indicator.name);
                report.indicators.push(IndicatorFetch {
                    indicator,
                    rows: 0,
                    via_fallback: false,
                    years: Vec::new(),
                });
            }
            Err(err) => {
                warn!(
                    "batch fetch failed for {} ({err}); trying per-year fallback",
                    indicator.name
                );
                let (long, years) = client.fetch_indicator_per_year(indicator, start_year, end_year);
                log_fallback_summary(indicator, &years);

                let rows = long.len();
                if rows > 0 {
                    fetched.push((indicator, long));
                } else {
                    warn!("fallback failed for {}; dropping indicator", indicator.name);
                }
                report.indicators.push(IndicatorFetch {
                    indicator,
                    rows,
                    via_fallback: true,
                    years,
                });
            }
        }
    }

    (normalize::merge(fetched), report)
}

/// Fetch economy and region metadata, degrading each to empty on failure.
pub fn fetch_metadata(client: &WorldBankClient) -> (EconomyMetadata, HashMap<String, String>) {
    let economies = match client.fetch_economies() {
        Ok(meta) => meta,
        Err(err) => {
            warn!("economy metadata unavailable ({err}); using economy codes as names");
            EconomyMetadata::default()
        }
    };
    let regions = match client.fetch_regions() {
        Ok(map) => map,
        Err(err) => {
            warn!("region metadata unavailable ({err}); showing raw region codes");
            HashMap::new()
        }
    };
    (economies, regions)
}

/// Drive one fetch per year, isolating failures: a failed year records a
/// `Failed` outcome and the loop moves on, so the other years' rows survive.
fn per_year_outcomes(
    start_year: i32,
    end_year: i32,
    mut fetch_year: impl FnMut(i32) -> Result<Vec<LongRow>, AppError>,
) -> (Vec<LongRow>, Vec<(i32, YearOutcome)>) {
    let mut long = Vec::new();
    let mut outcomes = Vec::with_capacity((end_year - start_year + 1).max(0) as usize);

    for year in start_year..=end_year {
        match fetch_year(year) {
            Ok(rows) => {
                outcomes.push((year, YearOutcome::Fetched(rows.len())));
                long.extend(rows);
            }
            Err(err) => outcomes.push((year, YearOutcome::Failed(err.to_string()))),
        }
    }

    (long, outcomes)
}

/// One aggregated line per fallback run instead of a warning per year.
fn log_fallback_summary(indicator: Indicator, years: &[(i32, YearOutcome)]) {
    let total = years.len();
    let failed: Vec<String> = years
        .iter()
        .filter_map(|(year, outcome)| match outcome {
            YearOutcome::Fetched(_) => None,
            YearOutcome::Failed(_) => Some(year.to_string()),
        })
        .collect();

    if failed.is_empty() {
        info!("per-year fallback for {}: all {total} years fetched", indicator.name);
    } else {
        warn!(
            "per-year fallback for {}: {}/{} years fetched (failed: {})",
            indicator.name,
            total - failed.len(),
            total,
            failed.join(", ")
        );
    }
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(default)]
    pages: u32,
}

/// One time-series observation from `/country/all/indicator/{code}`.
#[derive(Debug, Deserialize)]
struct SeriesRow {
    #[serde(default)]
    countryiso3code: String,
    country: Option<CodeValue>,
    date: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CodeValue {
    id: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EconomyRow {
    #[serde(default)]
    id: String,
    name: Option<String>,
    region: Option<CodeValue>,
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    code: Option<String>,
    name: Option<String>,
}

/// Pivot long API rows into the wide per-economy shape the normalizer
/// expects. Rows with unparsable dates or years outside the requested range
/// are dropped; a non-empty payload with no economy identifiers at all is a
/// parse error.
fn pivot_series(
    rows: Vec<SeriesRow>,
    start_year: i32,
    end_year: i32,
) -> Result<RawIndicatorTable, AppError> {
    let schema = TableSchema::for_years(start_year, end_year);
    let width = schema.year_columns.len();
    let had_input = !rows.is_empty();

    let mut by_economy: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for row in rows {
        let Some(economy) = economy_code(&row) else {
            continue;
        };
        let Ok(year) = row.date.parse::<i32>() else {
            continue;
        };
        if year < start_year || year > end_year {
            continue;
        }
        let slot = by_economy.entry(economy).or_insert_with(|| vec![None; width]);
        slot[(year - start_year) as usize] = row.value.filter(|v| v.is_finite());
    }

    if had_input && by_economy.is_empty() {
        return Err(AppError::transport(
            "World Bank response carries no economy identifiers.",
        ));
    }

    Ok(RawIndicatorTable {
        schema,
        rows: by_economy
            .into_iter()
            .map(|(economy, values)| RawRow {
                ids: vec![economy],
                values,
            })
            .collect(),
    })
}

fn economy_code(row: &SeriesRow) -> Option<String> {
    let iso3 = row.countryiso3code.trim();
    if !iso3.is_empty() {
        return Some(iso3.to_string());
    }
    row.country
        .as_ref()
        .and_then(|c| c.id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_rows(json: &str) -> Vec<SeriesRow> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn pivot_keeps_years_within_range() {
        let rows = series_rows(
            r#"[
                {"countryiso3code": "USA", "date": "2010", "value": 48000.0},
                {"countryiso3code": "USA", "date": "2011", "value": 50000.0},
                {"countryiso3code": "USA", "date": "2009", "value": 46000.0},
                {"countryiso3code": "FRA", "date": "2010", "value": null},
                {"countryiso3code": "", "country": {"id": "DEU", "value": "Germany"}, "date": "2011", "value": 42000.0}
            ]"#,
        );

        let raw = pivot_series(rows, 2010, 2011).unwrap();
        assert_eq!(raw.schema.year_columns, vec!["YR2010", "YR2011"]);
        assert_eq!(raw.rows.len(), 3);

        let long = normalize::normalize(&raw).unwrap();
        assert!(long.iter().all(|r| r.year == 2010 || r.year == 2011));
        assert!(long.iter().all(|r| r.value.is_none_or(f64::is_finite)));
        // 2009 fell outside the requested range.
        let usa: Vec<_> = long.iter().filter(|r| r.economy == "USA").collect();
        assert_eq!(usa.len(), 2);
        // The economy code fell back to country.id when iso3 was blank.
        assert!(long.iter().any(|r| r.economy == "DEU"));
    }

    #[test]
    fn pivot_without_identifiers_is_a_parse_error() {
        let rows = series_rows(r#"[{"countryiso3code": "", "date": "2010", "value": 1.0}]"#);
        assert!(pivot_series(rows, 2010, 2010).is_err());
    }

    #[test]
    fn pivot_of_empty_payload_is_an_empty_table() {
        let raw = pivot_series(Vec::new(), 2010, 2012).unwrap();
        assert!(raw.rows.is_empty());
    }

    #[test]
    fn one_failed_year_does_not_cost_the_others() {
        let (long, outcomes) = per_year_outcomes(2010, 2012, |year| {
            if year == 2011 {
                return Err(AppError::transport("timeout"));
            }
            Ok(vec![LongRow {
                economy: "USA".into(),
                year,
                value: Some(year as f64),
            }])
        });

        // 2010 and 2012 survive the 2011 failure.
        let years: Vec<i32> = long.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2010, 2012]);

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[0], (2010, YearOutcome::Fetched(1))));
        assert!(matches!(outcomes[1], (2011, YearOutcome::Failed(_))));
        assert!(matches!(outcomes[2], (2012, YearOutcome::Fetched(1))));
        if let (_, YearOutcome::Failed(reason)) = &outcomes[1] {
            assert_eq!(reason, "timeout");
        }
    }
}
