//! Metadata enrichment: names, regions, aggregate filtering, null filling,
//! income categorization.
//!
//! Every metadata field follows one fallback rule, `lookup_or`: take the
//! mapped value, else show the key itself. There is no second name source
//! and no nested fallback chain.

use std::collections::HashMap;

use tracing::warn;

use crate::data::worldbank::EconomyMetadata;
use crate::domain::{
    CountryYear, Dataset, GDP_PER_CAPITA, ObservationTable, categorize,
};

/// Single fallback rule for metadata lookups.
pub fn lookup_or(map: &HashMap<String, String>, key: &str, default: &str) -> String {
    map.get(key).cloned().unwrap_or_else(|| default.to_string())
}

/// Join the observation table with economy/region metadata and derive the
/// income category.
///
/// Order matters: aggregate filter, then forward/backward fill, then
/// categorization, so categories are defined wherever GDP per capita was
/// fetched at least once for an economy.
pub fn enrich(
    table: &ObservationTable,
    economies: &EconomyMetadata,
    regions: &HashMap<String, String>,
) -> Dataset {
    let width = table.indicators.len();

    let mut rows: Vec<CountryYear> = table
        .rows
        .iter()
        .map(|((economy, year), values)| {
            let region_code = economies
                .regions
                .get(economy)
                .cloned()
                .unwrap_or_default();
            let region = if region_code.is_empty() {
                String::new()
            } else {
                lookup_or(regions, &region_code, &region_code)
            };
            CountryYear {
                name: lookup_or(&economies.names, economy, economy),
                economy: economy.clone(),
                region_code,
                region,
                year: *year,
                values: values.clone(),
                gdp_category: None,
            }
        })
        .collect();

    // Keep real countries only. When metadata was unavailable the set is
    // empty and the filter does not apply; when the filter would remove
    // everything, keep the unfiltered table rather than serve an empty
    // dashboard.
    if !economies.countries.is_empty() {
        let filtered: Vec<CountryYear> = rows
            .iter()
            .filter(|r| economies.countries.contains(&r.economy))
            .cloned()
            .collect();
        if filtered.is_empty() {
            warn!("aggregate filter would remove every row; keeping unfiltered table");
        } else {
            rows = filtered;
        }
    }

    fill_by_economy(&mut rows, width);

    let gdp_idx = table.indicator_index(GDP_PER_CAPITA);
    for row in &mut rows {
        row.gdp_category = gdp_idx.and_then(|idx| categorize(row.values[idx]));
    }

    let year_min = rows.iter().map(|r| r.year).min().unwrap_or(0);
    let year_max = rows.iter().map(|r| r.year).max().unwrap_or(0);

    Dataset {
        indicators: table.indicators.clone(),
        rows,
        year_min,
        year_max,
    }
}

/// Forward-fill then backward-fill each column, grouped by economy.
///
/// Rows arrive economy-major with years ascending (BTreeMap order), so each
/// group is a contiguous slice. Grouping prevents the last year of one
/// economy from leaking into the first year of the next.
fn fill_by_economy(rows: &mut [CountryYear], width: usize) {
    let mut start = 0;
    while start < rows.len() {
        let economy = rows[start].economy.clone();
        let mut end = start + 1;
        while end < rows.len() && rows[end].economy == economy {
            end += 1;
        }
        fill_group(&mut rows[start..end], width);
        start = end;
    }
}

fn fill_group(group: &mut [CountryYear], width: usize) {
    for col in 0..width {
        let mut last: Option<f64> = None;
        for row in group.iter_mut() {
            match row.values[col] {
                Some(v) => last = Some(v),
                None => row.values[col] = last,
            }
        }
        let mut next: Option<f64> = None;
        for row in group.iter_mut().rev() {
            match row.values[col] {
                Some(v) => next = Some(v),
                None => row.values[col] = next,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;
    use crate::domain::{INDICATORS, IncomeCategory, ObsKey};

    fn table(rows: Vec<(&str, i32, Vec<Option<f64>>)>) -> ObservationTable {
        let mut map: BTreeMap<ObsKey, Vec<Option<f64>>> = BTreeMap::new();
        for (economy, year, values) in rows {
            map.insert((economy.to_string(), year), values);
        }
        ObservationTable {
            indicators: vec![INDICATORS[0]],
            rows: map,
        }
    }

    fn metadata(
        names: &[(&str, &str)],
        regions: &[(&str, &str)],
        countries: &[&str],
    ) -> EconomyMetadata {
        EconomyMetadata {
            names: names
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            regions: regions
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            countries: countries.iter().map(|c| c.to_string()).collect::<HashSet<_>>(),
        }
    }

    #[test]
    fn missing_metadata_falls_back_to_codes() {
        let table = table(vec![("USA", 2010, vec![Some(48000.0)])]);
        let dataset = enrich(&table, &EconomyMetadata::default(), &HashMap::new());

        assert_eq!(dataset.rows.len(), 1);
        assert_eq!(dataset.rows[0].name, "USA");
        assert_eq!(dataset.rows[0].region, "");
    }

    #[test]
    fn region_name_falls_back_to_region_code() {
        let table = table(vec![("USA", 2010, vec![Some(48000.0)])]);
        let economies = metadata(
            &[("USA", "United States")],
            &[("USA", "NAC")],
            &["USA"],
        );
        // No region map entry for NAC: show the raw code.
        let dataset = enrich(&table, &economies, &HashMap::new());
        assert_eq!(dataset.rows[0].region_code, "NAC");
        assert_eq!(dataset.rows[0].region, "NAC");

        let regions: HashMap<String, String> =
            [("NAC".to_string(), "North America".to_string())].into();
        let dataset = enrich(&table, &economies, &regions);
        assert_eq!(dataset.rows[0].region, "North America");
    }

    #[test]
    fn aggregate_filter_is_skipped_when_it_would_empty_the_table() {
        let table = table(vec![("WLD", 2010, vec![Some(11000.0)])]);
        // Metadata knows only real countries; WLD is not among them.
        let economies = metadata(&[("USA", "United States")], &[], &["USA"]);
        let dataset = enrich(&table, &economies, &HashMap::new());

        assert_eq!(dataset.rows.len(), 1);
        assert_eq!(dataset.rows[0].economy, "WLD");
    }

    #[test]
    fn aggregates_are_dropped_when_countries_remain() {
        let table = table(vec![
            ("USA", 2010, vec![Some(48000.0)]),
            ("WLD", 2010, vec![Some(11000.0)]),
        ]);
        let economies = metadata(&[("USA", "United States")], &[], &["USA"]);
        let dataset = enrich(&table, &economies, &HashMap::new());

        assert_eq!(dataset.rows.len(), 1);
        assert_eq!(dataset.rows[0].economy, "USA");
    }

    #[test]
    fn fill_does_not_leak_across_economies() {
        let table = table(vec![
            ("FRA", 2010, vec![Some(40000.0)]),
            ("FRA", 2011, vec![None]),
            ("USA", 2010, vec![None]),
            ("USA", 2011, vec![Some(50000.0)]),
        ]);
        let dataset = enrich(&table, &EconomyMetadata::default(), &HashMap::new());

        let value = |economy: &str, year: i32| {
            dataset
                .rows
                .iter()
                .find(|r| r.economy == economy && r.year == year)
                .unwrap()
                .values[0]
        };
        // FRA 2011 forward-filled from FRA 2010.
        assert_eq!(value("FRA", 2011), Some(40000.0));
        // USA 2010 backward-filled from USA 2011, not from FRA.
        assert_eq!(value("USA", 2010), Some(50000.0));
    }

    // Fill then categorize: FRA 2011 is absent from the API and takes its
    // 2010 value; categories follow the breakpoints afterwards.
    #[test]
    fn fill_then_categorize_scenario() {
        let table = table(vec![
            ("USA", 2010, vec![Some(48000.0)]),
            ("USA", 2011, vec![Some(50000.0)]),
            ("FRA", 2010, vec![Some(40000.0)]),
            ("FRA", 2011, vec![None]),
        ]);
        let dataset = enrich(&table, &EconomyMetadata::default(), &HashMap::new());

        let fra_2011 = dataset
            .rows
            .iter()
            .find(|r| r.economy == "FRA" && r.year == 2011)
            .unwrap();
        assert_eq!(fra_2011.values[0], Some(40000.0));

        // Values in [15000, 50000) are High, 50000 and above Very High.
        for row in &dataset.rows {
            let expected = if row.values[0] >= Some(50000.0) {
                IncomeCategory::VeryHigh
            } else {
                IncomeCategory::High
            };
            assert_eq!(row.gdp_category, Some(expected));
        }
        assert_eq!((dataset.year_min, dataset.year_max), (2010, 2011));
    }
}
