//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - built once at startup by the pipeline
//! - shared read-only by every front-end (TUI, `top`, `export`)
//! - written to / reloaded from the CSV cache

use std::collections::BTreeMap;
use std::path::PathBuf;

/// A named, coded World Bank time-series metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    /// World Bank indicator code, e.g. `NY.GDP.PCAP.CD`.
    pub code: &'static str,
    /// Human-readable name used for table columns and chart titles.
    pub name: &'static str,
}

/// World Bank indicator code for GDP per capita (current US$).
pub const GDP_PER_CAPITA: &str = "NY.GDP.PCAP.CD";
/// World Bank indicator code for total population.
pub const POPULATION: &str = "SP.POP.TOTL";
/// World Bank indicator code for life expectancy at birth (years).
pub const LIFE_EXPECTANCY: &str = "SP.DYN.LE00.IN";

/// The fixed indicator registry. Immutable for the process lifetime.
pub const INDICATORS: [Indicator; 6] = [
    Indicator {
        code: GDP_PER_CAPITA,
        name: "GDP per Capita",
    },
    Indicator {
        code: POPULATION,
        name: "Population",
    },
    Indicator {
        code: LIFE_EXPECTANCY,
        name: "Life Expectancy",
    },
    Indicator {
        code: "SE.XPD.TOTL.GD.ZS",
        name: "Education Expenditure (% GDP)",
    },
    Indicator {
        code: "SH.XPD.CHEX.GD.ZS",
        name: "Health Expenditure (% GDP)",
    },
    Indicator {
        code: "NY.GDP.MKTP.KD.ZG",
        name: "GDP Growth Rate",
    },
];

impl Indicator {
    pub fn by_code(code: &str) -> Option<Indicator> {
        INDICATORS.iter().find(|i| i.code == code).copied()
    }

    pub fn by_name(name: &str) -> Option<Indicator> {
        INDICATORS.iter().find(|i| i.name == name).copied()
    }
}

/// Ordinal income category derived from GDP per capita.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IncomeCategory {
    Low,
    LowerMiddle,
    UpperMiddle,
    High,
    VeryHigh,
}

impl IncomeCategory {
    pub const ALL: [IncomeCategory; 5] = [
        IncomeCategory::Low,
        IncomeCategory::LowerMiddle,
        IncomeCategory::UpperMiddle,
        IncomeCategory::High,
        IncomeCategory::VeryHigh,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            IncomeCategory::Low => "Low Income",
            IncomeCategory::LowerMiddle => "Lower Middle",
            IncomeCategory::UpperMiddle => "Upper Middle",
            IncomeCategory::High => "High Income",
            IncomeCategory::VeryHigh => "Very High Income",
        }
    }
}

/// Bucket a GDP-per-capita value into an income category.
///
/// Bins are closed below, open above: a value exactly at a boundary belongs
/// to the higher bin (1000 is Lower Middle, not Low). Null propagates to
/// null, as do negative and non-finite inputs.
pub fn categorize(gdp_per_capita: Option<f64>) -> Option<IncomeCategory> {
    let v = gdp_per_capita?;
    if !v.is_finite() || v < 0.0 {
        return None;
    }
    Some(if v < 1_000.0 {
        IncomeCategory::Low
    } else if v < 5_000.0 {
        IncomeCategory::LowerMiddle
    } else if v < 15_000.0 {
        IncomeCategory::UpperMiddle
    } else if v < 50_000.0 {
        IncomeCategory::High
    } else {
        IncomeCategory::VeryHigh
    })
}

/// Key of one observation row: (economy code, year).
pub type ObsKey = (String, i32);

/// The merged observation table: one row per (economy, year) seen in any
/// fetched indicator, one value column per fetched indicator.
///
/// `BTreeMap` keeps rows ordered economy-major with years ascending inside
/// each economy. The per-economy fill pass and the cache writer both rely on
/// that ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    /// Fetched indicators, in fetch order. Indicators whose fetch yielded
    /// zero rows are absent.
    pub indicators: Vec<Indicator>,
    /// Values aligned with `indicators`; `None` marks a missing observation.
    pub rows: BTreeMap<ObsKey, Vec<Option<f64>>>,
}

impl ObservationTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn indicator_index(&self, code: &str) -> Option<usize> {
        self.indicators.iter().position(|i| i.code == code)
    }
}

/// One enriched row of the final dataset.
#[derive(Debug, Clone)]
pub struct CountryYear {
    /// Economy code (ISO-3 alpha for countries, WB code for aggregates).
    pub economy: String,
    /// Display name; falls back to the economy code when metadata is
    /// unavailable.
    pub name: String,
    /// Region code; empty when unknown.
    pub region_code: String,
    /// Region display name; falls back to the raw region code.
    pub region: String,
    pub year: i32,
    /// Values aligned with `Dataset::indicators`.
    pub values: Vec<Option<f64>>,
    /// Derived from the GDP per Capita column after the fill pass.
    pub gdp_category: Option<IncomeCategory>,
}

/// The enriched table served to the dashboard.
///
/// Built once at process start (from cache or fresh fetch) and never mutated
/// afterwards; every front-end reads it by shared reference.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub indicators: Vec<Indicator>,
    pub rows: Vec<CountryYear>,
    pub year_min: i32,
    pub year_max: i32,
}

impl Dataset {
    pub fn indicator_index(&self, code: &str) -> Option<usize> {
        self.indicators.iter().position(|i| i.code == code)
    }

    /// Sorted, deduplicated country display names (dropdown contents).
    pub fn country_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rows.iter().map(|r| r.name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Number of distinct non-empty region display names.
    pub fn region_count(&self) -> usize {
        let mut regions: Vec<&str> = self
            .rows
            .iter()
            .map(|r| r.region.as_str())
            .filter(|r| !r.is_empty())
            .collect();
        regions.sort();
        regions.dedup();
        regions.len()
    }
}

/// The dashboard's three UI controls.
#[derive(Debug, Clone)]
pub struct Selection {
    pub indicator: Indicator,
    pub year: i32,
    /// Country display name; `None` means "all countries".
    pub country: Option<String>,
}

/// Startup pipeline configuration, derived from CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub start_year: i32,
    pub end_year: i32,
    pub cache_path: PathBuf,
    /// Skip the cache and fetch fresh data.
    pub refresh: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorize_boundaries() {
        assert_eq!(categorize(Some(999.0)), Some(IncomeCategory::Low));
        assert_eq!(categorize(Some(1000.0)), Some(IncomeCategory::LowerMiddle));
        assert_eq!(categorize(Some(4999.99)), Some(IncomeCategory::LowerMiddle));
        assert_eq!(categorize(Some(5000.0)), Some(IncomeCategory::UpperMiddle));
        assert_eq!(categorize(Some(15000.0)), Some(IncomeCategory::High));
        assert_eq!(categorize(Some(50000.0)), Some(IncomeCategory::VeryHigh));
        assert_eq!(categorize(Some(0.0)), Some(IncomeCategory::Low));
    }

    #[test]
    fn categorize_propagates_null() {
        assert_eq!(categorize(None), None);
        assert_eq!(categorize(Some(f64::NAN)), None);
        assert_eq!(categorize(Some(-1.0)), None);
    }

    #[test]
    fn registry_lookup() {
        assert_eq!(Indicator::by_code(GDP_PER_CAPITA).map(|i| i.name), Some("GDP per Capita"));
        assert_eq!(Indicator::by_name("Population").map(|i| i.code), Some(POPULATION));
        assert_eq!(Indicator::by_code("NOPE"), None);
    }

    #[test]
    fn observation_table_ordering_is_economy_major() {
        let mut table = ObservationTable {
            indicators: vec![INDICATORS[0]],
            rows: BTreeMap::new(),
        };
        table.rows.insert(("USA".into(), 2011), vec![Some(1.0)]);
        table.rows.insert(("FRA".into(), 2012), vec![Some(2.0)]);
        table.rows.insert(("FRA".into(), 2010), vec![Some(3.0)]);
        table.rows.insert(("USA".into(), 2010), vec![Some(4.0)]);

        let keys: Vec<ObsKey> = table.rows.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                ("FRA".into(), 2010),
                ("FRA".into(), 2012),
                ("USA".into(), 2010),
                ("USA".into(), 2011),
            ]
        );
    }
}
