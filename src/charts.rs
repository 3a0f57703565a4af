//! Chart specifications derived from the dataset and the current selection.
//!
//! All five specs are recomputed synchronously on every control change and
//! handed to the presentation layer, which only draws. Keeping the data prep
//! here (pure functions over the read-only dataset) makes it testable
//! without a terminal.

use crate::domain::{
    CountryYear, Dataset, GDP_PER_CAPITA, IncomeCategory, LIFE_EXPECTANCY, POPULATION, Selection,
};

/// Everything the dashboard renders for one selection.
#[derive(Debug, Clone)]
pub struct ChartSet {
    pub map: ChoroplethSpec,
    pub trend: TrendSpec,
    pub bubble: BubbleSpec,
    pub bar: BarSpec,
    pub regions: RegionBoxSpec,
}

/// Geographic value map: one entry per economy for the selected year.
#[derive(Debug, Clone)]
pub struct ChoroplethSpec {
    pub title: String,
    /// Sorted descending by value; null values sort last.
    pub entries: Vec<MapEntry>,
}

#[derive(Debug, Clone)]
pub struct MapEntry {
    pub economy: String,
    pub name: String,
    pub region: String,
    pub value: Option<f64>,
}

/// Multi-series time trend.
#[derive(Debug, Clone)]
pub struct TrendSpec {
    pub title: String,
    pub series: Vec<TrendSeries>,
}

#[derive(Debug, Clone)]
pub struct TrendSeries {
    pub name: String,
    /// (year, value), years ascending, nulls dropped.
    pub points: Vec<(i32, f64)>,
}

/// GDP/capita vs life expectancy, sized by population, colored by income
/// category.
#[derive(Debug, Clone)]
pub struct BubbleSpec {
    pub title: String,
    pub points: Vec<BubblePoint>,
}

#[derive(Debug, Clone)]
pub struct BubblePoint {
    pub name: String,
    pub region: String,
    pub gdp_per_capita: f64,
    pub life_expectancy: f64,
    pub population: f64,
    pub category: Option<IncomeCategory>,
}

/// Horizontal top-20 ranking.
#[derive(Debug, Clone)]
pub struct BarSpec {
    pub title: String,
    /// Ascending by value, so the largest bar renders last (top of a
    /// horizontal chart drawn bottom-up, per the usual convention).
    pub entries: Vec<BarEntry>,
}

#[derive(Debug, Clone)]
pub struct BarEntry {
    pub name: String,
    pub region: String,
    pub value: f64,
}

/// Per-region distribution summary (box plot).
#[derive(Debug, Clone)]
pub struct RegionBoxSpec {
    pub title: String,
    /// Sorted by region name; empty when no row carries a region.
    pub groups: Vec<RegionBox>,
}

#[derive(Debug, Clone)]
pub struct RegionBox {
    pub region: String,
    pub n: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Derive all five chart specs for the current selection.
pub fn derive_all(dataset: &Dataset, sel: &Selection) -> ChartSet {
    ChartSet {
        map: choropleth(dataset, sel),
        trend: time_trend(dataset, sel),
        bubble: bubble(dataset, sel),
        bar: top_bar(dataset, sel, 20),
        regions: region_box(dataset, sel),
    }
}

/// Rows for the selected year, restricted to the selected country when one
/// is chosen. A malformed selection simply yields an empty slice.
fn rows_for_year<'a>(dataset: &'a Dataset, sel: &Selection) -> Vec<&'a CountryYear> {
    dataset
        .rows
        .iter()
        .filter(|r| r.year == sel.year)
        .filter(|r| sel.country.as_deref().is_none_or(|c| r.name == c))
        .collect()
}

fn indicator_value(dataset: &Dataset, row: &CountryYear, code: &str) -> Option<f64> {
    dataset
        .indicator_index(code)
        .and_then(|idx| row.values.get(idx).copied().flatten())
}

pub fn choropleth(dataset: &Dataset, sel: &Selection) -> ChoroplethSpec {
    let idx = dataset.indicator_index(sel.indicator.code);
    let mut entries: Vec<MapEntry> = rows_for_year(dataset, sel)
        .into_iter()
        .map(|r| MapEntry {
            economy: r.economy.clone(),
            name: r.name.clone(),
            region: r.region.clone(),
            value: idx.and_then(|i| r.values.get(i).copied().flatten()),
        })
        .collect();
    entries.sort_by(|a, b| match (a.value, b.value) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });

    ChoroplethSpec {
        title: format!("{} by Country ({})", sel.indicator.name, sel.year),
        entries,
    }
}

/// Time trend: the selected country's full year series, or the top-10
/// economies by the selected indicator in the selected year.
pub fn time_trend(dataset: &Dataset, sel: &Selection) -> TrendSpec {
    let (economies, title) = match &sel.country {
        Some(country) => {
            // Display names are not guaranteed unique; keep every economy
            // that carries the selected name.
            let mut codes: Vec<String> = dataset
                .rows
                .iter()
                .filter(|r| &r.name == country)
                .map(|r| r.economy.clone())
                .collect();
            codes.sort();
            codes.dedup();
            (codes, format!("Trend: {country} ({})", sel.indicator.name))
        }
        None => {
            let mut year_rows: Vec<&CountryYear> = dataset
                .rows
                .iter()
                .filter(|r| r.year == sel.year)
                .collect();
            let idx = dataset.indicator_index(sel.indicator.code);
            year_rows.sort_by(|a, b| {
                let va = idx.and_then(|i| a.values.get(i).copied().flatten());
                let vb = idx.and_then(|i| b.values.get(i).copied().flatten());
                match (va, vb) {
                    (Some(x), Some(y)) => y.total_cmp(&x),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            });
            let codes = year_rows
                .iter()
                .filter(|r| indicator_value(dataset, r, sel.indicator.code).is_some())
                .take(10)
                .map(|r| r.economy.clone())
                .collect();
            (codes, format!("Trend: Top 10 Countries ({})", sel.indicator.name))
        }
    };

    let series = economies
        .into_iter()
        .filter_map(|economy| {
            let mut points: Vec<(i32, f64)> = dataset
                .rows
                .iter()
                .filter(|r| r.economy == economy)
                .filter_map(|r| {
                    indicator_value(dataset, r, sel.indicator.code).map(|v| (r.year, v))
                })
                .collect();
            points.sort_by_key(|(year, _)| *year);
            let name = dataset
                .rows
                .iter()
                .find(|r| r.economy == economy)
                .map(|r| r.name.clone())?;
            if points.is_empty() {
                return None;
            }
            Some(TrendSeries { name, points })
        })
        .collect();

    TrendSpec { title, series }
}

pub fn bubble(dataset: &Dataset, sel: &Selection) -> BubbleSpec {
    let points = rows_for_year(dataset, sel)
        .into_iter()
        .filter_map(|r| {
            let gdp = indicator_value(dataset, r, GDP_PER_CAPITA)?;
            let life = indicator_value(dataset, r, LIFE_EXPECTANCY)?;
            let pop = indicator_value(dataset, r, POPULATION)?;
            Some(BubblePoint {
                name: r.name.clone(),
                region: r.region.clone(),
                gdp_per_capita: gdp,
                life_expectancy: life,
                population: pop,
                category: r.gdp_category,
            })
        })
        .collect();

    BubbleSpec {
        title: format!("GDP per Capita vs Life Expectancy ({})", sel.year),
        points,
    }
}

pub fn top_bar(dataset: &Dataset, sel: &Selection, top_n: usize) -> BarSpec {
    let idx = dataset.indicator_index(sel.indicator.code);
    let mut ranked: Vec<BarEntry> = rows_for_year(dataset, sel)
        .into_iter()
        .filter_map(|r| {
            let value = idx.and_then(|i| r.values.get(i).copied().flatten())?;
            Some(BarEntry {
                name: r.name.clone(),
                region: r.region.clone(),
                value,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
    ranked.truncate(top_n);
    ranked.reverse();

    BarSpec {
        title: format!("Top {top_n} Countries: {} ({})", sel.indicator.name, sel.year),
        entries: ranked,
    }
}

pub fn region_box(dataset: &Dataset, sel: &Selection) -> RegionBoxSpec {
    let idx = dataset.indicator_index(sel.indicator.code);
    let mut by_region: Vec<(String, Vec<f64>)> = Vec::new();

    for row in rows_for_year(dataset, sel) {
        if row.region.is_empty() {
            continue;
        }
        let Some(value) = idx.and_then(|i| row.values.get(i).copied().flatten()) else {
            continue;
        };
        match by_region.iter_mut().find(|(region, _)| region == &row.region) {
            Some((_, values)) => values.push(value),
            None => by_region.push((row.region.clone(), vec![value])),
        }
    }
    by_region.sort_by(|a, b| a.0.cmp(&b.0));

    let groups = by_region
        .into_iter()
        .map(|(region, mut values)| {
            values.sort_by(f64::total_cmp);
            RegionBox {
                n: values.len(),
                min: values[0],
                q1: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q3: quantile(&values, 0.75),
                max: values[values.len() - 1],
                region,
            }
        })
        .collect();

    RegionBoxSpec {
        title: format!("{} Distribution by Region ({})", sel.indicator.name, sel.year),
        groups,
    }
}

/// Linear-interpolation quantile over a sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{INDICATORS, Indicator};

    fn dataset() -> Dataset {
        // Three "economies" over three years, GDP per Capita only.
        let mut rows = Vec::new();
        let values = [
            ("AAA", "Alphaland", "R1", [10.0, 11.0, 12.0]),
            ("BBB", "Betaville", "R1", [30.0, 29.0, 28.0]),
            ("CCC", "Gammastan", "R2", [20.0, 21.0, 22.0]),
        ];
        for (economy, name, region, series) in values {
            for (offset, v) in series.into_iter().enumerate() {
                rows.push(CountryYear {
                    economy: economy.into(),
                    name: name.into(),
                    region_code: region.into(),
                    region: region.into(),
                    year: 2010 + offset as i32,
                    values: vec![Some(v)],
                    gdp_category: None,
                });
            }
        }
        Dataset {
            indicators: vec![INDICATORS[0]],
            rows,
            year_min: 2010,
            year_max: 2012,
        }
    }

    fn selection(year: i32, country: Option<&str>) -> Selection {
        Selection {
            indicator: INDICATORS[0],
            year,
            country: country.map(str::to_string),
        }
    }

    #[test]
    fn trend_with_country_covers_the_full_year_range() {
        let spec = time_trend(&dataset(), &selection(2011, Some("Betaville")));
        assert_eq!(spec.series.len(), 1);
        assert_eq!(spec.series[0].name, "Betaville");
        // Full series regardless of the selected year.
        assert_eq!(
            spec.series[0].points,
            vec![(2010, 30.0), (2011, 29.0), (2012, 28.0)]
        );
    }

    #[test]
    fn trend_keeps_every_economy_sharing_a_display_name() {
        let mut data = dataset();
        // A second economy with Betaville's display name, one year only.
        data.rows.push(CountryYear {
            economy: "BB2".into(),
            name: "Betaville".into(),
            region_code: "R2".into(),
            region: "R2".into(),
            year: 2010,
            values: vec![Some(99.0)],
            gdp_category: None,
        });

        let spec = time_trend(&data, &selection(2010, Some("Betaville")));
        assert_eq!(spec.series.len(), 2);
        assert!(spec.series.iter().all(|s| s.name == "Betaville"));
        assert!(spec
            .series
            .iter()
            .any(|s| s.points == vec![(2010, 30.0), (2011, 29.0), (2012, 28.0)]));
        assert!(spec.series.iter().any(|s| s.points == vec![(2010, 99.0)]));
    }

    #[test]
    fn trend_without_country_ranks_by_selected_year() {
        let spec = time_trend(&dataset(), &selection(2012, None));
        // All three fit within the top-10 cap; ordered by 2012 value.
        let names: Vec<&str> = spec.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Betaville", "Gammastan", "Alphaland"]);
    }

    #[test]
    fn top_bar_is_ascending_and_capped() {
        let spec = top_bar(&dataset(), &selection(2010, None), 2);
        let names: Vec<&str> = spec.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Gammastan", "Betaville"]);
        assert!(spec.entries[0].value <= spec.entries[1].value);
    }

    #[test]
    fn choropleth_sorts_values_first() {
        let spec = choropleth(&dataset(), &selection(2010, None));
        assert_eq!(spec.entries[0].name, "Betaville");
        assert_eq!(spec.entries.last().unwrap().name, "Alphaland");
    }

    #[test]
    fn country_filter_restricts_year_panels() {
        let spec = choropleth(&dataset(), &selection(2010, Some("Alphaland")));
        assert_eq!(spec.entries.len(), 1);
        assert_eq!(spec.entries[0].economy, "AAA");
    }

    #[test]
    fn region_box_groups_and_summarizes() {
        let spec = region_box(&dataset(), &selection(2010, None));
        assert_eq!(spec.groups.len(), 2);
        let r1 = &spec.groups[0];
        assert_eq!(r1.region, "R1");
        assert_eq!(r1.n, 2);
        assert_eq!(r1.min, 10.0);
        assert_eq!(r1.max, 30.0);
        assert_eq!(r1.median, 20.0);
    }

    #[test]
    fn out_of_range_year_yields_empty_specs() {
        let sel = selection(1999, None);
        assert!(choropleth(&dataset(), &sel).entries.is_empty());
        assert!(top_bar(&dataset(), &sel, 20).entries.is_empty());
        assert!(region_box(&dataset(), &sel).groups.is_empty());
    }

    #[test]
    fn quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.5), 2.5);
        assert_eq!(quantile(&values, 0.25), 1.75);
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 4.0);
    }

    #[test]
    fn bubble_requires_all_three_axes() {
        // Dataset lacks Population and Life Expectancy columns entirely.
        let spec = bubble(&dataset(), &selection(2010, None));
        assert!(spec.points.is_empty());

        // With all three indicators present the row qualifies.
        let full = Dataset {
            indicators: vec![INDICATORS[0], INDICATORS[1], INDICATORS[2]],
            rows: vec![CountryYear {
                economy: "AAA".into(),
                name: "Alphaland".into(),
                region_code: "R1".into(),
                region: "R1".into(),
                year: 2010,
                values: vec![Some(48000.0), Some(300e6), Some(78.5)],
                gdp_category: Some(IncomeCategory::High),
            }],
            year_min: 2010,
            year_max: 2010,
        };
        let spec = bubble(&full, &selection(2010, None));
        assert_eq!(spec.points.len(), 1);
        assert_eq!(spec.points[0].population, 300e6);
        assert_eq!(spec.points[0].life_expectancy, 78.5);
    }

    #[test]
    fn unknown_indicator_yields_null_map_values() {
        let other = Indicator {
            code: "SP.POP.TOTL",
            name: "Population",
        };
        let sel = Selection {
            indicator: other,
            year: 2010,
            country: None,
        };
        let spec = choropleth(&dataset(), &sel);
        assert!(spec.entries.iter().all(|e| e.value.is_none()));
    }
}
