//! Formatted terminal output for the non-TUI commands.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use std::path::Path;

use crate::charts::BarSpec;
use crate::domain::Dataset;

/// Format the startup summary (dataset stats + provenance).
pub fn format_summary(dataset: &Dataset, from_cache: bool, cache_path: &Path) -> String {
    let mut out = String::new();

    out.push_str("=== wbd - World Bank Dashboard ===\n");
    if from_cache {
        out.push_str(&format!("Source: cache ({})\n", cache_path.display()));
    } else {
        out.push_str(&format!(
            "Source: World Bank API (cached to {})\n",
            cache_path.display()
        ));
    }
    out.push_str(&format!(
        "Observations: {} country-year rows\n",
        dataset.rows.len()
    ));
    out.push_str(&format!("Years: {}-{}\n", dataset.year_min, dataset.year_max));
    out.push_str(&format!("Indicators: {}\n", dataset.indicators.len()));
    out.push_str(&format!("Regions: {}\n", dataset.region_count()));

    out
}

/// Format the top-N ranking table.
pub fn format_top_table(spec: &BarSpec) -> String {
    let mut out = String::new();

    out.push_str(&spec.title);
    out.push('\n');

    if spec.entries.is_empty() {
        out.push_str("(no data for this selection)\n");
        return out;
    }

    out.push_str(&format!(
        "{:>4}  {:<32} {:<28} {:>14}\n",
        "#", "Country", "Region", "Value"
    ));

    // Entries arrive ascending; print the biggest first.
    for (rank, entry) in spec.entries.iter().rev().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:<32} {:<28} {:>14}\n",
            rank + 1,
            truncate(&entry.name, 32),
            truncate(&entry.region, 28),
            fmt_compact(entry.value),
        ));
    }

    out
}

/// Compact human scale for mixed-magnitude indicator values
/// (populations in billions next to growth rates in percent).
pub fn fmt_compact(v: f64) -> String {
    let magnitude = v.abs();
    if magnitude >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if magnitude >= 1e6 {
        format!("{:.2}M", v / 1e6)
    } else if magnitude >= 1e4 {
        format!("{:.1}k", v / 1e3)
    } else {
        format!("{v:.1}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::BarEntry;

    #[test]
    fn compact_scale() {
        assert_eq!(fmt_compact(1_420_000_000.0), "1.42B");
        assert_eq!(fmt_compact(67_500_000.0), "67.50M");
        assert_eq!(fmt_compact(48_000.0), "48.0k");
        assert_eq!(fmt_compact(72.35), "72.3");
        assert_eq!(fmt_compact(-2.5), "-2.5");
    }

    #[test]
    fn top_table_prints_biggest_first() {
        let spec = BarSpec {
            title: "Top 2 Countries: GDP per Capita (2020)".into(),
            entries: vec![
                BarEntry {
                    name: "Betaville".into(),
                    region: "R1".into(),
                    value: 100.0,
                },
                BarEntry {
                    name: "Alphaland".into(),
                    region: "R1".into(),
                    value: 200.0,
                },
            ],
        };
        let text = format_top_table(&spec);
        let alpha = text.find("Alphaland").unwrap();
        let beta = text.find("Betaville").unwrap();
        assert!(alpha < beta);
    }
}
