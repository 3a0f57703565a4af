//! Export the enriched table to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts: one row per (economy, year) with metadata and the derived
//! income category alongside the indicator values.

use std::path::Path;

use crate::domain::Dataset;
use crate::error::AppError;

/// Write the enriched dataset to a CSV file.
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display()))
    })?;

    let mut header = vec![
        "economy".to_string(),
        "Country Name".to_string(),
        "Region Code".to_string(),
        "Region".to_string(),
        "Year".to_string(),
    ];
    header.extend(dataset.indicators.iter().map(|i| i.name.to_string()));
    header.push("GDP Category".to_string());
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export header: {e}")))?;

    for row in &dataset.rows {
        let mut record = vec![
            row.economy.clone(),
            row.name.clone(),
            row.region_code.clone(),
            row.region.clone(),
            row.year.to_string(),
        ];
        record.extend(
            row.values
                .iter()
                .map(|v| v.map(|v| format!("{v:.6}")).unwrap_or_default()),
        );
        record.push(
            row.gdp_category
                .map(|c| c.display_name().to_string())
                .unwrap_or_default(),
        );
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write export row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CountryYear, INDICATORS, IncomeCategory};

    #[test]
    fn export_quotes_names_with_commas() {
        let dataset = Dataset {
            indicators: vec![INDICATORS[0]],
            rows: vec![CountryYear {
                economy: "KOR".into(),
                name: "Korea, Rep.".into(),
                region_code: "EAS".into(),
                region: "East Asia & Pacific".into(),
                year: 2020,
                values: vec![Some(31721.3)],
                gdp_category: Some(IncomeCategory::High),
            }],
            year_min: 2020,
            year_max: 2020,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_dataset_csv(&path, &dataset).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "economy,Country Name,Region Code,Region,Year,GDP per Capita,GDP Category"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("\"Korea, Rep.\""));
        assert!(row.contains("High Income"));
    }
}
