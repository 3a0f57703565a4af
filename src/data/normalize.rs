//! Table reshaping: wide indicator responses to long rows, and the
//! outer-join merge of multiple indicators.
//!
//! The raw shape mirrors what the statistical API gives us per indicator:
//! one row per economy, one `YR{year}` column per year. The schema travels
//! with the table, so nothing here sniffs column names at runtime to decide
//! what is an identifier and what is a year.

use std::collections::BTreeMap;

use crate::domain::{Indicator, ObsKey, ObservationTable};
use crate::error::AppError;

/// Prefix carried by year columns in the wide response shape.
pub const YEAR_PREFIX: &str = "YR";

/// Name of the required economy identifier column.
pub const ECONOMY_COLUMN: &str = "economy";

/// Column split for a wide indicator table: which columns identify the row
/// and which hold time-indexed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub id_columns: Vec<String>,
    /// `YR`-prefixed year labels, e.g. `YR2010`.
    pub year_columns: Vec<String>,
}

impl TableSchema {
    /// Standard schema for a year range: a single `economy` identifier plus
    /// one `YR{year}` column per year in `[start_year, end_year]`.
    pub fn for_years(start_year: i32, end_year: i32) -> Self {
        Self {
            id_columns: vec![ECONOMY_COLUMN.to_string()],
            year_columns: (start_year..=end_year)
                .map(|y| format!("{YEAR_PREFIX}{y}"))
                .collect(),
        }
    }
}

/// One wide row: identifier cells aligned with `TableSchema::id_columns`,
/// values aligned with `TableSchema::year_columns`.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub ids: Vec<String>,
    pub values: Vec<Option<f64>>,
}

/// A single indicator's response in wide shape.
#[derive(Debug, Clone)]
pub struct RawIndicatorTable {
    pub schema: TableSchema,
    pub rows: Vec<RawRow>,
}

/// One unpivoted observation.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub economy: String,
    pub year: i32,
    pub value: Option<f64>,
}

/// Unpivot a wide indicator table into long `(economy, year, value)` rows.
///
/// Fails with a schema error when the `economy` identifier column is absent
/// or when the schema names no year columns (input already long, or not a
/// time series at all). The caller treats either as a per-indicator skip.
pub fn normalize(raw: &RawIndicatorTable) -> Result<Vec<LongRow>, AppError> {
    if raw.schema.year_columns.is_empty() {
        return Err(AppError::new(
            4,
            "Indicator response has no year columns to unpivot.",
        ));
    }

    let economy_idx = raw
        .schema
        .id_columns
        .iter()
        .position(|c| c == ECONOMY_COLUMN)
        .ok_or_else(|| {
            AppError::new(4, "Indicator response is missing the 'economy' column.")
        })?;

    let mut years = Vec::with_capacity(raw.schema.year_columns.len());
    for label in &raw.schema.year_columns {
        let stripped = label.strip_prefix(YEAR_PREFIX).unwrap_or(label);
        let year: i32 = stripped.parse().map_err(|_| {
            AppError::new(4, format!("Year column '{label}' is not a year."))
        })?;
        years.push(year);
    }

    let mut out = Vec::with_capacity(raw.rows.len() * years.len());
    for row in &raw.rows {
        let economy = row.ids.get(economy_idx).ok_or_else(|| {
            AppError::new(4, "Indicator row is missing the 'economy' column.")
        })?;
        for (col, &year) in years.iter().enumerate() {
            out.push(LongRow {
                economy: economy.clone(),
                year,
                value: row.values.get(col).copied().flatten(),
            });
        }
    }

    Ok(out)
}

/// Outer-join N long indicator tables into one table keyed by
/// (economy, year).
///
/// Every key seen in any input survives; values absent from a given
/// indicator stay null for that row.
pub fn merge(tables: Vec<(Indicator, Vec<LongRow>)>) -> ObservationTable {
    let indicators: Vec<Indicator> = tables.iter().map(|(i, _)| *i).collect();
    let width = indicators.len();

    let mut rows: BTreeMap<ObsKey, Vec<Option<f64>>> = BTreeMap::new();
    for (col, (_, long)) in tables.iter().enumerate() {
        for r in long {
            let slot = rows
                .entry((r.economy.clone(), r.year))
                .or_insert_with(|| vec![None; width]);
            if r.value.is_some() {
                slot[col] = r.value;
            }
        }
    }

    ObservationTable { indicators, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::INDICATORS;

    fn wide(rows: Vec<(&str, Vec<Option<f64>>)>, start: i32, end: i32) -> RawIndicatorTable {
        RawIndicatorTable {
            schema: TableSchema::for_years(start, end),
            rows: rows
                .into_iter()
                .map(|(economy, values)| RawRow {
                    ids: vec![economy.to_string()],
                    values,
                })
                .collect(),
        }
    }

    #[test]
    fn normalize_strips_prefix_and_unpivots() {
        let raw = wide(
            vec![
                ("USA", vec![Some(1.0), None, Some(3.0)]),
                ("FRA", vec![Some(4.0), Some(5.0), None]),
            ],
            2010,
            2012,
        );

        let long = normalize(&raw).unwrap();
        assert_eq!(long.len(), 6);
        assert!(long.iter().all(|r| (2010..=2012).contains(&r.year)));
        assert_eq!(
            long[0],
            LongRow {
                economy: "USA".into(),
                year: 2010,
                value: Some(1.0)
            }
        );
        assert_eq!(long[1].value, None);
    }

    #[test]
    fn normalize_without_year_columns_is_a_deterministic_error() {
        let raw = RawIndicatorTable {
            schema: TableSchema {
                id_columns: vec![ECONOMY_COLUMN.to_string()],
                year_columns: vec![],
            },
            rows: vec![],
        };
        assert!(normalize(&raw).is_err());
        // Same input, same outcome.
        assert!(normalize(&raw).is_err());
    }

    #[test]
    fn normalize_requires_economy_column() {
        let raw = RawIndicatorTable {
            schema: TableSchema {
                id_columns: vec!["label".to_string()],
                year_columns: vec!["YR2010".to_string()],
            },
            rows: vec![RawRow {
                ids: vec!["United States".to_string()],
                values: vec![Some(1.0)],
            }],
        };
        assert!(normalize(&raw).is_err());
    }

    #[test]
    fn normalize_rejects_rows_shorter_than_the_schema() {
        let raw = RawIndicatorTable {
            schema: TableSchema {
                id_columns: vec!["label".to_string(), ECONOMY_COLUMN.to_string()],
                year_columns: vec!["YR2010".to_string()],
            },
            // The row carries the label cell but not the economy cell.
            rows: vec![RawRow {
                ids: vec!["United States".to_string()],
                values: vec![Some(1.0)],
            }],
        };
        assert!(normalize(&raw).is_err());
    }

    #[test]
    fn merge_preserves_every_key_from_every_input() {
        let a = vec![
            LongRow { economy: "USA".into(), year: 2010, value: Some(1.0) },
            LongRow { economy: "USA".into(), year: 2011, value: Some(2.0) },
        ];
        let b = vec![
            LongRow { economy: "FRA".into(), year: 2010, value: Some(3.0) },
            LongRow { economy: "USA".into(), year: 2010, value: Some(4.0) },
        ];
        let c = vec![LongRow { economy: "DEU".into(), year: 2012, value: None }];

        let table = merge(vec![
            (INDICATORS[0], a),
            (INDICATORS[1], b),
            (INDICATORS[2], c),
        ]);

        assert_eq!(table.len(), 4);
        assert_eq!(
            table.rows.get(&("USA".into(), 2010)),
            Some(&vec![Some(1.0), Some(4.0), None])
        );
        // Key only present in one input survives with nulls elsewhere.
        assert_eq!(
            table.rows.get(&("FRA".into(), 2010)),
            Some(&vec![None, Some(3.0), None])
        );
        assert!(table.rows.contains_key(&("DEU".into(), 2012)));
    }
}
