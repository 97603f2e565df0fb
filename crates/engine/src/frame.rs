//! In-memory tabular data source.
//!
//! A [`DataFrame`] is a set of equal-length named columns loaded once and
//! never mutated by the engine. All subsetting is done by value filters on
//! the display form of a column (group level, stratum level), which is how
//! every cell recipe addresses its data.

use std::collections::{BTreeSet, HashSet};

use crate::error::EngineError;

/// A single observed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Number(f64),
    Text(String),
    Missing,
}

impl Datum {
    pub fn is_missing(&self) -> bool {
        matches!(self, Datum::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Datum::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Display form, used for level labels and equality filters.
    pub fn display(&self) -> String {
        match self {
            Datum::Missing => String::new(),
            Datum::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            Datum::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub data: Vec<Datum>,
}

impl Column {
    pub fn new(name: impl Into<String>, data: Vec<Datum>) -> Self {
        Self { name: name.into(), data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.data.iter().filter(|d| d.is_missing()).count()
    }

    /// True when every non-missing value is numeric.
    pub fn is_numeric(&self) -> bool {
        self.data
            .iter()
            .filter(|d| !d.is_missing())
            .all(|d| matches!(d, Datum::Number(_)))
    }

    /// Number of distinct non-missing values (by display form).
    pub fn distinct_non_missing(&self) -> usize {
        let mut seen = HashSet::new();
        for d in &self.data {
            if !d.is_missing() {
                seen.insert(d.display());
            }
        }
        seen.len()
    }

    /// Sorted distinct non-missing display values.
    pub fn levels(&self) -> Vec<String> {
        let mut set = BTreeSet::new();
        for d in &self.data {
            if !d.is_missing() {
                set.insert(d.display());
            }
        }
        set.into_iter().collect()
    }

    /// Non-missing numeric values, in row order.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.data.iter().filter_map(|d| d.as_number()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct DataFrame {
    columns: Vec<Column>,
    n_rows: usize,
}

impl DataFrame {
    pub fn new(columns: Vec<Column>) -> Result<Self, EngineError> {
        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != n_rows) {
            return Err(EngineError::Configuration(format!(
                "column '{}' has {} rows, expected {}",
                bad.name,
                bad.len(),
                n_rows
            )));
        }
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.name.clone()) {
                return Err(EngineError::Configuration(format!(
                    "duplicate column name '{}'",
                    c.name
                )));
            }
        }
        Ok(Self { columns, n_rows })
    }

    /// Parse CSV text with a header row. Cells that parse as f64 become
    /// numbers, empty cells and the literal `NA` become missing, everything
    /// else is text.
    pub fn from_csv(data: &str) -> Result<Self, EngineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| EngineError::Configuration(format!("csv header: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() {
            return Err(EngineError::Configuration("csv has no header row".into()));
        }

        let mut columns: Vec<Vec<Datum>> = vec![Vec::new(); headers.len()];
        for (i, record) in reader.records().enumerate() {
            let record =
                record.map_err(|e| EngineError::Configuration(format!("csv row {}: {e}", i + 1)))?;
            for (j, _) in headers.iter().enumerate() {
                let raw = record.get(j).unwrap_or("").trim();
                columns[j].push(parse_datum(raw));
            }
        }

        Self::new(
            headers
                .into_iter()
                .zip(columns)
                .map(|(name, data)| Column::new(name, data))
                .collect(),
        )
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Sorted distinct non-missing levels of a column; empty when absent.
    pub fn levels(&self, name: &str) -> Vec<String> {
        self.column(name).map(|c| c.levels()).unwrap_or_default()
    }

    /// Values of `var` on rows where every filter column's display form
    /// equals its filter value. Unknown columns match nothing.
    pub fn values_where(&self, var: &str, filters: &[(String, String)]) -> Vec<Datum> {
        let Some(target) = self.column(var) else {
            return Vec::new();
        };
        let filter_cols: Vec<(&Column, &str)> = match filters
            .iter()
            .map(|(name, value)| self.column(name).map(|c| (c, value.as_str())))
            .collect::<Option<Vec<_>>>()
        {
            Some(cols) => cols,
            None => return Vec::new(),
        };

        (0..self.n_rows)
            .filter(|&row| {
                filter_cols
                    .iter()
                    .all(|(col, value)| col.data[row].display() == *value)
            })
            .map(|row| target.data[row].clone())
            .collect()
    }
}

fn parse_datum(raw: &str) -> Datum {
    if raw.is_empty() || raw == "NA" {
        return Datum::Missing;
    }
    match raw.parse::<f64>() {
        Ok(n) => Datum::Number(n),
        Err(_) => Datum::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
age,sex,treatment
40,M,A
50,F,A
NA,F,B
70,M,B
";

    #[test]
    fn from_csv_types_cells() {
        let frame = DataFrame::from_csv(CSV).unwrap();
        assert_eq!(frame.n_rows(), 4);
        let age = frame.column("age").unwrap();
        assert_eq!(age.data[0], Datum::Number(40.0));
        assert_eq!(age.data[2], Datum::Missing);
        assert_eq!(age.missing_count(), 1);
        assert!(age.is_numeric());
        assert!(!frame.column("sex").unwrap().is_numeric());
    }

    #[test]
    fn levels_are_sorted_distinct() {
        let frame = DataFrame::from_csv(CSV).unwrap();
        assert_eq!(frame.levels("sex"), vec!["F", "M"]);
        assert_eq!(frame.levels("treatment"), vec!["A", "B"]);
        assert_eq!(frame.levels("nope"), Vec::<String>::new());
    }

    #[test]
    fn values_where_filters_rows() {
        let frame = DataFrame::from_csv(CSV).unwrap();
        let ages = frame.values_where("age", &[("treatment".into(), "A".into())]);
        assert_eq!(ages, vec![Datum::Number(40.0), Datum::Number(50.0)]);

        let ages = frame.values_where(
            "age",
            &[("treatment".into(), "B".into()), ("sex".into(), "M".into())],
        );
        assert_eq!(ages, vec![Datum::Number(70.0)]);
    }

    #[test]
    fn values_where_unknown_column_matches_nothing() {
        let frame = DataFrame::from_csv(CSV).unwrap();
        assert!(frame.values_where("age", &[("site".into(), "X".into())]).is_empty());
        assert!(frame.values_where("site", &[]).is_empty());
    }

    #[test]
    fn numeric_display_drops_trailing_zero() {
        assert_eq!(Datum::Number(3.0).display(), "3");
        assert_eq!(Datum::Number(3.5).display(), "3.5");
        assert_eq!(Datum::Missing.display(), "");
    }

    #[test]
    fn ragged_columns_rejected() {
        let err = DataFrame::new(vec![
            Column::new("a", vec![Datum::Number(1.0)]),
            Column::new("b", vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = DataFrame::new(vec![
            Column::new("a", vec![]),
            Column::new("a", vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
