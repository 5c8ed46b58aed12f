use std::fmt;

use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    error::{DataError, SentimentResult},
    polars_ext::DataFrameExt,
    schema::SentimentCol,
    table::CleanTable,
};

/// Digest of the clean table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSummary {
    pub rows: usize,
    pub columns: usize,
    pub date_range: Option<DateRange>,
    /// `(label, count)` pairs ordered by label.
    pub label_distribution: Vec<(i32, usize)>,
    /// Per-column dtype and null count, in canonical column order.
    pub column_info: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Calendar days between `start` and `end`.
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
}

impl DataSummary {
    pub fn from_table(table: &CleanTable) -> SentimentResult<Self> {
        let df = table.as_df();

        let dates = df
            .date_values(SentimentCol::Date.as_str())?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        let date_range = dates.iter().minmax().into_option().map(|(start, end)| DateRange {
            start: *start,
            end: *end,
            days: (*end - *start).num_days(),
        });

        let labels = df.int_values(SentimentCol::Label.as_str())?;
        let label_distribution = labels
            .into_iter()
            .map(|label| {
                label
                    .and_then(|v| i32::try_from(v).ok())
                    .ok_or_else(|| DataError::Schema("Label must be a non-null i32".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .counts()
            .into_iter()
            .sorted()
            .collect();

        let column_info = df
            .get_columns()
            .iter()
            .map(|c| ColumnSummary {
                name: c.name().to_string(),
                dtype: c.dtype().to_string(),
                null_count: c.null_count(),
            })
            .collect();

        Ok(Self {
            rows: df.height(),
            columns: df.width(),
            date_range,
            label_distribution,
            column_info,
        })
    }
}

impl fmt::Display for DataSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows: {}", self.rows)?;
        writeln!(f, "Columns: {}", self.columns)?;
        match &self.date_range {
            Some(range) => writeln!(
                f,
                "Date range: {} to {} ({} days)",
                range.start, range.end, range.days
            )?,
            None => writeln!(f, "Date range: n/a")?,
        }
        writeln!(f, "Label distribution:")?;
        for (label, count) in &self.label_distribution {
            writeln!(f, "  {label}: {count}")?;
        }
        let with_nulls = self
            .column_info
            .iter()
            .filter(|c| c.null_count > 0)
            .map(|c| format!("{} ({})", c.name, c.null_count))
            .join(", ");
        if with_nulls.is_empty() {
            write!(f, "Null values: none")
        } else {
            write!(f, "Null values: {with_nulls}")
        }
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::{Column, DataFrame, DataType};

    use super::*;
    use crate::{polars_ext::epoch_days, schema::headline_columns};

    fn clean_table(rows: &[(&str, i32)]) -> CleanTable {
        let dates = rows
            .iter()
            .map(|(d, _)| {
                epoch_days(NaiveDate::parse_from_str(d, "%Y-%m-%d").expect("valid date"))
            })
            .collect::<Vec<_>>();
        let n = rows.len();

        let mut columns = vec![
            Column::new("Date".into(), dates)
                .cast(&DataType::Date)
                .expect("cast to Date"),
            Column::new("Label".into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
        ];
        for name in headline_columns() {
            columns.push(Column::new(name, vec![""; n]));
        }
        for name in ["Year", "Month", "DayOfWeek", "Quarter", "News_Count"] {
            columns.push(Column::new(name.into(), vec![0i32; n]));
        }
        CleanTable::new(DataFrame::new(columns).expect("Failed to create DF"))
            .expect("Failed to wrap clean DF")
    }

    #[test]
    fn test_summary_counts_and_range() {
        let table = clean_table(&[("2008-08-08", 0), ("2008-08-11", 1), ("2016-07-01", 1)]);

        let summary = DataSummary::from_table(&table).expect("summary failed");

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.columns, 32);
        assert_eq!(summary.label_distribution, vec![(0, 1), (1, 2)]);
        let range = summary.date_range.expect("range");
        assert_eq!(range.start.to_string(), "2008-08-08");
        assert_eq!(range.end.to_string(), "2016-07-01");
        assert_eq!(range.days, 2884);
        assert_eq!(summary.column_info[0].name, "Date");
        assert_eq!(summary.column_info[0].dtype, "date");
        assert!(summary.column_info.iter().all(|c| c.null_count == 0));
    }

    #[test]
    fn test_summary_of_empty_table() {
        let summary = DataSummary::from_table(&clean_table(&[])).expect("summary failed");
        assert_eq!(summary.rows, 0);
        assert!(summary.date_range.is_none());
        assert!(summary.label_distribution.is_empty());
    }
}
