use chrono::NaiveDate;
use itertools::Itertools;
use polars::{
    frame::DataFrame,
    prelude::{IntoLazy, SchemaRef, col},
    series::IsSorted,
};

use crate::{
    error::{DataError, InputError, SentimentError, SentimentResult},
    polars_ext::{DataFrameExt, frame_error},
    schema::{SentimentCol, clean_columns, clean_schema, headline_columns, raw_columns},
};

// ================================================================================================
// Raw Table
// ================================================================================================

/// The input dataset as read from disk: every required column, all typed as `String`.
#[derive(Debug, Clone)]
pub struct RawTable {
    df: DataFrame,
}

impl RawTable {
    /// Wraps `df`, keeping the required columns in canonical order.
    ///
    /// Unknown columns are dropped; a missing required column is an input error.
    pub(crate) fn new(df: DataFrame) -> SentimentResult<Self> {
        let present = df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>();

        let required = raw_columns();
        if let Some(missing) = required.iter().find(|name| !present.iter().any(|p| p == name.as_str())) {
            return Err(InputError::MissingColumn(missing.to_string()).into());
        }

        let extra = present
            .iter()
            .filter(|p| !required.iter().any(|r| r.as_str() == p.as_str()))
            .collect::<Vec<_>>();
        if !extra.is_empty() {
            tracing::warn!(columns = %extra.iter().join(", "), "Ignoring unknown input columns");
        }

        let df = df
            .select(required)
            .map_err(|e| frame_error("Failed to select raw columns", e))?;

        Ok(Self { df })
    }

    pub fn as_df(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }
}

// ================================================================================================
// Clean Table
// ================================================================================================

/// The canonical cleaned dataset.
///
/// Holds exactly the columns of [`clean_schema`], in that order, sorted by `Date`.
/// The table is never mutated after construction.
#[derive(Debug, Clone)]
pub struct CleanTable {
    df: DataFrame,
}

impl CleanTable {
    pub(crate) fn new(df: DataFrame) -> SentimentResult<Self> {
        let df = df
            .lazy()
            .select(clean_columns().into_iter().map(col).collect::<Vec<_>>())
            .collect()
            .map_err(|e| frame_error("Failed to project clean columns", e))?;

        let schema = Self::to_schema();
        let current = df.schema();
        for (name, expected) in schema.iter() {
            match current.get(name) {
                Some(actual) if actual == expected => {}
                Some(actual) => {
                    return Err(DataError::Schema(format!(
                        "column '{name}' has type {actual:?}, expected {expected:?}"
                    ))
                    .into());
                }
                None => {
                    return Err(DataError::Schema(format!("missing column '{name}'")).into());
                }
            }
        }

        let date = df
            .column(SentimentCol::Date.as_str())
            .map_err(|e| frame_error("Failed to access Date", e))?;
        if date.null_count() > 0 {
            return Err(DataError::Schema("Date contains nulls".to_string()).into());
        }
        let sorted = date.is_sorted_flag() == IsSorted::Ascending
            || df
                .date_values(SentimentCol::Date.as_str())?
                .iter()
                .tuple_windows()
                .all(|(a, b)| a <= b);
        if !sorted {
            return Err(DataError::Schema("clean table must be sorted by Date".to_string()).into());
        }

        Ok(Self { df })
    }

    pub fn to_schema() -> SchemaRef {
        clean_schema()
    }

    pub fn as_df(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    /// Materializes the table as typed rows, in table order.
    pub fn records(&self) -> SentimentResult<Vec<CleanRecord>> {
        let dates = self.df.date_values(SentimentCol::Date.as_str())?;
        let labels = self.df.int_values(SentimentCol::Label.as_str())?;
        let years = self.df.int_values(SentimentCol::Year.as_str())?;
        let months = self.df.int_values(SentimentCol::Month.as_str())?;
        let weekdays = self.df.int_values(SentimentCol::DayOfWeek.as_str())?;
        let quarters = self.df.int_values(SentimentCol::Quarter.as_str())?;
        let counts = self.df.int_values(SentimentCol::NewsCount.as_str())?;
        let headlines = headline_columns()
            .iter()
            .map(|name| self.df.str_values(name.as_str()))
            .collect::<SentimentResult<Vec<_>>>()?;

        let mut records = Vec::with_capacity(self.height());
        for row in 0..self.height() {
            let missing = |column: SentimentCol| {
                DataError::Schema(format!("null '{column}' at row {row}"))
            };
            records.push(CleanRecord {
                date: dates[row].ok_or_else(|| missing(SentimentCol::Date))?,
                label: narrow(labels[row]).ok_or_else(|| missing(SentimentCol::Label))?,
                headlines: headlines
                    .iter()
                    .map(|col| col[row].clone().unwrap_or_default())
                    .collect(),
                year: narrow(years[row]).ok_or_else(|| missing(SentimentCol::Year))?,
                month: narrow(months[row]).ok_or_else(|| missing(SentimentCol::Month))?,
                day_of_week: narrow(weekdays[row]).ok_or_else(|| missing(SentimentCol::DayOfWeek))?,
                quarter: narrow(quarters[row]).ok_or_else(|| missing(SentimentCol::Quarter))?,
                news_count: narrow(counts[row]).ok_or_else(|| missing(SentimentCol::NewsCount))?,
            });
        }

        Ok(records)
    }
}

/// Validates a frame read back from a sink, e.g. the Parquet file.
impl TryFrom<DataFrame> for CleanTable {
    type Error = SentimentError;

    fn try_from(df: DataFrame) -> Result<Self, Self::Error> {
        Self::new(df)
    }
}

fn narrow(value: Option<i64>) -> Option<i32> {
    value.and_then(|v| i32::try_from(v).ok())
}

/// One row of the clean table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanRecord {
    pub date: NaiveDate,
    pub label: i32,
    /// `Top1`..`Top25`, empty string for a missing headline.
    pub headlines: Vec<String>,
    pub year: i32,
    pub month: i32,
    pub day_of_week: i32,
    pub quarter: i32,
    pub news_count: i32,
}

impl CleanRecord {
    /// Number of non-empty headline slots.
    pub fn non_empty_headlines(&self) -> usize {
        self.headlines.iter().filter(|h| !h.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use polars::{df, prelude::Column};

    use super::*;
    use crate::schema::HEADLINE_SLOTS;

    fn raw_frame() -> DataFrame {
        let mut columns = vec![
            Column::new("Date".into(), &["2020-01-01"]),
            Column::new("Label".into(), &["1"]),
            Column::new("Extra".into(), &["x"]),
        ];
        for name in headline_columns() {
            columns.push(Column::new(name, &[""]));
        }
        DataFrame::new(columns).expect("Failed to create raw DF")
    }

    #[test]
    fn test_raw_table_drops_unknown_columns() {
        let raw = RawTable::new(raw_frame()).expect("Failed to wrap raw frame");
        assert_eq!(raw.width(), 2 + HEADLINE_SLOTS as usize);
        assert!(raw.as_df().column("Extra").is_err());
    }

    #[test]
    fn test_raw_table_requires_columns() {
        let df = df![
            "Date" => &["2020-01-01"],
            "Label" => &["1"],
        ]
        .expect("Failed to create DF");

        let err = RawTable::new(df).expect_err("Top columns are required");
        assert!(err.to_string().contains("Top1"), "unexpected error: {err}");
    }
}
