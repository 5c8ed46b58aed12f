use chrono::{Datelike, NaiveDate};
use polars::prelude::{DataFrame, DataType, Expr, PolarsError, lit, when};

use crate::error::{DataError, SentimentError, SentimentResult};

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub(crate) fn frame_error(context: &str, e: PolarsError) -> SentimentError {
    SentimentError::Data(DataError::DataFrame(format!("{context}: {e}")))
}

/// Converts a polars `Date` physical value (days since the Unix epoch).
pub(crate) fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

/// Converts a date to the polars `Date` physical value.
pub(crate) fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub trait ExprExt {
    /// Safely divides two expressions, protecting against division-by-zero.
    ///
    /// If the denominator is zero, returns `fallback` (default: `0.0`).
    fn safe_div(self, other: Expr, fallback: Option<f64>) -> Expr;
}

impl ExprExt for Expr {
    fn safe_div(self, other: Expr, fallback: Option<f64>) -> Expr {
        let fallback_val = fallback.unwrap_or(0.0);
        when(other.clone().eq(lit(0.0)))
            .then(lit(fallback_val))
            .otherwise(self.cast(DataType::Float64) / other.cast(DataType::Float64))
    }
}

/// Typed, owned views over single columns.
///
/// Numeric accessors cast first, so callers do not depend on the exact
/// integer width polars picks for temporal parts or counts.
pub trait DataFrameExt {
    fn int_values(&self, name: &str) -> SentimentResult<Vec<Option<i64>>>;

    fn float_values(&self, name: &str) -> SentimentResult<Vec<Option<f64>>>;

    fn str_values(&self, name: &str) -> SentimentResult<Vec<Option<String>>>;

    fn date_values(&self, name: &str) -> SentimentResult<Vec<Option<NaiveDate>>>;
}

impl DataFrameExt for DataFrame {
    fn int_values(&self, name: &str) -> SentimentResult<Vec<Option<i64>>> {
        let column = self
            .column(name)
            .and_then(|c| c.cast(&DataType::Int64))
            .map_err(|e| frame_error(&format!("Failed to read '{name}' as integers"), e))?;
        let ca = column
            .i64()
            .map_err(|e| frame_error(&format!("Failed to read '{name}' as integers"), e))?;
        Ok(ca.into_iter().collect())
    }

    fn float_values(&self, name: &str) -> SentimentResult<Vec<Option<f64>>> {
        let column = self
            .column(name)
            .and_then(|c| c.cast(&DataType::Float64))
            .map_err(|e| frame_error(&format!("Failed to read '{name}' as floats"), e))?;
        let ca = column
            .f64()
            .map_err(|e| frame_error(&format!("Failed to read '{name}' as floats"), e))?;
        Ok(ca.into_iter().collect())
    }

    fn str_values(&self, name: &str) -> SentimentResult<Vec<Option<String>>> {
        let ca = self
            .column(name)
            .and_then(|c| c.str())
            .map_err(|e| frame_error(&format!("Failed to read '{name}' as strings"), e))?;
        Ok(ca.into_iter().map(|v| v.map(str::to_owned)).collect())
    }

    fn date_values(&self, name: &str) -> SentimentResult<Vec<Option<NaiveDate>>> {
        let ca = self
            .column(name)
            .and_then(|c| c.date())
            .map_err(|e| frame_error(&format!("Failed to read '{name}' as dates"), e))?;
        Ok(ca
            .physical()
            .into_iter()
            .map(|days| days.and_then(date_from_epoch_days))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use polars::{
        df,
        prelude::{IntoLazy, col},
    };

    use super::*;

    #[test]
    fn test_date_from_epoch_days() {
        assert_eq!(
            date_from_epoch_days(0),
            NaiveDate::from_ymd_opt(1970, 1, 1)
        );
        assert_eq!(
            date_from_epoch_days(18_262),
            NaiveDate::from_ymd_opt(2020, 1, 1)
        );
    }

    #[test]
    fn test_epoch_days_round_trip() {
        let date = NaiveDate::from_ymd_opt(2016, 7, 1).expect("valid date");
        assert_eq!(date_from_epoch_days(epoch_days(date)), Some(date));
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 2).expect("valid date")), 1);
    }

    #[test]
    fn test_safe_div_falls_back_on_zero() {
        let df = df![
            "num" => &[1, 3],
            "den" => &[0, 4],
        ]
        .expect("Failed to create mock DF");

        let out = df
            .lazy()
            .select([col("num").safe_div(col("den"), None).alias("ratio")])
            .collect()
            .expect("Failed to evaluate ratio");

        assert_eq!(
            out.float_values("ratio").expect("Failed to read ratio"),
            vec![Some(0.0), Some(0.75)]
        );
    }

    #[test]
    fn test_typed_accessors() {
        let df = df![
            "n" => &[Some(1i32), None],
            "s" => &[Some("a"), None],
        ]
        .expect("Failed to create mock DF");

        assert_eq!(df.int_values("n").expect("ints"), vec![Some(1), None]);
        assert_eq!(
            df.str_values("s").expect("strings"),
            vec![Some("a".to_string()), None]
        );
        assert!(df.int_values("missing").is_err());
    }
}
