use chrono::{NaiveDate, NaiveDateTime};
use polars::{
    frame::DataFrame,
    prelude::{
        DataType, Expr, IntoLazy, NamedFrom, Series, SortMultipleOptions, UniqueKeepStrategy, col,
        lit,
    },
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::{DataError, SentimentResult},
    polars_ext::{DataFrameExt, epoch_days, frame_error},
    schema::{SentimentCol, clean_columns, headline_columns},
    table::{CleanTable, RawTable},
};

/// Calendar date format of the raw input and of the CSV sink.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp layouts accepted in addition to [`DATE_FORMAT`]; only the date part is kept.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Row and null tallies collected while cleaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub input_rows: usize,
    /// Rows whose `Date` field was empty in the input.
    pub missing_dates: usize,
    /// Rows whose `Date` field was present but did not parse.
    pub unparseable_dates: usize,
    pub duplicates_removed: usize,
    pub null_dates_dropped: usize,
    pub headline_nulls_filled: usize,
    pub nulls_before: usize,
    pub nulls_after: usize,
    pub output_rows: usize,
}

/// Parses a raw date field, ignoring surrounding whitespace.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok().or_else(|| {
        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(|ts| ts.date())
    })
}

/// Coerces a raw label to an integer.
///
/// Accepts integer literals and integer-valued decimals (`"1"`, `"1.0"`).
pub fn coerce_label(value: &str) -> Option<i32> {
    let value = value.trim();
    if let Ok(label) = value.parse::<i32>() {
        return Some(label);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0)
        .filter(|v| *v >= f64::from(i32::MIN) && *v <= f64::from(i32::MAX))
        .map(|v| v as i32)
}

/// Cleans the raw table into the canonical [`CleanTable`].
#[tracing::instrument(skip_all, fields(rows = raw.height()))]
pub fn transform(raw: &RawTable) -> SentimentResult<(CleanTable, TransformReport)> {
    let mut report = TransformReport {
        input_rows: raw.height(),
        ..Default::default()
    };
    let mut df = raw.as_df().clone();

    info!("Step 1: parsing dates");
    parse_dates(&mut df, &mut report)?;
    normalize_values(&mut df)?;

    info!("Step 2: removing duplicate rows");
    let before = df.height();
    let mut df = df
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()
        .map_err(|e| frame_error("Failed to remove duplicate rows", e))?;
    report.duplicates_removed = before - df.height();
    report.nulls_before = total_nulls(&df);
    info!(removed = report.duplicates_removed, "Duplicates removed");

    info!("Step 3: dropping rows without a date");
    let before = df.height();
    df = df
        .lazy()
        .filter(col(SentimentCol::Date.name()).is_not_null())
        .collect()
        .map_err(|e| frame_error("Failed to drop rows without a date", e))?;
    report.null_dates_dropped = before - df.height();
    info!(dropped = report.null_dates_dropped, "Rows without a date dropped");

    info!("Step 4: filling missing headlines");
    report.headline_nulls_filled = headline_columns()
        .iter()
        .map(|name| df.column(name.as_str()).map(|c| c.null_count()).unwrap_or(0))
        .sum();
    df = df
        .lazy()
        .with_columns(
            headline_columns()
                .into_iter()
                .map(|name| col(name.clone()).fill_null(lit("")).alias(name))
                .collect::<Vec<_>>(),
        )
        .collect()
        .map_err(|e| frame_error("Failed to fill missing headlines", e))?;
    info!(filled = report.headline_nulls_filled, "Missing headlines filled");

    info!("Step 5: coercing labels to integers");
    coerce_labels(&mut df)?;
    report.nulls_after = total_nulls(&df);

    info!("Steps 6-8: sorting by date, deriving calendar features and headline counts");
    let date = || col(SentimentCol::Date.name());
    let df = df
        .lazy()
        .sort(
            [SentimentCol::Date.name()],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .with_columns([
            date().dt().year().cast(DataType::Int32).alias(SentimentCol::Year.name()),
            date().dt().month().cast(DataType::Int32).alias(SentimentCol::Month.name()),
            (date().dt().weekday().cast(DataType::Int32) - lit(1))
                .alias(SentimentCol::DayOfWeek.name()),
            date().dt().quarter().cast(DataType::Int32).alias(SentimentCol::Quarter.name()),
            news_count().alias(SentimentCol::NewsCount.name()),
        ])
        .select(clean_columns().into_iter().map(col).collect::<Vec<_>>())
        .collect()
        .map_err(|e| frame_error("Failed to derive features", e))?;

    report.output_rows = df.height();
    let clean = CleanTable::new(df)?;

    info!(
        input_rows = report.input_rows,
        output_rows = report.output_rows,
        nulls_before = report.nulls_before,
        nulls_after = report.nulls_after,
        "Transform completed"
    );

    Ok((clean, report))
}

/// Replaces the `Date` text column with a polars `Date` column.
fn parse_dates(df: &mut DataFrame, report: &mut TransformReport) -> SentimentResult<()> {
    let raw = df.str_values(SentimentCol::Date.as_str())?;

    let mut days = Vec::with_capacity(raw.len());
    for value in &raw {
        match value {
            None => {
                report.missing_dates += 1;
                days.push(None);
            }
            Some(text) => match parse_date(text) {
                Some(date) => days.push(Some(epoch_days(date))),
                None => {
                    debug!(value = %text, "Unparseable date");
                    report.unparseable_dates += 1;
                    days.push(None);
                }
            },
        }
    }

    let parsed = Series::new(SentimentCol::Date.name(), days)
        .cast(&DataType::Date)
        .map_err(|e| frame_error("Failed to build Date column", e))?;
    df.with_column(parsed)
        .map_err(|e| frame_error("Failed to replace Date column", e))?;

    info!(
        missing = report.missing_dates,
        unparseable = report.unparseable_dates,
        "Dates parsed"
    );
    Ok(())
}

/// Rewrites coercible labels to their integer text (`"1.0"` -> `"1"`) and empty headlines to null.
fn normalize_values(df: &mut DataFrame) -> SentimentResult<()> {
    let labels = df
        .str_values(SentimentCol::Label.as_str())?
        .into_iter()
        .map(|value| value.map(|text| coerce_label(&text).map_or(text, |v| v.to_string())))
        .collect::<Vec<_>>();
    df.with_column(Series::new(SentimentCol::Label.name(), labels))
        .map_err(|e| frame_error("Failed to normalize Label column", e))?;

    for name in headline_columns() {
        let headlines = df
            .str_values(name.as_str())?
            .into_iter()
            .map(|value| value.filter(|text| !text.is_empty()))
            .collect::<Vec<_>>();
        df.with_column(Series::new(name, headlines))
            .map_err(|e| frame_error("Failed to normalize headline column", e))?;
    }
    Ok(())
}

/// Replaces the `Label` text column with an `Int32` column, failing on the first bad value.
fn coerce_labels(df: &mut DataFrame) -> SentimentResult<()> {
    let labels = df.str_values(SentimentCol::Label.as_str())?;
    let dates = df.date_values(SentimentCol::Date.as_str())?;

    let describe = |date: Option<NaiveDate>| {
        date.map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "<none>".to_string())
    };

    let coerced = labels
        .iter()
        .zip(dates)
        .map(|(value, date)| match value.as_deref().map(str::trim) {
            None | Some("") => Err(DataError::MissingLabel {
                date: describe(date),
            }),
            Some(text) => coerce_label(text).ok_or_else(|| DataError::LabelCoercion {
                date: describe(date),
                value: text.to_string(),
            }),
        })
        .collect::<Result<Vec<i32>, DataError>>()?;

    df.with_column(Series::new(SentimentCol::Label.name(), coerced))
        .map_err(|e| frame_error("Failed to replace Label column", e))?;
    Ok(())
}

/// Number of headline slots holding a non-empty string.
fn news_count() -> Expr {
    headline_columns()
        .into_iter()
        .map(|name| col(name).neq(lit("")).cast(DataType::Int32))
        .fold(lit(0i32), |acc, slot| acc + slot)
        .cast(DataType::Int32)
}

fn total_nulls(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|c| c.null_count()).sum()
}
