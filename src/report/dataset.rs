use std::path::Path;

use chrono::{Datelike, NaiveDate};
use polars::{
    frame::DataFrame,
    prelude::{DataType, IntoLazy, StrptimeOptions, col},
};
use tracing::{debug, info};

use crate::{
    error::{DataError, InputError, ReportError, SentimentResult},
    etl::{extract::read_csv_strings, transform::DATE_FORMAT},
    polars_ext::{DataFrameExt, frame_error},
    schema::{SentimentCol, clean_columns},
    table::CleanTable,
};

/// Calendar features a date implies, in the order of the derived columns.
pub(crate) fn calendar_parts(date: NaiveDate) -> [(SentimentCol, i64); 4] {
    [
        (SentimentCol::Year, i64::from(date.year())),
        (SentimentCol::Month, i64::from(date.month())),
        (
            SentimentCol::DayOfWeek,
            i64::from(date.weekday().num_days_from_monday()),
        ),
        (SentimentCol::Quarter, i64::from((date.month() - 1) / 3 + 1)),
    ]
}

/// Reloads the clean CSV sink for reporting.
///
/// Dates are parsed again by polars, independently of the transform, and every
/// stored calendar feature is checked against the re-parsed date.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_report_table(path: &Path) -> SentimentResult<CleanTable> {
    let bytes = std::fs::read(path).map_err(|source| InputError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    let df = read_csv_strings(bytes, path, false)?;

    let present = df
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>();
    if let Some(missing) = clean_columns()
        .iter()
        .find(|name| !present.iter().any(|p| p == name.as_str()))
    {
        return Err(InputError::MissingColumn(missing.to_string()).into());
    }

    let raw_dates = df.str_values(SentimentCol::Date.as_str())?;

    let int_columns = [SentimentCol::Label]
        .into_iter()
        .chain(SentimentCol::derived())
        .map(|c| col(c.name()).strict_cast(DataType::Int32))
        .collect::<Vec<_>>();
    let df = df
        .lazy()
        .with_column(
            col(SentimentCol::Date.name())
                .str()
                .to_date(StrptimeOptions {
                    format: Some(DATE_FORMAT.into()),
                    strict: false,
                    exact: true,
                    cache: true,
                }),
        )
        .with_columns(int_columns)
        .select(clean_columns().into_iter().map(col).collect::<Vec<_>>())
        .collect()
        .map_err(|e| frame_error("Failed to type the reloaded CSV", e))?;

    verify_round_trip(&df, &raw_dates)?;
    verify_labels(&df)?;

    let table = CleanTable::new(df)?;
    if table.height() == 0 {
        return Err(ReportError::EmptyDataset.into());
    }

    info!(rows = table.height(), "Report data loaded");
    Ok(table)
}

/// Recomputes the calendar features from the re-parsed dates and compares them with the stored ones.
fn verify_round_trip(
    df: &DataFrame,
    raw_dates: &[Option<String>],
) -> SentimentResult<()> {
    let dates = df.date_values(SentimentCol::Date.as_str())?;
    let stored = SentimentCol::derived()
        .filter(|c| *c != SentimentCol::NewsCount)
        .map(|c| Ok((c, df.int_values(c.as_str())?)))
        .collect::<SentimentResult<Vec<_>>>()?;

    for (row, date) in dates.iter().enumerate() {
        let Some(date) = date else {
            return Err(DataError::DateRoundTrip {
                row,
                column: SentimentCol::Date.to_string(),
                stored: raw_dates
                    .get(row)
                    .cloned()
                    .flatten()
                    .unwrap_or_default(),
                reparsed: "<unparseable>".to_string(),
            }
            .into());
        };

        for (column, expected) in calendar_parts(*date) {
            let values = stored
                .iter()
                .find(|(c, _)| *c == column)
                .map(|(_, v)| v.as_slice())
                .unwrap_or_default();
            let actual = values.get(row).copied().flatten();
            if actual != Some(expected) {
                return Err(DataError::DateRoundTrip {
                    row,
                    column: column.to_string(),
                    stored: actual.map_or_else(|| "null".to_string(), |v| v.to_string()),
                    reparsed: expected.to_string(),
                }
                .into());
            }
        }
    }

    debug!(rows = dates.len(), "Date round trip verified");
    Ok(())
}

fn verify_labels(df: &DataFrame) -> SentimentResult<()> {
    let labels = df.int_values(SentimentCol::Label.as_str())?;
    for label in labels {
        match label {
            Some(0 | 1) => {}
            Some(other) => {
                let other = i32::try_from(other).unwrap_or(i32::MAX);
                return Err(ReportError::UnexpectedLabel(other).into());
            }
            None => {
                return Err(DataError::Schema("reloaded Label contains nulls".to_string()).into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{error::SentimentError, schema::headline_columns};

    fn write_csv(rows: &[[&str; 7]]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let mut header = vec!["Date".to_string(), "Label".to_string()];
        header.extend(headline_columns().iter().map(|c| c.to_string()));
        header.extend(
            ["Year", "Month", "DayOfWeek", "Quarter", "News_Count"].map(str::to_string),
        );
        writeln!(file, "{}", header.join(",")).expect("write header");

        for [date, label, year, month, dow, quarter, count] in rows {
            let mut fields = vec![date.to_string(), label.to_string(), "headline".to_string()];
            fields.extend(std::iter::repeat_n(String::new(), 24));
            fields.extend([year, month, dow, quarter, count].map(|v| v.to_string()));
            writeln!(file, "{}", fields.join(",")).expect("write row");
        }
        file
    }

    #[test]
    fn test_calendar_parts() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date");
        assert_eq!(
            calendar_parts(date).map(|(_, v)| v),
            [2020, 1, 2, 1]
        );
    }

    #[test]
    fn test_reload_keeps_empty_headlines() {
        let file = write_csv(&[
            ["2016-06-30", "1", "2016", "6", "3", "2", "1"],
            ["2016-07-01", "0", "2016", "7", "4", "3", "1"],
        ]);

        let table = load_report_table(file.path()).expect("reload failed");
        let records = table.records().expect("records");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].headlines[0], "headline");
        assert_eq!(records[0].headlines[1], "");
        assert_eq!(records[1].quarter, 3);
    }

    #[test]
    fn test_reload_detects_divergent_weekday() {
        let file = write_csv(&[["2016-07-01", "0", "2016", "7", "5", "3", "1"]]);

        let err = load_report_table(file.path()).expect_err("weekday mismatch");
        match err {
            SentimentError::Data(DataError::DateRoundTrip {
                column,
                stored,
                reparsed,
                ..
            }) => {
                assert_eq!(column, "DayOfWeek");
                assert_eq!(stored, "5");
                assert_eq!(reparsed, "4");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reload_rejects_unparseable_date() {
        let file = write_csv(&[["07/01/2016", "0", "2016", "7", "4", "3", "1"]]);

        let err = load_report_table(file.path()).expect_err("date must re-parse");
        assert!(matches!(
            err,
            SentimentError::Data(DataError::DateRoundTrip { .. })
        ));
    }

    #[test]
    fn test_reload_rejects_unexpected_label() {
        let file = write_csv(&[["2016-07-01", "2", "2016", "7", "4", "3", "1"]]);

        let err = load_report_table(file.path()).expect_err("label 2 is not reportable");
        assert!(matches!(
            err,
            SentimentError::Report(ReportError::UnexpectedLabel(2))
        ));
    }
}
