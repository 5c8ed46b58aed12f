use std::{
    io::Write,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use polars::prelude::{CsvWriter, ParquetWriter, SerWriter};
use rusqlite::{Connection, params_from_iter, types::Value};
use serde::Serialize;
use tracing::info;

use crate::{
    error::{IoError, SentimentResult},
    etl::transform::DATE_FORMAT,
    io::{create_writer, ensure_parent_dir},
    schema::{HeadlineSlot, SentimentCol},
    table::{CleanRecord, CleanTable},
};

// ================================================================================================
// Traits
// ================================================================================================

pub trait ToCsv {
    /// Writes the table as comma-delimited UTF-8 text with a header row.
    ///
    /// # Side Effects
    /// - Creates the parent directory if missing.
    /// - Overwrites the file if it exists.
    fn to_csv(&self, path: impl AsRef<Path>) -> SentimentResult<PathBuf>;
}

pub trait ToParquet {
    /// Writes the table as Parquet, preserving column types.
    fn to_parquet(&self, path: impl AsRef<Path>) -> SentimentResult<PathBuf>;
}

pub trait ToSqlite {
    /// Replaces `table` in the database at `path` and returns the verified row count.
    fn to_sqlite(&self, path: impl AsRef<Path>, table: &str) -> SentimentResult<usize>;
}

/// Where the clean table was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub csv: PathBuf,
    pub parquet: PathBuf,
    pub sqlite: PathBuf,
    pub table: String,
    /// Rows counted in the SQLite table after the write.
    pub sqlite_rows: usize,
}

// ================================================================================================
// Implementations
// ================================================================================================

impl ToCsv for CleanTable {
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    fn to_csv(&self, path: impl AsRef<Path>) -> SentimentResult<PathBuf> {
        let path = path.as_ref();
        let mut writer = create_writer(path)?;
        let mut df = self.as_df().clone();

        CsvWriter::new(&mut writer)
            .include_header(true)
            .with_separator(b',')
            .with_date_format(Some(DATE_FORMAT.to_string()))
            .finish(&mut df)
            .map_err(|e| {
                IoError::WriteFailed(format!("Failed to write CSV to '{}': {e}", path.display()))
            })?;
        writer.flush().map_err(IoError::Io)?;

        info!(rows = df.height(), "CSV sink written");
        Ok(path.to_path_buf())
    }
}

impl ToParquet for CleanTable {
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    fn to_parquet(&self, path: impl AsRef<Path>) -> SentimentResult<PathBuf> {
        let path = path.as_ref();
        let mut writer = create_writer(path)?;
        let mut df = self.as_df().clone();

        ParquetWriter::new(&mut writer).finish(&mut df).map_err(|e| {
            IoError::WriteFailed(format!(
                "Failed to write Parquet to '{}': {e}",
                path.display()
            ))
        })?;
        writer.flush().map_err(IoError::Io)?;

        info!(rows = df.height(), "Parquet sink written");
        Ok(path.to_path_buf())
    }
}

impl ToSqlite for CleanTable {
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    fn to_sqlite(&self, path: impl AsRef<Path>, table: &str) -> SentimentResult<usize> {
        let path = path.as_ref();
        validate_table_name(table)?;
        ensure_parent_dir(path)?;

        let records = self.records()?;
        let counted = write_sqlite(path, table, &records).map_err(IoError::Sqlite)?;

        if counted != records.len() {
            return Err(IoError::RowCountMismatch {
                table: table.to_string(),
                expected: records.len(),
                actual: counted,
            }
            .into());
        }

        info!(table, rows = counted, "SQLite sink written and verified");
        Ok(counted)
    }
}

fn write_sqlite(path: &Path, table: &str, records: &[CleanRecord]) -> rusqlite::Result<usize> {
    let mut conn = Connection::open(path)?;

    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS \"{table}\";\nCREATE TABLE \"{table}\" ({});",
        column_definitions()
    ))?;
    {
        let placeholders = (1..=sql_columns().len()).map(|i| format!("?{i}")).join(", ");
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO \"{table}\" ({}) VALUES ({placeholders})",
            sql_columns().iter().map(|(name, _)| format!("\"{name}\"")).join(", ")
        ))?;
        for record in records {
            stmt.execute(params_from_iter(record.sql_values()))?;
        }
    }
    tx.commit()?;

    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
        row.get(0)
    })?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Column names with their SQLite type affinity, in canonical order.
fn sql_columns() -> Vec<(String, &'static str)> {
    let affinity = |col: SentimentCol| match col {
        SentimentCol::Date => "TEXT",
        _ => "INTEGER",
    };

    [SentimentCol::Date, SentimentCol::Label]
        .into_iter()
        .map(|c| (c.to_string(), affinity(c)))
        .chain(HeadlineSlot::all().map(|slot| (slot.name().to_string(), "TEXT")))
        .chain(SentimentCol::derived().map(|c| (c.to_string(), affinity(c))))
        .collect()
}

fn column_definitions() -> String {
    sql_columns()
        .iter()
        .map(|(name, affinity)| format!("\"{name}\" {affinity}"))
        .join(", ")
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn validate_table_name(table: &str) -> SentimentResult<()> {
    let mut chars = table.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(IoError::InvalidTableName(table.to_string()).into())
    }
}

impl CleanRecord {
    /// SQL parameter values in canonical column order.
    pub fn sql_values(&self) -> Vec<Value> {
        [
            Value::Text(self.date.format(DATE_FORMAT).to_string()),
            Value::Integer(i64::from(self.label)),
        ]
        .into_iter()
        .chain(self.headlines.iter().cloned().map(Value::Text))
        .chain(
            [
                self.year,
                self.month,
                self.day_of_week,
                self.quarter,
                self.news_count,
            ]
            .map(|v| Value::Integer(i64::from(v))),
        )
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::schema::HEADLINE_SLOTS;

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("stock_sentiment").is_ok());
        assert!(validate_table_name("_t1").is_ok());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("drop table; --").is_err());
        assert!(validate_table_name("").is_err());
    }

    #[test]
    fn test_sql_columns_follow_canonical_order() {
        let columns = sql_columns();
        assert_eq!(columns.len(), 2 + HEADLINE_SLOTS as usize + 5);
        assert_eq!(columns[0], ("Date".to_string(), "TEXT"));
        assert_eq!(columns[1], ("Label".to_string(), "INTEGER"));
        assert_eq!(columns[2], ("Top1".to_string(), "TEXT"));
        assert_eq!(columns.last(), Some(&("News_Count".to_string(), "INTEGER")));
    }

    #[test]
    fn test_sql_values_match_columns() {
        let record = CleanRecord {
            date: NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date"),
            label: 1,
            headlines: vec![String::new(); HEADLINE_SLOTS as usize],
            year: 2020,
            month: 1,
            day_of_week: 2,
            quarter: 1,
            news_count: 0,
        };

        let values = record.sql_values();
        assert_eq!(values.len(), sql_columns().len());
        assert_eq!(values[0], Value::Text("2020-01-01".to_string()));
        assert_eq!(values[1], Value::Integer(1));
        assert_eq!(values[2], Value::Text(String::new()));
        assert_eq!(values[29], Value::Integer(2));
    }
}
