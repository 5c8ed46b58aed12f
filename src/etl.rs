pub mod extract;
pub mod load;
pub mod summary;
pub mod transform;

use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::info;

use crate::{
    config::{ExtractConfig, SinkPaths},
    error::{SentimentResult, SequenceError},
    etl::{
        extract::ExtractReport,
        load::{LoadReport, ToCsv, ToParquet, ToSqlite},
        summary::DataSummary,
        transform::TransformReport,
    },
    table::{CleanTable, RawTable},
};

/// Extract, transform and load of the headline sentiment dataset.
///
/// Stages must run in order: [`extract`](Self::extract), then
/// [`transform`](Self::transform), then any of the sinks. Calling a stage
/// early is a [`SequenceError`]. Re-running `extract` discards the clean table.
#[derive(Debug, Clone)]
pub struct SentimentEtl {
    extract_cfg: ExtractConfig,
    raw: Option<RawTable>,
    clean: Option<CleanTable>,
    extract_report: Option<ExtractReport>,
    transform_report: Option<TransformReport>,
}

impl SentimentEtl {
    pub fn new(extract_cfg: ExtractConfig) -> Self {
        Self {
            extract_cfg,
            raw: None,
            clean: None,
            extract_report: None,
            transform_report: None,
        }
    }

    /// Convenience constructor reading `input` with the default encodings.
    pub fn from_path(input: impl Into<PathBuf>) -> Self {
        Self::new(ExtractConfig::new(input))
    }

    pub fn extract(&mut self) -> SentimentResult<&RawTable> {
        let (raw, report) = extract::extract(&self.extract_cfg)?;
        self.clean = None;
        self.transform_report = None;
        self.extract_report = Some(report);
        Ok(&*self.raw.insert(raw))
    }

    pub fn transform(&mut self) -> SentimentResult<&CleanTable> {
        let raw = self.raw.as_ref().ok_or(SequenceError::NotExtracted)?;
        let (clean, report) = transform::transform(raw)?;

        let summary = DataSummary::from_table(&clean)?;
        if let Some(range) = &summary.date_range {
            info!(start = %range.start, end = %range.end, days = range.days, "Date range");
        }
        info!(
            labels = %summary.label_distribution.iter().map(|(label, _)| label).join(", "),
            distribution = ?summary.label_distribution,
            "Label overview"
        );

        self.transform_report = Some(report);
        Ok(&*self.clean.insert(clean))
    }

    pub fn load_csv(&self, path: impl AsRef<Path>) -> SentimentResult<PathBuf> {
        self.clean()?.to_csv(path)
    }

    pub fn load_parquet(&self, path: impl AsRef<Path>) -> SentimentResult<PathBuf> {
        self.clean()?.to_parquet(path)
    }

    /// Replaces `table` in the database at `path`; returns the verified row count.
    pub fn load_sqlite(&self, path: impl AsRef<Path>, table: &str) -> SentimentResult<usize> {
        self.clean()?.to_sqlite(path, table)
    }

    /// Writes the CSV, Parquet and SQLite sinks, in that order.
    #[tracing::instrument(skip_all)]
    pub fn load_all(&self, sinks: &SinkPaths) -> SentimentResult<LoadReport> {
        let clean = self.clean()?;
        let csv = clean.to_csv(&sinks.csv)?;
        let parquet = clean.to_parquet(&sinks.parquet)?;
        let sqlite_rows = clean.to_sqlite(&sinks.sqlite, &sinks.table)?;

        info!(sqlite_rows, "All sinks written");
        Ok(LoadReport {
            csv,
            parquet,
            sqlite: sinks.sqlite.clone(),
            table: sinks.table.clone(),
            sqlite_rows,
        })
    }

    pub fn summary(&self) -> SentimentResult<DataSummary> {
        DataSummary::from_table(self.clean()?)
    }

    pub fn raw(&self) -> Option<&RawTable> {
        self.raw.as_ref()
    }

    /// The clean table, or [`SequenceError::NotTransformed`].
    pub fn clean(&self) -> SentimentResult<&CleanTable> {
        Ok(self.clean.as_ref().ok_or(SequenceError::NotTransformed)?)
    }

    pub fn extract_report(&self) -> Option<&ExtractReport> {
        self.extract_report.as_ref()
    }

    pub fn transform_report(&self) -> Option<&TransformReport> {
        self.transform_report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SentimentError;

    #[test]
    fn test_stages_out_of_order() {
        let mut etl = SentimentEtl::from_path("unused.csv");

        let err = etl.transform().expect_err("transform before extract");
        assert!(matches!(
            err,
            SentimentError::Sequence(SequenceError::NotExtracted)
        ));

        for err in [
            etl.load_csv("out.csv").expect_err("csv before transform"),
            etl.load_parquet("out.parquet").expect_err("parquet before transform"),
            etl.load_sqlite("out.db", "t").expect_err("sqlite before transform"),
            etl.summary().expect_err("summary before transform"),
        ] {
            assert!(matches!(
                err,
                SentimentError::Sequence(SequenceError::NotTransformed)
            ));
        }
        assert!(etl.load_all(&SinkPaths::default()).is_err());
    }
}
