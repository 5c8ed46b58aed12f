use std::path::{Path, PathBuf};

use crate::{io::TextEncoding, report::style::ChartStyle};

pub const DEFAULT_INPUT_PATH: &str = "stock_senti_analysis.csv";
pub const DEFAULT_CSV_PATH: &str = "data/stock_sentiment_clean.csv";
pub const DEFAULT_PARQUET_PATH: &str = "data/stock_sentiment_clean.parquet";
pub const DEFAULT_SQLITE_PATH: &str = "data/stock_sentiment.db";
pub const DEFAULT_TABLE_NAME: &str = "stock_sentiment";
pub const DEFAULT_OUTPUT_DIR: &str = "visualizations";

// ================================================================================================
// ETL
// ================================================================================================

/// Where and how the raw input is read.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    input: PathBuf,
    encodings: Vec<TextEncoding>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT_PATH),
            encodings: TextEncoding::default_candidates(),
        }
    }
}

impl ExtractConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    /// Sets the encodings probed, in order, before falling back to lossy UTF-8.
    pub fn with_encodings(self, encodings: Vec<TextEncoding>) -> Self {
        Self { encodings, ..self }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn encodings(&self) -> &[TextEncoding] {
        &self.encodings
    }
}

/// Destinations of the three sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkPaths {
    pub csv: PathBuf,
    pub parquet: PathBuf,
    pub sqlite: PathBuf,
    pub table: String,
}

impl Default for SinkPaths {
    fn default() -> Self {
        Self {
            csv: PathBuf::from(DEFAULT_CSV_PATH),
            parquet: PathBuf::from(DEFAULT_PARQUET_PATH),
            sqlite: PathBuf::from(DEFAULT_SQLITE_PATH),
            table: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}

impl SinkPaths {
    /// Places all three sinks in `dir` using the default file names.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let file_name = |p: &str| {
            Path::new(p)
                .file_name()
                .map(|n| dir.join(n))
                .unwrap_or_else(|| dir.join(p))
        };
        Self {
            csv: file_name(DEFAULT_CSV_PATH),
            parquet: file_name(DEFAULT_PARQUET_PATH),
            sqlite: file_name(DEFAULT_SQLITE_PATH),
            table: DEFAULT_TABLE_NAME.to_string(),
        }
    }

    pub fn with_csv(self, csv: impl Into<PathBuf>) -> Self {
        Self {
            csv: csv.into(),
            ..self
        }
    }

    pub fn with_parquet(self, parquet: impl Into<PathBuf>) -> Self {
        Self {
            parquet: parquet.into(),
            ..self
        }
    }

    pub fn with_sqlite(self, sqlite: impl Into<PathBuf>) -> Self {
        Self {
            sqlite: sqlite.into(),
            ..self
        }
    }

    pub fn with_table(self, table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..self
        }
    }
}

// ================================================================================================
// Reporting
// ================================================================================================

/// Inputs, outputs and styling of the reporting stage.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    data_path: PathBuf,
    output_dir: PathBuf,
    style: ChartStyle,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_CSV_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            style: ChartStyle::default(),
        }
    }
}

impl ReportConfig {
    /// Reads the clean CSV sink at `data_path`.
    pub fn with_data_path(self, data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..self
        }
    }

    /// Writes chart artifacts into `output_dir`.
    pub fn with_output_dir(self, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..self
        }
    }

    pub fn with_style(self, style: ChartStyle) -> Self {
        Self { style, ..self }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn style(&self) -> &ChartStyle {
        &self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_paths_in_dir() {
        let paths = SinkPaths::in_dir("/tmp/out");
        assert_eq!(paths.csv, PathBuf::from("/tmp/out/stock_sentiment_clean.csv"));
        assert_eq!(paths.parquet, PathBuf::from("/tmp/out/stock_sentiment_clean.parquet"));
        assert_eq!(paths.sqlite, PathBuf::from("/tmp/out/stock_sentiment.db"));
        assert_eq!(paths.table, DEFAULT_TABLE_NAME);
    }

    #[test]
    fn test_default_encodings_order() {
        let cfg = ExtractConfig::new("in.csv");
        assert_eq!(cfg.encodings(), TextEncoding::default_candidates().as_slice());
        assert_eq!(cfg.input(), Path::new("in.csv"));
    }
}
