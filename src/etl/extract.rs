use std::{io::Cursor, path::Path};

use polars::{
    frame::DataFrame,
    prelude::{CsvReadOptions, SerReader},
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::ExtractConfig,
    error::{InputError, SentimentResult},
    io::{ByteAlteration, DecodeOutcome, decode_with_fallback},
    table::RawTable,
};

/// What the extraction step observed while reading the raw file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    pub encoding: DecodeOutcome,
    pub rows: usize,
    pub columns: usize,
    /// Byte runs replaced by the lossy fallback; empty on a strict decode.
    pub alterations: Vec<ByteAlteration>,
}

/// Reads the raw input file into a [`RawTable`].
///
/// Each candidate encoding is tried in order; the first that decodes wins.
/// When every candidate fails, the bytes are decoded as lossy UTF-8 and every
/// replaced byte run is reported.
#[tracing::instrument(skip(cfg), fields(path = %cfg.input().display()))]
pub fn extract(cfg: &ExtractConfig) -> SentimentResult<(RawTable, ExtractReport)> {
    let path = cfg.input();
    info!("Extracting raw data");

    let bytes = std::fs::read(path).map_err(|source| InputError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;

    let decoded = decode_with_fallback(&bytes, cfg.encodings());
    match decoded.outcome {
        DecodeOutcome::Strict(enc) => info!(encoding = %enc, "Decoded input"),
        DecodeOutcome::Lossy => warn!(
            altered_runs = decoded.alterations.len(),
            "No candidate encoding succeeded, decoded with replacement"
        ),
    }

    let df = read_csv_strings(decoded.text.into_bytes(), path, true)?;
    let raw = RawTable::new(df)?;

    info!(rows = raw.height(), columns = raw.width(), "Raw data extracted");

    let report = ExtractReport {
        encoding: decoded.outcome,
        rows: raw.height(),
        columns: raw.width(),
        alterations: decoded.alterations,
    };

    Ok((raw, report))
}

/// Parses comma-delimited UTF-8 text with a header row, reading every column as `String`.
///
/// With `missing_is_null`, empty fields become nulls; otherwise they stay empty strings.
pub(crate) fn read_csv_strings(
    bytes: Vec<u8>,
    origin: &Path,
    missing_is_null: bool,
) -> SentimentResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_missing_is_null(missing_is_null))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| {
            InputError::MalformedCsv {
                path: origin.display().to_string(),
                msg: e.to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{io::TextEncoding, polars_ext::DataFrameExt, schema::headline_columns};

    fn header() -> String {
        let mut cols = vec!["Date".to_string(), "Label".to_string()];
        cols.extend(headline_columns().iter().map(|c| c.to_string()));
        cols.join(",")
    }

    fn row(date: &str, label: &str, top1: &str) -> String {
        let mut fields = vec![date.to_string(), label.to_string(), top1.to_string()];
        fields.extend(std::iter::repeat_n(String::new(), 24));
        fields.join(",")
    }

    #[test]
    fn test_extract_reads_all_columns_as_strings() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "{}", header()).expect("write header");
        writeln!(file, "{}", row("2020-01-01", "1", "\"a, quoted\"")).expect("write row");
        writeln!(file, "{}", row("2020-01-02", "0", "")).expect("write row");

        let cfg = ExtractConfig::new(file.path());
        let (raw, report) = extract(&cfg).expect("extract failed");

        assert_eq!(report.encoding, DecodeOutcome::Strict(TextEncoding::Utf8));
        assert_eq!((report.rows, report.columns), (2, 27));
        assert_eq!(
            raw.as_df().str_values("Label").expect("labels"),
            vec![Some("1".to_string()), Some("0".to_string())]
        );
        assert_eq!(
            raw.as_df().str_values("Top1").expect("top1"),
            vec![Some("a, quoted".to_string()), None]
        );
    }

    #[test]
    fn test_extract_missing_file_is_input_error() {
        let cfg = ExtractConfig::new("/definitely/not/here.csv");
        let err = extract(&cfg).expect_err("missing file must fail");
        assert!(matches!(
            err,
            crate::error::SentimentError::Input(InputError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_lossy_fallback_keeps_rows() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "{}", header()).expect("write header");
        file.write_all(row("2020-01-01", "1", "caf\u{e9}").as_bytes())
            .expect("write row");
        file.write_all(b"\n").expect("write newline");
        let mut bad_row = b"2020-01-02,0,bad\xFFbyte".to_vec();
        bad_row.extend(",".repeat(24).as_bytes());
        file.write_all(&bad_row).expect("write row");
        file.write_all(b"\n").expect("write newline");
        file.flush().expect("flush");

        let cfg = ExtractConfig::new(file.path()).with_encodings(vec![TextEncoding::Utf8]);
        let (raw, report) = extract(&cfg).expect("extract failed");

        assert_eq!(report.encoding, DecodeOutcome::Lossy);
        assert_eq!(raw.height(), 2);
        assert_eq!(report.alterations.len(), 1);
        assert_eq!(report.alterations[0].line, 3);
        assert_eq!(report.alterations[0].bytes, vec![0xFF]);
    }
}
