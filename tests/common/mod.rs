#![allow(dead_code)]

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use polars::prelude::{ParquetReader, SerReader};
use rusqlite::{Connection, types::Value};
use stock_sentiment::{prelude::*, report::dataset::load_report_table};

pub const FIXTURE_ROWS: usize = 9;
pub const CLEAN_ROWS: usize = 6;

pub fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/raw/headlines.csv")
}

/// Writes a raw input file; each row is `Date, Label, Top1..` with missing slots left empty.
pub fn write_raw_csv(dir: &Path, name: &str, rows: &[&[&str]]) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("Failed to create raw CSV");

    let header = ["Date".to_string(), "Label".to_string()]
        .into_iter()
        .chain((1..=HEADLINE_SLOTS).map(|i| format!("Top{i}")))
        .collect::<Vec<_>>();
    writeln!(file, "{}", header.join(",")).expect("Failed to write header");

    for row in rows {
        let mut fields = row.iter().map(|f| f.to_string()).collect::<Vec<_>>();
        fields.resize(header.len(), String::new());
        writeln!(file, "{}", fields.join(",")).expect("Failed to write row");
    }
    path
}

/// Extracts and transforms `input`.
pub fn cleaned(input: impl Into<PathBuf>) -> SentimentEtl {
    let mut etl = SentimentEtl::from_path(input);
    etl.extract().expect("Failed to extract");
    etl.transform().expect("Failed to transform");
    etl
}

/// Runs the full ETL over the fixture, writing every sink into `dir`.
pub fn run_etl(dir: &Path) -> (SentimentEtl, LoadReport) {
    let etl = cleaned(fixture_path());
    let report = etl
        .load_all(&SinkPaths::in_dir(dir))
        .expect("Failed to load sinks");
    (etl, report)
}

/// Checks that every sink in `loaded` holds exactly `records`.
pub fn assert_sinks_match(loaded: &LoadReport, records: &[CleanRecord]) {
    assert_eq!(loaded.sqlite_rows, records.len());

    // CSV
    let reloaded = load_report_table(&loaded.csv).expect("Failed to reload CSV sink");
    assert_eq!(reloaded.records().expect("records"), records);

    // Parquet
    let parquet = ParquetReader::new(File::open(&loaded.parquet).expect("open parquet"))
        .finish()
        .expect("Failed to read parquet sink");
    let parquet = CleanTable::try_from(parquet).expect("parquet sink is a clean table");
    assert_eq!(parquet.records().expect("records"), records);

    // SQLite
    let conn = Connection::open(&loaded.sqlite).expect("open sqlite");
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM \"{}\" ORDER BY rowid", loaded.table))
        .expect("prepare");
    let width = stmt.column_count();
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<Result<Vec<_>, _>>()
        })
        .expect("query")
        .collect::<Result<Vec<_>, _>>()
        .expect("rows");
    let expected = records.iter().map(CleanRecord::sql_values).collect::<Vec<_>>();
    assert_eq!(width, expected[0].len());
    assert_eq!(rows, expected);
}
