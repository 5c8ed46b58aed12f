use std::{path::PathBuf, process::ExitCode, time::Instant};

use anyhow::{Context, Result};
use clap::Parser;
use stock_sentiment::{
    config::{
        DEFAULT_CSV_PATH, DEFAULT_INPUT_PATH, DEFAULT_OUTPUT_DIR, DEFAULT_PARQUET_PATH,
        DEFAULT_SQLITE_PATH, DEFAULT_TABLE_NAME,
    },
    prelude::*,
};
use strum::Display;
use tracing_subscriber::EnvFilter;

const BANNER_WIDTH: usize = 60;

/// Cleans the headline sentiment dataset into CSV, Parquet and SQLite sinks,
/// then renders the exploratory charts and text report.
#[derive(Debug, Parser)]
#[command(name = "stock-sentiment", version, about)]
struct Cli {
    /// Raw input file with Date, Label and Top1..Top25 columns.
    #[arg(long, default_value = DEFAULT_INPUT_PATH)]
    input: PathBuf,

    #[arg(long, default_value = DEFAULT_CSV_PATH)]
    csv: PathBuf,

    #[arg(long, default_value = DEFAULT_PARQUET_PATH)]
    parquet: PathBuf,

    #[arg(long, default_value = DEFAULT_SQLITE_PATH)]
    db: PathBuf,

    /// Table replaced in the SQLite database.
    #[arg(long, default_value = DEFAULT_TABLE_NAME)]
    table: String,

    /// Directory receiving the six chart files.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Display)]
#[strum(serialize_all = "lowercase")]
enum Phase {
    Extract,
    Transform,
    Load,
    Report,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let start = Instant::now();

    // ETL
    banner("PHASE 1: ETL PIPELINE");
    let mut etl = SentimentEtl::from_path(&cli.input);
    in_phase(Phase::Extract, etl.extract().map(|_| ()))?;
    if let Some(report) = etl.extract_report() {
        println!(
            "Extracted {} rows x {} columns ({})",
            report.rows, report.columns, report.encoding
        );
    }

    in_phase(Phase::Transform, etl.transform().map(|_| ()))?;
    if let Some(report) = etl.transform_report() {
        println!(
            "Transformed {} -> {} rows ({} duplicates, {} undated rows removed)",
            report.input_rows,
            report.output_rows,
            report.duplicates_removed,
            report.null_dates_dropped
        );
    }

    let sinks = SinkPaths::default()
        .with_csv(&cli.csv)
        .with_parquet(&cli.parquet)
        .with_sqlite(&cli.db)
        .with_table(&cli.table);
    let loaded = in_phase(Phase::Load, etl.load_all(&sinks))?;
    let summary = in_phase(Phase::Load, etl.summary())?;

    banner("ETL SUMMARY");
    println!("{summary}");

    // EDA
    banner("PHASE 2: EXPLORATORY DATA ANALYSIS");
    let config = ReportConfig::default()
        .with_data_path(&loaded.csv)
        .with_output_dir(&cli.output_dir);
    let mut report = ExploratoryReport::new(config);
    in_phase(Phase::Report, report.load_data().map(|_| ()))?;
    let charts = in_phase(Phase::Report, report.generate_all_plots())?;
    let text = in_phase(Phase::Report, report.summary_report())?;
    println!("{text}");

    banner("PIPELINE COMPLETE");
    println!("Data sinks:");
    println!("  - {}", loaded.csv.display());
    println!("  - {}", loaded.parquet.display());
    println!(
        "  - {} (table '{}', {} rows)",
        loaded.sqlite.display(),
        loaded.table,
        loaded.sqlite_rows
    );
    println!("Charts:");
    for chart in &charts {
        println!("  - {}", chart.display());
    }
    println!(
        "Elapsed: {}",
        humantime::format_duration(std::time::Duration::from_millis(
            u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
        ))
    );

    Ok(())
}

// ================================================================================================
// Helper Functions
// ================================================================================================

fn in_phase<T>(phase: Phase, result: SentimentResult<T>) -> Result<T> {
    result.with_context(|| format!("Error in {phase}"))
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(BANNER_WIDTH));
    println!("{title}");
    println!("{}", "=".repeat(BANNER_WIDTH));
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
