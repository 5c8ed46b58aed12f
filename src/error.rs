use thiserror::Error;

pub type SentimentResult<T> = Result<T, SentimentError>;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Errors raised while reading the raw input file.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read input file '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed delimited text in '{path}': {msg}")]
    MalformedCsv { path: String, msg: String },

    #[error("Input is missing required column '{0}'")]
    MissingColumn(String),
}

/// Stage operations invoked out of order.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("No raw table available: run `extract()` first")]
    NotExtracted,

    #[error("No clean table available: run `transform()` first")]
    NotTransformed,

    #[error("No report data available: run `load_data()` first")]
    NotLoaded,
}

/// Errors related to data frames, type coercion and schema invariants.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("Label of the row dated {date} cannot be coerced to an integer: '{value}'")]
    LabelCoercion { date: String, value: String },

    #[error("Label of the row dated {date} is missing")]
    MissingLabel { date: String },

    #[error("Schema violation: {0}")]
    Schema(String),

    #[error(
        "Date round-trip divergence at row {row}: column '{column}' stored {stored}, re-parsed date gives {reparsed}"
    )]
    DateRoundTrip {
        row: usize,
        column: String,
        stored: String,
        reparsed: String,
    },
}

/// Errors related to sink writes and the file system.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Failed to write data: {0}")]
    WriteFailed(String),

    #[error("SQLite operation failed")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid table name: '{0}'")]
    InvalidTableName(String),

    #[error("Row count mismatch in table '{table}': wrote {expected}, counted {actual}")]
    RowCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised by the reporting stage.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Chart rendering failed: {0}")]
    Render(String),

    #[error("Unexpected label value {0}: charts expect labels 0 and 1")]
    UnexpectedLabel(i32),

    #[error("Cannot report on an empty dataset")]
    EmptyDataset,
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for ReportError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ReportError::Render(err.to_string())
    }
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for SentimentError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ReportError::from(err).into()
    }
}
