// 1. Traits
pub use crate::etl::load::{ToCsv, ToParquet, ToSqlite};
pub use crate::polars_ext::{DataFrameExt, ExprExt};

// 2. Stages
pub use crate::etl::SentimentEtl;
pub use crate::report::ExploratoryReport;

// 3. Tables & Vocabulary
pub use crate::schema::{HEADLINE_SLOTS, HeadlineSlot, SentimentCol};
pub use crate::table::{CleanRecord, CleanTable, RawTable};

// 4. Stage Reports
pub use crate::etl::{
    extract::ExtractReport, load::LoadReport, summary::DataSummary, transform::TransformReport,
};
pub use crate::io::{DecodeOutcome, TextEncoding};
pub use crate::report::charts::ChartFile;

// 5. Configuration
pub use crate::config::{ExtractConfig, ReportConfig, SinkPaths};
pub use crate::report::style::ChartStyle;

// 6. Errors
pub use crate::error::{
    DataError, InputError, IoError, ReportError, SentimentError, SentimentResult, SequenceError,
};
