pub mod config;
pub mod error;
pub mod etl;
pub mod io;
pub mod polars_ext;
pub mod prelude;
pub mod report;
pub mod schema;
pub mod table;
