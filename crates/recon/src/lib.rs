//! `smeta-recon` — Materials pricing reconciliation engine.
//!
//! Pure engine crate: receives decoded spreadsheet tables and pre-loaded
//! rate lists, returns aggregates, comparisons and import reports.
//! No file or database I/O; the store behind the import workflow is a
//! trait seam implemented elsewhere.

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod dataset;
pub mod error;
pub mod import;
pub mod model;
pub mod parse;

pub use aggregate::aggregate;
pub use compare::compare;
pub use config::ParseConfig;
pub use dataset::Dataset;
pub use error::{DatasetError, ParseError, SessionError, StoreError};
pub use import::{analyze, commit, ImportSession, RateStore};
pub use model::{CellValue, PivotViews, RawRow, RowTable};
pub use parse::{parse_rate_rows, parse_rows};
