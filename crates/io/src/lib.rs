//! `smeta-io` — File I/O for the pricing engine.
//!
//! Decodes xlsx/csv source files into the engine's `RowTable`, renders
//! engine views back out as xlsx workbooks, and provides the SQLite
//! implementation of the rate store.

pub mod csv;
pub mod error;
pub mod export;
pub mod store;
pub mod xlsx;

pub use error::IoError;
pub use store::SqliteRateStore;
