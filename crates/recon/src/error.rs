use std::fmt;

/// Parse-layer failure. Per-row problems never raise this; a row missing
/// its code or name is silently skipped and counted instead.
#[derive(Debug)]
pub enum ParseError {
    /// The decoded table has no rows at all.
    EmptyTable(String),
    /// TOML parse / deserialization error in a parse config.
    ConfigParse(String),
    /// Parse config validation error (empty marker list, bad scan limit).
    ConfigValidation(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTable(file) => write!(f, "'{file}': table contains no rows"),
            Self::ConfigParse(msg) => write!(f, "parse config error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "parse config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Rate store failure, as seen through the `RateStore` seam.
///
/// `UniqueConstraint` is kept separate from `Write` because the import
/// commit surfaces it differently to the user; both are non-fatal to a
/// batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A lookup during import analysis failed.
    Lookup(String),
    /// An insert/update/delete failed.
    Write(String),
    /// Insert collided with the (scope, normalized name) uniqueness rule.
    UniqueConstraint(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lookup(msg) => write!(f, "lookup failed: {msg}"),
            Self::Write(msg) => write!(f, "write failed: {msg}"),
            Self::UniqueConstraint(msg) => write!(f, "already exists: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Dataset mutation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    /// A file with this name is already loaded; no duplicate ingestion.
    DuplicateFile(String),
    /// Removal target is not a loaded file.
    UnknownFile(String),
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateFile(name) => write!(f, "file '{name}' is already loaded"),
            Self::UnknownFile(name) => write!(f, "file '{name}' is not loaded"),
        }
    }
}

impl std::error::Error for DatasetError {}

/// Import session used out of order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `analyze` called while a report is already pending.
    AlreadyAnalyzed,
    /// Decision/commit requested with no pending report.
    NotAnalyzed,
    /// Conflict index out of range for the pending report.
    BadConflictIndex(usize),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyAnalyzed => write!(f, "an import report is already pending"),
            Self::NotAnalyzed => write!(f, "no import report is pending"),
            Self::BadConflictIndex(i) => write!(f, "conflict index {i} out of range"),
        }
    }
}

impl std::error::Error for SessionError {}
