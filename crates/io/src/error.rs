use std::fmt;

/// I/O layer failure. A file that cannot be decoded at all fails here;
/// per-row oddities inside a decoded table are the engine's business.
#[derive(Debug)]
pub enum IoError {
    /// File could not be opened or read.
    Open(String),
    /// File opened but could not be decoded as a spreadsheet.
    Decode(String),
    /// The workbook has no sheets.
    NoSheets(String),
    /// Writing an output workbook failed.
    Write(String),
    /// SQLite open/schema failure.
    Db(String),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(msg) => write!(f, "cannot open file: {msg}"),
            Self::Decode(msg) => write!(f, "cannot decode file: {msg}"),
            Self::NoSheets(file) => write!(f, "'{file}' contains no sheets"),
            Self::Write(msg) => write!(f, "cannot write file: {msg}"),
            Self::Db(msg) => write!(f, "database error: {msg}"),
        }
    }
}

impl std::error::Error for IoError {}
