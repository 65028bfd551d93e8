// CSV import into the engine's RowTable.
//
// Rate lists are often handed over as `;`-delimited CSV exports; the
// delimiter is sniffed from the first line when not supplied.

use std::path::Path;

use smeta_recon::model::{CellValue, RowTable};

use crate::error::IoError;

/// Read a CSV file into a `RowTable`. Every cell arrives as text; the
/// engine's permissive numeric parsing applies downstream.
pub fn read_table(path: &Path) -> Result<RowTable, IoError> {
    let data = std::fs::read_to_string(path).map_err(|e| IoError::Open(e.to_string()))?;
    read_table_str(&data)
}

pub fn read_table_str(data: &str) -> Result<RowTable, IoError> {
    let delimiter = sniff_delimiter(data);
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut table = RowTable::default();
    for record in reader.records() {
        let record = record.map_err(|e| IoError::Decode(e.to_string()))?;
        table.rows.push(
            record
                .iter()
                .map(|cell| {
                    if cell.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(cell.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(table)
}

/// `;` wins when the first line has more of them than commas; Russian
/// spreadsheet exports use `;` because `,` is the decimal separator.
fn sniff_delimiter(data: &str) -> u8 {
    let first_line = data.lines().next().unwrap_or("");
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    if semicolons >= commas && semicolons > 0 {
        b';'
    } else {
        b','
    }
}
