// Excel file import (xlsx, xls, xlsb, ods), sheet 1 only.
//
// One-way conversion into the engine's RowTable; a decode failure here
// is the only thing that aborts ingestion of a file.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use smeta_recon::model::{CellValue, RowTable};

use crate::error::IoError;

/// What a read produced, for the status line.
#[derive(Debug, Clone)]
pub struct ReadStats {
    pub sheet_name: String,
    pub rows_read: usize,
}

/// Read the first sheet of an Excel file into a `RowTable`.
pub fn read_table(path: &Path) -> Result<(RowTable, ReadStats), IoError> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| IoError::Decode(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IoError::NoSheets(path.display().to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IoError::Decode(format!("sheet '{sheet_name}': {e}")))?;

    let mut table = RowTable::default();
    for row in range.rows() {
        table.rows.push(row.iter().map(convert_cell).collect());
    }

    let stats = ReadStats { sheet_name, rows_read: table.rows.len() };
    Ok((table, stats))
}

fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        // formula error cells carry no usable value
        Data::Error(_) => CellValue::Empty,
    }
}
