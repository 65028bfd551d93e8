// Xlsx export of engine views.
//
// Presentation snapshot for sharing, not a round-trip format. Every sheet
// follows the same frame: title row, summary row, header row, data rows,
// totals row. The numbers are written exactly as the engine rounded them;
// only the cell format (0.00) is presentation.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};
use smeta_core::ItemType;
use smeta_recon::model::{ComparisonOutput, PivotViews, RunMeta};

use crate::error::IoError;

#[derive(Debug, Default, Clone)]
pub struct ExportStats {
    pub sheets_exported: usize,
    pub rows_exported: usize,
}

/// Write pivot views (and optionally a comparison) as an xlsx workbook.
pub fn export_views(
    views: &PivotViews,
    comparison: Option<&ComparisonOutput>,
    meta: &RunMeta,
    path: &Path,
) -> Result<ExportStats, IoError> {
    let mut workbook = XlsxWorkbook::new();
    let mut stats = ExportStats::default();

    let bold = Format::new().set_bold();
    let num = Format::new().set_num_format("0.00");

    write_buckets_sheet(&mut workbook, views, meta, &bold, &num, &mut stats)?;
    write_price_variants_sheet(&mut workbook, views, meta, &bold, &num, &mut stats)?;
    write_unit_variants_sheet(&mut workbook, views, meta, &bold, &num, &mut stats)?;
    if let Some(comparison) = comparison {
        write_comparison_sheet(&mut workbook, comparison, meta, &bold, &num, &mut stats)?;
    }

    workbook.save(path).map_err(|e| IoError::Write(e.to_string()))?;
    Ok(stats)
}

fn type_label(item_type: ItemType) -> &'static str {
    match item_type {
        ItemType::Material => "материал",
        ItemType::Work => "работа",
    }
}

fn sheet_frame<'a>(
    workbook: &'a mut XlsxWorkbook,
    name: &str,
    title: &str,
    summary: &str,
    headers: &[&str],
    bold: &Format,
) -> Result<&'a mut Worksheet, IoError> {
    let worksheet = workbook
        .add_worksheet()
        .set_name(name)
        .map_err(|e| IoError::Write(format!("sheet '{name}': {e}")))?;
    worksheet
        .write_string_with_format(0, 0, title, bold)
        .and_then(|ws| ws.write_string(1, 0, summary))
        .map_err(|e| IoError::Write(e.to_string()))?;
    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string_with_format(2, col as u16, *header, bold)
            .map_err(|e| IoError::Write(e.to_string()))?;
    }
    Ok(worksheet)
}

fn write_buckets_sheet(
    workbook: &mut XlsxWorkbook,
    views: &PivotViews,
    meta: &RunMeta,
    bold: &Format,
    num: &Format,
    stats: &mut ExportStats,
) -> Result<(), IoError> {
    let s = &views.stats;
    let worksheet = sheet_frame(
        workbook,
        "Сводная",
        "Сводная ведомость материалов и работ",
        &format!(
            "{} позиций из {} строк · материалов {} · работ {} · без цены {} · {}",
            s.bucket_count, s.total_rows, s.material_count, s.work_count, s.zero_price_count,
            meta.run_at
        ),
        &["Наименование", "Тип", "Ед.", "Цена", "Объём", "Строк", "Сумма"],
        bold,
    )?;

    let mut row = 3u32;
    let mut total_sum = 0.0;
    for bucket in &views.buckets {
        let sum = smeta_core::round2(bucket.total_volume * bucket.price);
        total_sum = smeta_core::round2(total_sum + sum);
        worksheet
            .write_string(row, 0, &bucket.name)
            .and_then(|ws| ws.write_string(row, 1, type_label(bucket.item_type)))
            .and_then(|ws| ws.write_string(row, 2, &bucket.unit))
            .and_then(|ws| ws.write_number_with_format(row, 3, bucket.price, num))
            .and_then(|ws| ws.write_number_with_format(row, 4, bucket.total_volume, num))
            .and_then(|ws| ws.write_number(row, 5, bucket.count as f64))
            .and_then(|ws| ws.write_number_with_format(row, 6, sum, num))
            .map_err(|e| IoError::Write(e.to_string()))?;
        row += 1;
    }

    worksheet
        .write_string_with_format(row, 0, "ИТОГО", bold)
        .and_then(|ws| ws.write_number_with_format(row, 6, total_sum, num))
        .map_err(|e| IoError::Write(e.to_string()))?;

    stats.sheets_exported += 1;
    stats.rows_exported += views.buckets.len();
    Ok(())
}

fn write_price_variants_sheet(
    workbook: &mut XlsxWorkbook,
    views: &PivotViews,
    meta: &RunMeta,
    bold: &Format,
    num: &Format,
    stats: &mut ExportStats,
) -> Result<(), IoError> {
    let worksheet = sheet_frame(
        workbook,
        "Разные цены",
        "Позиции с расхождением цен",
        &format!("{} позиций · {}", views.price_variants.len(), meta.run_at),
        &["Наименование", "Тип", "Цена", "Объём", "Строк"],
        bold,
    )?;

    let mut row = 3u32;
    let mut variant_rows = 0usize;
    for group in &views.price_variants {
        for variant in &group.variants {
            worksheet
                .write_string(row, 0, &group.name)
                .and_then(|ws| ws.write_string(row, 1, type_label(group.item_type)))
                .and_then(|ws| ws.write_number_with_format(row, 2, variant.price, num))
                .and_then(|ws| ws.write_number_with_format(row, 3, variant.volume, num))
                .and_then(|ws| ws.write_number(row, 4, variant.count as f64))
                .map_err(|e| IoError::Write(e.to_string()))?;
            row += 1;
            variant_rows += 1;
        }
    }

    worksheet
        .write_string_with_format(row, 0, "ИТОГО", bold)
        .and_then(|ws| ws.write_number(row, 4, variant_rows as f64))
        .map_err(|e| IoError::Write(e.to_string()))?;

    stats.sheets_exported += 1;
    stats.rows_exported += variant_rows;
    Ok(())
}

fn write_unit_variants_sheet(
    workbook: &mut XlsxWorkbook,
    views: &PivotViews,
    meta: &RunMeta,
    bold: &Format,
    num: &Format,
    stats: &mut ExportStats,
) -> Result<(), IoError> {
    let worksheet = sheet_frame(
        workbook,
        "Разные единицы",
        "Позиции с расхождением единиц измерения",
        &format!("{} позиций · {}", views.unit_variants.len(), meta.run_at),
        &["Наименование", "Тип", "Ед.", "Объём", "Строк"],
        bold,
    )?;

    let mut row = 3u32;
    let mut unit_rows = 0usize;
    for group in &views.unit_variants {
        for unit in &group.units {
            worksheet
                .write_string(row, 0, &group.name)
                .and_then(|ws| ws.write_string(row, 1, type_label(group.item_type)))
                .and_then(|ws| ws.write_string(row, 2, &unit.unit))
                .and_then(|ws| ws.write_number_with_format(row, 3, unit.volume, num))
                .and_then(|ws| ws.write_number(row, 4, unit.count as f64))
                .map_err(|e| IoError::Write(e.to_string()))?;
            row += 1;
            unit_rows += 1;
        }
    }

    worksheet
        .write_string_with_format(row, 0, "ИТОГО", bold)
        .and_then(|ws| ws.write_number(row, 4, unit_rows as f64))
        .map_err(|e| IoError::Write(e.to_string()))?;

    stats.sheets_exported += 1;
    stats.rows_exported += unit_rows;
    Ok(())
}

fn write_comparison_sheet(
    workbook: &mut XlsxWorkbook,
    comparison: &ComparisonOutput,
    meta: &RunMeta,
    bold: &Format,
    num: &Format,
    stats: &mut ExportStats,
) -> Result<(), IoError> {
    let s = &comparison.stats;
    let worksheet = sheet_frame(
        workbook,
        "Сравнение",
        "Сравнение с расценками",
        &format!(
            "совпало {} · расхождений {} · нет в расценках {} · {}",
            s.matched, s.different, s.not_found, meta.run_at
        ),
        &[
            "Наименование",
            "Ед.",
            "Объём",
            "Цена (файл)",
            "Цена (расценки)",
            "Сумма (файл)",
            "Сумма (расценки)",
            "Разница",
            "Статус",
        ],
        bold,
    )?;

    let mut row = 3u32;
    for item in &comparison.rows {
        worksheet
            .write_string(row, 0, &item.name)
            .and_then(|ws| ws.write_string(row, 1, &item.unit))
            .and_then(|ws| ws.write_number_with_format(row, 2, item.total_volume, num))
            .and_then(|ws| ws.write_number_with_format(row, 3, item.file_price, num))
            .map_err(|e| IoError::Write(e.to_string()))?;
        if let Some(reference_price) = item.reference_price {
            worksheet
                .write_number_with_format(row, 4, reference_price, num)
                .and_then(|ws| ws.write_number_with_format(row, 5, item.current_sum, num))
                .and_then(|ws| ws.write_number_with_format(row, 6, item.reference_sum, num))
                .and_then(|ws| ws.write_number_with_format(row, 7, item.difference, num))
                .map_err(|e| IoError::Write(e.to_string()))?;
        } else {
            worksheet
                .write_number_with_format(row, 5, item.current_sum, num)
                .map_err(|e| IoError::Write(e.to_string()))?;
        }
        worksheet
            .write_string(row, 8, &item.status.to_string())
            .map_err(|e| IoError::Write(e.to_string()))?;
        row += 1;
    }

    worksheet
        .write_string_with_format(row, 0, "ИТОГО", bold)
        .and_then(|ws| ws.write_number_with_format(row, 5, s.total_current_sum, num))
        .and_then(|ws| ws.write_number_with_format(row, 6, s.total_reference_sum, num))
        .and_then(|ws| ws.write_number_with_format(row, 7, s.total_difference, num))
        .map_err(|e| IoError::Write(e.to_string()))?;

    stats.sheets_exported += 1;
    stats.rows_exported += comparison.rows.len();
    Ok(())
}
