use smeta_core::ItemType;

use crate::config::ParseConfig;
use crate::error::ParseError;
use crate::model::{RateCandidate, RawRow, RowTable};

/// Parse output for one source file. Skipped rows are counted, never
/// reported as errors.
#[derive(Debug)]
pub struct Parsed {
    pub rows: Vec<RawRow>,
    pub skipped: usize,
    pub header_row: usize,
}

/// Parse the 6-column estimate shape into classified raw rows.
///
/// Pure function over the decoded table. A row is skipped only when its
/// code or name cell is empty; a non-numeric price never rejects a row.
pub fn parse_rows(
    table: &RowTable,
    source_file: &str,
    config: &ParseConfig,
) -> Result<Parsed, ParseError> {
    if table.rows.is_empty() {
        return Err(ParseError::EmptyTable(source_file.to_string()));
    }

    let header_row = config.header.detect(table);
    let col = &config.columns;

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for r in (header_row + 1)..table.rows.len() {
        let code = table.cell(r, col.code).text();
        let name = table.cell(r, col.name).text();
        if code.is_empty() || name.is_empty() {
            skipped += 1;
            continue;
        }

        rows.push(RawRow {
            item_type: classify_code(&code),
            code,
            name,
            unit: table.cell(r, col.unit).text(),
            volume: table.cell(r, col.volume).number(),
            price_materials: table.cell(r, col.price_materials).number(),
            price_works: table.cell(r, col.price_works).number(),
            source_file: source_file.to_string(),
        });
    }

    Ok(Parsed { rows, skipped, header_row })
}

/// Parse the 3–4 column rate-list shape into import candidates.
/// Rows without a name are skipped; when the primary price cell reads as
/// zero and an alt-price column is configured, the alternative is used.
pub fn parse_rate_rows(
    table: &RowTable,
    source_file: &str,
    config: &ParseConfig,
) -> Result<Vec<RateCandidate>, ParseError> {
    if table.rows.is_empty() {
        return Err(ParseError::EmptyTable(source_file.to_string()));
    }

    let header_row = config.header.detect(table);
    let col = &config.rate_columns;

    let mut candidates = Vec::new();
    for r in (header_row + 1)..table.rows.len() {
        let name = table.cell(r, col.name).text();
        if name.is_empty() {
            continue;
        }

        let mut price = table.cell(r, col.price).number();
        if price == 0.0 {
            if let Some(alt) = col.alt_price {
                price = table.cell(r, alt).number();
            }
        }

        candidates.push(RateCandidate {
            name,
            unit: table.cell(r, col.unit).text(),
            price,
        });
    }

    Ok(candidates)
}

/// Classify the code cell into material/work.
///
/// `р`, `р-…` and `р …` mark work positions (Cyrillic er); anything
/// containing `мат` is explicitly a material; the default is material.
pub fn classify_code(code: &str) -> ItemType {
    let c = code.trim().to_lowercase();
    if c == "р" || c.starts_with("р-") || c.starts_with("р ") {
        ItemType::Work
    } else {
        // explicit "мат…" codes and anything unrecognized are materials
        ItemType::Material
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    fn text_table(rows: Vec<Vec<&str>>) -> RowTable {
        RowTable {
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|c| CellValue::Text(c.into())).collect())
                .collect(),
        }
    }

    #[test]
    fn classify_code_table() {
        assert_eq!(classify_code("Р"), ItemType::Work);
        assert_eq!(classify_code("р-12"), ItemType::Work);
        assert_eq!(classify_code("Р 4"), ItemType::Work);
        assert_eq!(classify_code("мат-104"), ItemType::Material);
        assert_eq!(classify_code("МАТ.7"), ItemType::Material);
        assert_eq!(classify_code("12.03"), ItemType::Material);
        // "р" only counts as work when standalone or prefixed
        assert_eq!(classify_code("пр-1"), ItemType::Material);
    }

    #[test]
    fn parses_past_detected_header() {
        let t = text_table(vec![
            vec!["Ведомость стоимости"],
            vec!["Код", "Наименование", "Ед.", "Кол-во", "Цена мат.", "Цена раб."],
            vec!["мат-1", "Кабель ВВГ", "м", "120,5", "100,00", ""],
            vec!["р-2", "Прокладка кабеля", "м", "120,5", "", "45,50"],
            vec!["", "итого", "", "", "", ""],
        ]);
        let parsed = parse_rows(&t, "смета.xlsx", &ParseConfig::default()).unwrap();
        assert_eq!(parsed.header_row, 1);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped, 1);

        let mat = &parsed.rows[0];
        assert_eq!(mat.item_type, ItemType::Material);
        assert_eq!(mat.volume, 120.5);
        assert_eq!(mat.price_materials, 100.0);
        assert_eq!(mat.price_works, 0.0);
        assert_eq!(mat.source_file, "смета.xlsx");

        let work = &parsed.rows[1];
        assert_eq!(work.item_type, ItemType::Work);
        assert_eq!(work.price_works, 45.5);
    }

    #[test]
    fn bad_prices_never_reject_a_row() {
        let t = text_table(vec![
            vec!["Код", "Наименование", "Ед.", "Кол-во", "Цена", ""],
            vec!["мат-1", "Бетон", "м3", "оценка", "договорная", ""],
        ]);
        let parsed = parse_rows(&t, "f.xlsx", &ParseConfig::default()).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].volume, 0.0);
        assert_eq!(parsed.rows[0].price_materials, 0.0);
    }

    #[test]
    fn empty_table_is_a_parse_error() {
        let err = parse_rows(&RowTable::default(), "f.xlsx", &ParseConfig::default());
        assert!(matches!(err, Err(ParseError::EmptyTable(_))));
    }

    #[test]
    fn rate_rows_use_alt_price_when_primary_is_zero() {
        let t = text_table(vec![
            vec!["Наименование", "Ед.", "Цена", "Цена прайс"],
            vec!["Кабель ВВГ", "м", "0", "98,40"],
            vec!["Бетон М300", "м3", "4 500,00", "4600"],
            vec!["", "шт", "10", ""],
        ]);
        let candidates = parse_rate_rows(&t, "прайс.xlsx", &ParseConfig::default()).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].price, 98.4);
        assert_eq!(candidates[1].price, 4500.0);
    }

    #[test]
    fn numeric_cells_pass_through() {
        let t = RowTable {
            rows: vec![
                vec![
                    CellValue::Text("Код".into()),
                    CellValue::Text("Наименование".into()),
                ],
                vec![
                    CellValue::Number(104.0),
                    CellValue::Text("Щебень".into()),
                    CellValue::Text("т".into()),
                    CellValue::Number(3.75),
                    CellValue::Number(1200.0),
                    CellValue::Empty,
                ],
            ],
        };
        let parsed = parse_rows(&t, "f.xlsx", &ParseConfig::default()).unwrap();
        assert_eq!(parsed.rows[0].code, "104");
        assert_eq!(parsed.rows[0].volume, 3.75);
        assert_eq!(parsed.rows[0].price_materials, 1200.0);
    }
}
