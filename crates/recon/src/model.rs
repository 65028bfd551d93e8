use serde::Serialize;
use smeta_core::{ItemType, RateScope};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One decoded spreadsheet cell. Produced by the I/O layer; the engine
/// never sees file bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Number(_) => false,
            Self::Text(s) => s.trim().is_empty(),
        }
    }

    /// Trimmed string form. Numbers render without a trailing `.0` so a
    /// numeric code column reads back as it was typed.
    pub fn text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Self::Text(s) => s.trim().to_string(),
        }
    }

    /// Permissive numeric read: strip all whitespace (including NBSP
    /// thousands separators), comma decimal point becomes a dot, and
    /// anything unparseable, negative or non-finite collapses to 0.
    pub fn number(&self) -> f64 {
        let n = match self {
            Self::Empty => 0.0,
            Self::Number(n) => *n,
            Self::Text(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| if c == ',' { '.' } else { c })
                    .collect();
                cleaned.parse::<f64>().unwrap_or(0.0)
            }
        };
        if n.is_finite() && n >= 0.0 {
            n
        } else {
            0.0
        }
    }
}

/// A raw row/column table, sheet 1 of one source file.
#[derive(Debug, Clone, Default)]
pub struct RowTable {
    pub rows: Vec<Vec<CellValue>>,
}

impl RowTable {
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(EMPTY)
    }
}

/// One classified data row from a source spreadsheet. Immutable, owned by
/// the dataset, dropped when its source file is removed.
#[derive(Debug, Clone, Serialize)]
pub struct RawRow {
    pub code: String,
    pub item_type: ItemType,
    pub name: String,
    pub unit: String,
    pub volume: f64,
    pub price_materials: f64,
    pub price_works: f64,
    pub source_file: String,
}

impl RawRow {
    /// The price that applies to this row's item type.
    pub fn price(&self) -> f64 {
        match self.item_type {
            ItemType::Material => self.price_materials,
            ItemType::Work => self.price_works,
        }
    }
}

/// A loaded source file, as tracked by the dataset.
#[derive(Debug, Clone, Serialize)]
pub struct FileHandle {
    pub name: String,
    pub row_count: usize,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Bucket key = (normalized name, item type, price to 2 decimals).
/// Same name+type with different prices lands in different buckets; that
/// split is how price variants are detected downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub name: String,
    pub item_type: ItemType,
    pub price: String,
}

/// Aggregated rows sharing one (name, type, price) triple.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateBucket {
    pub name: String,
    pub unit: String,
    pub item_type: ItemType,
    pub price: f64,
    pub total_volume: f64,
    pub count: usize,
    pub is_zero_price: bool,
    pub has_different_prices: bool,
    pub has_different_units: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceVariant {
    pub price: f64,
    pub volume: f64,
    pub count: usize,
}

/// Same name+type seen with two or more distinct prices.
/// Variants are sorted ascending by price.
#[derive(Debug, Clone, Serialize)]
pub struct PriceVariantGroup {
    pub name: String,
    pub item_type: ItemType,
    pub variants: Vec<PriceVariant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitVariant {
    pub unit: String,
    pub volume: f64,
    pub count: usize,
}

/// Same name+type seen with two or more distinct units of measure.
/// Built from raw rows, not buckets, so unit drift is visible even when
/// every row carries the same price.
#[derive(Debug, Clone, Serialize)]
pub struct UnitVariantGroup {
    pub name: String,
    pub item_type: ItemType,
    pub units: Vec<UnitVariant>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PivotStats {
    pub total_rows: usize,
    pub bucket_count: usize,
    pub material_count: usize,
    pub work_count: usize,
    pub zero_price_count: usize,
    pub different_price_count: usize,
    pub different_unit_count: usize,
}

/// Everything the aggregator derives from the current row set.
/// Recomputed from scratch on every dataset mutation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PivotViews {
    pub buckets: Vec<AggregateBucket>,
    pub price_variants: Vec<PriceVariantGroup>,
    pub unit_variants: Vec<UnitVariantGroup>,
    pub stats: PivotStats,
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Match,
    Different,
    NotFound,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "match"),
            Self::Different => write!(f, "different"),
            Self::NotFound => write!(f, "not_found"),
        }
    }
}

/// One nonzero-price bucket compared against a reference rate list.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow {
    pub name: String,
    pub unit: String,
    pub total_volume: f64,
    pub file_price: f64,
    pub reference_price: Option<f64>,
    pub current_sum: f64,
    pub reference_sum: f64,
    pub difference: f64,
    pub status: MatchStatus,
}

/// Totals accumulate over compared rows only; `not_found` rows are
/// counted but contribute nothing to the sums.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonStats {
    pub compared: usize,
    pub matched: usize,
    pub different: usize,
    pub not_found: usize,
    pub total_current_sum: f64,
    pub total_reference_sum: f64,
    pub total_difference: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonOutput {
    pub rows: Vec<ComparisonRow>,
    pub stats: ComparisonStats,
}

// ---------------------------------------------------------------------------
// Import / merge
// ---------------------------------------------------------------------------

/// A persisted rate, unique on (scope, normalized name).
#[derive(Debug, Clone, Serialize)]
pub struct RateRecord {
    pub id: i64,
    pub scope: RateScope,
    pub name: String,
    pub unit: String,
    pub price: f64,
}

/// A freshly parsed rate line awaiting classification.
#[derive(Debug, Clone, Serialize)]
pub struct RateCandidate {
    pub name: String,
    pub unit: String,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Keep,
    Update,
}

/// A candidate whose price disagrees with the persisted record.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictItem {
    pub candidate: RateCandidate,
    pub existing_id: i64,
    pub existing_price: f64,
    pub new_price: f64,
    pub difference: f64,
    pub percent_diff: f64,
    pub decision: Decision,
}

/// Result of analyzing one parsed file against the persisted rate table.
/// Consumed by commit or cancel; never persisted itself.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub source_file: String,
    pub scope: RateScope,
    pub total_parsed: usize,
    pub new_items: Vec<RateCandidate>,
    pub same_items: Vec<RateCandidate>,
    pub conflicts: Vec<ConflictItem>,
    /// Candidates skipped because their lookup failed; analysis continues.
    pub lookup_errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitErrorKind {
    UniqueConstraint,
    Write,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitError {
    pub name: String,
    pub kind: CommitErrorKind,
    pub message: String,
}

/// Final tally of a commit, reported even in partial failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitResult {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<CommitError>,
}

// ---------------------------------------------------------------------------
// Run metadata
// ---------------------------------------------------------------------------

/// Stamp attached to engine output when it leaves the process (JSON,
/// exported workbooks). Kept out of `PivotViews` so recomputes stay
/// comparable field-for-field.
#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
}

impl RunMeta {
    pub fn now() -> Self {
        Self {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text_forms() {
        assert_eq!(CellValue::Empty.text(), "");
        assert_eq!(CellValue::Number(12.0).text(), "12");
        assert_eq!(CellValue::Number(12.5).text(), "12.5");
        assert_eq!(CellValue::Text("  мат-104 ".into()).text(), "мат-104");
    }

    #[test]
    fn cell_number_permissive() {
        assert_eq!(CellValue::Text("1 234,56".into()).number(), 1234.56);
        assert_eq!(CellValue::Text("1\u{a0}500".into()).number(), 1500.0);
        assert_eq!(CellValue::Text("n/a".into()).number(), 0.0);
        assert_eq!(CellValue::Text("".into()).number(), 0.0);
        assert_eq!(CellValue::Number(-5.0).number(), 0.0);
        assert_eq!(CellValue::Number(f64::NAN).number(), 0.0);
        assert_eq!(CellValue::Empty.number(), 0.0);
    }

    #[test]
    fn row_price_follows_item_type() {
        let row = RawRow {
            code: "мат-1".into(),
            item_type: ItemType::Material,
            name: "Кабель".into(),
            unit: "м".into(),
            volume: 10.0,
            price_materials: 100.0,
            price_works: 40.0,
            source_file: "a.xlsx".into(),
        };
        assert_eq!(row.price(), 100.0);
        let work = RawRow { item_type: ItemType::Work, ..row };
        assert_eq!(work.price(), 40.0);
    }
}
