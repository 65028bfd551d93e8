use serde::Deserialize;

use crate::error::ParseError;
use crate::model::RowTable;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Parse-layer configuration: header detection strategy plus positional
/// column layouts for the two input shapes. All fields have working
/// defaults; a config file only overrides what differs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParseConfig {
    #[serde(default)]
    pub header: HeaderDetect,
    #[serde(default)]
    pub columns: EstimateColumns,
    #[serde(default)]
    pub rate_columns: RateColumns,
}

impl ParseConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, ParseError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ParseError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if self.header.markers.is_empty() {
            return Err(ParseError::ConfigValidation(
                "header.markers must not be empty".into(),
            ));
        }
        if self.header.scan_limit == 0 {
            return Err(ParseError::ConfigValidation(
                "header.scan_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Header detection
// ---------------------------------------------------------------------------

/// Heuristic header locator. The first row within `scan_limit` containing
/// any cell whose lower-cased text contains one of `markers` is the
/// header; otherwise row 0 is assumed.
///
/// Kept as data so the detection rule is testable and swappable without
/// touching the parser.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderDetect {
    pub markers: Vec<String>,
    pub scan_limit: usize,
}

impl Default for HeaderDetect {
    fn default() -> Self {
        Self {
            markers: vec!["наименование".into(), "материал".into(), "код".into()],
            scan_limit: 10,
        }
    }
}

impl HeaderDetect {
    /// Index of the detected header row.
    pub fn detect(&self, table: &RowTable) -> usize {
        for (i, row) in table.rows.iter().take(self.scan_limit).enumerate() {
            for cell in row {
                let text = cell.text().to_lowercase();
                if !text.is_empty() && self.markers.iter().any(|m| text.contains(m.as_str())) {
                    return i;
                }
            }
        }
        0
    }
}

// ---------------------------------------------------------------------------
// Column layouts
// ---------------------------------------------------------------------------

/// The 6-column "materials + works" estimate shape.
#[derive(Debug, Clone, Deserialize)]
pub struct EstimateColumns {
    pub code: usize,
    pub name: usize,
    pub unit: usize,
    pub volume: usize,
    pub price_materials: usize,
    pub price_works: usize,
}

impl Default for EstimateColumns {
    fn default() -> Self {
        Self {
            code: 0,
            name: 1,
            unit: 2,
            volume: 3,
            price_materials: 4,
            price_works: 5,
        }
    }
}

/// The 3–4 column "single rate" shape used by rate-list imports.
/// `alt_price` is consulted when the primary price cell reads as zero.
#[derive(Debug, Clone, Deserialize)]
pub struct RateColumns {
    pub name: usize,
    pub unit: usize,
    pub price: usize,
    pub alt_price: Option<usize>,
}

impl Default for RateColumns {
    fn default() -> Self {
        Self {
            name: 0,
            unit: 1,
            price: 2,
            alt_price: Some(3),
        }
    }
}
