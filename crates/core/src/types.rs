use serde::{Deserialize, Serialize};

/// Whether a line item is a material position or a work position.
///
/// Classified from the code column of the source spreadsheet; the split
/// drives which price column applies and how pivot stats are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Material,
    Work,
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Material => write!(f, "material"),
            Self::Work => write!(f, "work"),
        }
    }
}

/// Which rate table a persisted rate belongs to.
///
/// Rates are unique on (scope, normalized name): the same material may
/// carry one approved price per object and a different one per
/// counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateScope {
    /// Customer-approved rates for a construction object.
    Object(i64),
    /// Rates agreed with a contractor or supplier.
    Counterparty(i64),
}

impl RateScope {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Counterparty(_) => "counterparty",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Object(id) | Self::Counterparty(id) => *id,
        }
    }
}

impl std::fmt::Display for RateScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}
