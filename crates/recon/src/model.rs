use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Administrative tier of a registry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    Canton,
    District,
    Commune,
}

impl AdminLevel {
    /// Numeric `Level` column value used by the registry.
    pub fn code(&self) -> u8 {
        match self {
            Self::Canton => 1,
            Self::District => 2,
            Self::Commune => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Canton),
            2 => Some(Self::District),
            3 => Some(Self::Commune),
            _ => None,
        }
    }

    /// Plural label used in dated log keys (`lindas_missing_communes`).
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Canton => "cantons",
            Self::District => "districts",
            Self::Commune => "communes",
        }
    }
}

impl Default for AdminLevel {
    fn default() -> Self {
        Self::Commune
    }
}

impl std::fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Canton => write!(f, "canton"),
            Self::District => write!(f, "district"),
            Self::Commune => write!(f, "commune"),
        }
    }
}

/// One row of the official registry snapshot.
///
/// Field order is the CSV column order of snapshot reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegistryRecord {
    pub historical_code: u32,
    pub bfs_code: Option<u32>,
    pub name: String,
    #[serde(with = "registry_date")]
    pub valid_from: Option<NaiveDate>,
    pub level: u8,
    pub parent: Option<u32>,
    pub inscription: Option<u32>,
}

impl RegistryRecord {
    pub fn is_level(&self, level: AdminLevel) -> bool {
        self.level == level.code()
    }

    /// The code compared against a reference set.
    pub fn code_for(&self, field: MatchField) -> Option<u32> {
        match field {
            MatchField::HistoricalCode => Some(self.historical_code),
            MatchField::BfsCode => self.bfs_code,
        }
    }
}

/// Registry column a reference source's codes correspond to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    #[default]
    HistoricalCode,
    BfsCode,
}

// ---------------------------------------------------------------------------
// Reference
// ---------------------------------------------------------------------------

/// Codes a reference source recognized at query time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCodes {
    pub codes: BTreeSet<u32>,
    /// Raw identifiers that could not be coerced to a code.
    pub rejected: Vec<String>,
}

impl ReferenceCodes {
    pub fn contains(&self, code: u32) -> bool {
        self.codes.contains(&code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl FromIterator<u32> for ReferenceCodes {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().collect(),
            rejected: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Projection of a registry record written to the dated log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MissingRow {
    pub historical_code: u32,
    pub bfs_code: Option<u32>,
    #[serde(with = "registry_date", default)]
    pub valid_from: Option<NaiveDate>,
    pub name: String,
}

impl From<&RegistryRecord> for MissingRow {
    fn from(record: &RegistryRecord) -> Self {
        Self {
            historical_code: record.historical_code,
            bfs_code: record.bfs_code,
            valid_from: record.valid_from,
            name: record.name.clone(),
        }
    }
}

/// `DD.MM.YYYY` dates as written by the registry. ISO dates are accepted on input.
pub(crate) mod registry_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%d.%m.%Y";

    pub fn parse(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        NaiveDate::parse_from_str(value, FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
            .ok()
    }

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{s}'"))),
        }
    }
}
