use crate::error::ReconError;
use crate::model::{registry_date, AdminLevel, RegistryRecord};

/// Header columns every registry snapshot must carry. Extra columns are ignored.
pub const REGISTRY_COLUMNS: [&str; 7] = [
    "HistoricalCode",
    "BfsCode",
    "Name",
    "ValidFrom",
    "Level",
    "Parent",
    "Inscription",
];

struct ColumnIndex {
    historical_code: usize,
    bfs_code: usize,
    name: usize,
    valid_from: usize,
    level: usize,
    parent: usize,
    inscription: usize,
}

/// Parse a registry snapshot CSV into typed records.
///
/// Empty numeric cells become `None`. `HistoricalCode` and `Level` are
/// required on every row.
pub fn parse_registry_csv(csv_data: &str) -> Result<Vec<RegistryRecord>, ReconError> {
    let csv_data = csv_data.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::RegistryParse {
            line: 1,
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, ReconError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReconError::MissingColumn(name.into()))
    };

    let cols = ColumnIndex {
        historical_code: idx("HistoricalCode")?,
        bfs_code: idx("BfsCode")?,
        name: idx("Name")?,
        valid_from: idx("ValidFrom")?,
        level: idx("Level")?,
        parent: idx("Parent")?,
        inscription: idx("Inscription")?,
    };

    let mut records = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| ReconError::RegistryParse {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let cell = |i: usize| record.get(i).unwrap_or("");

        let historical_code = required_int(cell(cols.historical_code), "HistoricalCode", line)?;
        let level = required_int(cell(cols.level), "Level", line)?;
        let level = u8::try_from(level).map_err(|_| ReconError::RegistryParse {
            line,
            message: format!("Level {level} out of range"),
        })?;

        let valid_from_raw = cell(cols.valid_from);
        let valid_from = if valid_from_raw.is_empty() {
            None
        } else {
            Some(registry_date::parse(valid_from_raw).ok_or_else(|| {
                ReconError::RegistryParse {
                    line,
                    message: format!("cannot parse ValidFrom '{valid_from_raw}'"),
                }
            })?)
        };

        records.push(RegistryRecord {
            historical_code,
            bfs_code: optional_int(cell(cols.bfs_code), "BfsCode", line)?,
            name: cell(cols.name).to_string(),
            valid_from,
            level,
            parent: optional_int(cell(cols.parent), "Parent", line)?,
            inscription: optional_int(cell(cols.inscription), "Inscription", line)?,
        });
    }

    Ok(records)
}

/// Keep only records of the given administrative level.
pub fn filter_level(records: Vec<RegistryRecord>, level: AdminLevel) -> Vec<RegistryRecord> {
    records.into_iter().filter(|r| r.is_level(level)).collect()
}

fn required_int(value: &str, column: &str, line: u64) -> Result<u32, ReconError> {
    optional_int(value, column, line)?.ok_or_else(|| ReconError::RegistryParse {
        line,
        message: format!("{column} is empty"),
    })
}

fn optional_int(value: &str, column: &str, line: u64) -> Result<Option<u32>, ReconError> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<u32>().map(Some).map_err(|_| ReconError::RegistryParse {
        line,
        message: format!("{column} '{value}' is not an integer"),
    })
}
