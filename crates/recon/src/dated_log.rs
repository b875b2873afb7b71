//! Accumulating dated log (`data.json`).
//!
//! The log is an explicit value: callers `load` it, `merge_day` the fresh
//! reports into it and `save` it. Dates serialize newest first.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::ReconError;
use crate::model::MissingRow;

/// One day's reports, keyed `<source>_missing_<kind>`.
pub type DayEntry = BTreeMap<String, Vec<MissingRow>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatedLog {
    entries: BTreeMap<NaiveDate, DayEntry>,
}

impl DatedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the log at `path`. A missing file is an empty log.
    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no dated log at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(ReconError::Io(format!("cannot read {}: {e}", path.display())));
            }
        };
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ReconError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let raw: BTreeMap<String, DayEntry> =
            serde_json::from_str(text).map_err(|e| ReconError::LogParse(e.to_string()))?;

        let mut entries = BTreeMap::new();
        for (key, entry) in raw {
            let date = NaiveDate::parse_from_str(&key, "%Y-%m-%d")
                .map_err(|_| ReconError::LogParse(format!("invalid date key '{key}'")))?;
            entries.insert(date, entry);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DayEntry> {
        self.entries.get(&date)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dates newest first, the order they are written in.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.entries.keys().rev().copied().collect()
    }

    /// Replace the entry for `date`.
    pub fn insert(&mut self, date: NaiveDate, entry: DayEntry) {
        self.entries.insert(date, entry);
    }

    /// Build the entry for `date` from fresh reports.
    ///
    /// Keys in `failed` had no fresh data this run; if the existing entry for
    /// `date` holds a value under such a key it is carried over. Every other
    /// key of the old entry is dropped. Returns `false` (and leaves the log
    /// unchanged) when the resulting entry would be empty.
    pub fn merge_day(&mut self, date: NaiveDate, fresh: DayEntry, failed: &[String]) -> bool {
        let mut entry = fresh;
        if let Some(previous) = self.entries.get(&date) {
            for key in failed {
                if let Some(rows) = previous.get(key) {
                    log::warn!("keeping earlier {key} result for {date}");
                    entry.insert(key.clone(), rows.clone());
                }
            }
        }
        if entry.is_empty() {
            return false;
        }
        self.entries.insert(date, entry);
        true
    }

    pub fn to_json_pretty(&self) -> Result<String, ReconError> {
        let mut text = serde_json::to_string_pretty(self)
            .map_err(|e| ReconError::Io(format!("cannot serialize dated log: {e}")))?;
        text.push('\n');
        Ok(text)
    }

    /// Rewrite the whole log at `path`.
    pub fn save(&self, path: &Path) -> Result<(), ReconError> {
        let text = self.to_json_pretty()?;
        std::fs::write(path, text)
            .map_err(|e| ReconError::Io(format!("cannot write {}: {e}", path.display())))
    }
}

impl Serialize for DatedLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (date, entry) in self.entries.iter().rev() {
            map.serialize_entry(&date.format("%Y-%m-%d").to_string(), entry)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    fn row(code: u32) -> MissingRow {
        MissingRow {
            historical_code: code,
            bfs_code: None,
            valid_from: None,
            name: format!("Gemeinde {code}"),
        }
    }

    fn entry(key: &str, codes: &[u32]) -> DayEntry {
        let mut e = DayEntry::new();
        e.insert(key.into(), codes.iter().map(|c| row(*c)).collect());
        e
    }

    fn top_level_keys(json: &str) -> Vec<String> {
        // Key order as written, not as parsed into a sorted map.
        json.lines()
            .filter(|l| l.starts_with("  \"") && l.ends_with('{'))
            .map(|l| l.trim().split('"').nth(1).unwrap().to_string())
            .collect()
    }

    #[test]
    fn dates_written_newest_first() {
        let mut log = DatedLog::new();
        log.insert(day(1), entry("lindas_missing_communes", &[1]));
        log.insert(day(3), entry("lindas_missing_communes", &[1]));
        log.insert(day(2), entry("lindas_missing_communes", &[1]));

        let json = log.to_json_pretty().unwrap();
        assert_eq!(top_level_keys(&json), vec!["2025-08-03", "2025-08-02", "2025-08-01"]);
        assert_eq!(log.dates(), vec![day(3), day(2), day(1)]);
    }

    #[test]
    fn same_day_merge_is_idempotent() {
        let mut log = DatedLog::new();
        log.merge_day(day(3), entry("lindas_missing_communes", &[262]), &[]);
        let once = log.clone();
        log.merge_day(day(3), entry("lindas_missing_communes", &[262]), &[]);
        assert_eq!(log, once);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn same_day_merge_replaces_entry() {
        let mut log = DatedLog::new();
        log.merge_day(day(3), entry("lindas_missing_communes", &[262, 263]), &[]);
        log.merge_day(day(3), entry("lindas_missing_communes", &[262]), &[]);
        let rows = &log.get(day(3)).unwrap()["lindas_missing_communes"];
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn failed_source_keeps_earlier_same_day_value() {
        let mut log = DatedLog::new();
        let mut first = entry("lindas_missing_communes", &[262]);
        first.insert("wikidata_missing_communes".into(), vec![row(500)]);
        log.merge_day(day(3), first, &[]);

        let failed = vec!["wikidata_missing_communes".to_string()];
        log.merge_day(day(3), entry("lindas_missing_communes", &[]), &failed);

        let today = log.get(day(3)).unwrap();
        assert!(today["lindas_missing_communes"].is_empty());
        assert_eq!(today["wikidata_missing_communes"], vec![row(500)]);
    }

    #[test]
    fn nothing_to_write_leaves_log_unchanged() {
        let mut log = DatedLog::new();
        log.insert(day(1), entry("lindas_missing_communes", &[1]));
        let before = log.clone();
        let failed = vec!["lindas_missing_communes".to_string()];
        assert!(!log.merge_day(day(3), DayEntry::new(), &failed));
        assert_eq!(log, before);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = DatedLog::load(&dir.path().join("data.json")).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn save_then_load_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        let mut log = DatedLog::new();
        log.insert(day(1), entry("lindas_missing_communes", &[1]));
        log.insert(day(2), entry("wikidata_missing_communes", &[]));
        log.save(&path).unwrap();

        let loaded = DatedLog::load(&path).unwrap();
        assert_eq!(loaded, log);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"BfsCode\": null"));
        assert!(!text.contains("NaN"));
    }

    #[test]
    fn invalid_date_key_rejected() {
        let err = DatedLog::from_json(r#"{"yesterday": {}}"#).unwrap_err();
        assert!(matches!(err, ReconError::LogParse(_)));
    }

    #[test]
    fn malformed_log_rejected() {
        let err = DatedLog::from_json("[1, 2, 3]").unwrap_err();
        assert!(err.is_parse());
    }
}
