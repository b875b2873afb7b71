use chrono::NaiveDate;
use serde::Serialize;

use crate::config::RunMode;
use crate::model::AdminLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    Failed,
}

/// Per-source outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub status: SourceStatus,
    pub reference_codes: usize,
    pub rejected_identifiers: usize,
    pub missing: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceSummary {
    pub fn ok(name: &str, reference_codes: usize, rejected_identifiers: usize, missing: usize) -> Self {
        Self {
            name: name.into(),
            status: SourceStatus::Ok,
            reference_codes,
            rejected_identifiers,
            missing,
            error: None,
        }
    }

    pub fn failed(name: &str, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: SourceStatus::Failed,
            reference_codes: 0,
            rejected_identifiers: 0,
            missing: 0,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub date: NaiveDate,
    pub mode: RunMode,
    pub level: AdminLevel,
    pub registry_records: usize,
    pub sources: Vec<SourceSummary>,
    /// File written, `None` when nothing was written.
    pub output: Option<String>,
    pub engine_version: String,
}

impl RunSummary {
    pub fn new(date: NaiveDate, mode: RunMode, level: AdminLevel, registry_records: usize) -> Self {
        Self {
            date,
            mode,
            level,
            registry_records,
            sources: Vec::new(),
            output: None,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn failed_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| s.status == SourceStatus::Failed)
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn total_missing(&self) -> usize {
        self.sources.iter().map(|s| s.missing).sum()
    }
}
