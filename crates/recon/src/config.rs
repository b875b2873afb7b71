use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{AdminLevel, MatchField};

pub const REGISTRY_URL: &str = "https://www.agvchapp.bfs.admin.ch/api/communes/snapshot";
pub const LINDAS_ENDPOINT: &str = "https://ld.admin.ch/query";
pub const WIKIDATA_ENDPOINT: &str = "https://query.wikidata.org/sparql";

pub const LINDAS_QUERY: &str = "\
PREFIX schema: <http://schema.org/>
PREFIX vl: <https://version.link/>
SELECT ?identifier WHERE {
  ?version a vl:Version;
           vl:inVersionedIdentitySet <https://ld.admin.ch/fso/register>;
           schema:identifier ?identifier.
}
";

pub const WIKIDATA_QUERY: &str = "\
PREFIX wdt: <http://www.wikidata.org/prop/direct/>
SELECT ?item ?identifier WHERE {
  ?item wdt:P771 ?identifier.
}
";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default)]
    pub level: AdminLevel,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_snapshot_source")]
    pub snapshot_source: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

/// Reporting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One dated CSV per run, older snapshots removed.
    #[default]
    Snapshot,
    /// Accumulating dated JSON log.
    Log,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snapshot => write!(f, "snapshot"),
            Self::Log => write!(f, "log"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    pub url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: REGISTRY_URL.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reference sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub name: String,
    pub endpoint: String,
    pub query: String,
    /// Result variable holding the code.
    #[serde(default = "default_variable")]
    pub variable: String,
    #[serde(default)]
    pub method: QueryMethod,
    #[serde(default)]
    pub match_on: MatchField,
}

/// How the SPARQL query is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMethod {
    /// `GET ?query=...`
    #[default]
    Get,
    /// `POST` with an urlencoded form body.
    Post,
}

impl SourceConfig {
    pub fn lindas() -> Self {
        Self {
            name: "lindas".into(),
            endpoint: LINDAS_ENDPOINT.into(),
            query: LINDAS_QUERY.into(),
            variable: default_variable(),
            method: QueryMethod::Get,
            match_on: MatchField::HistoricalCode,
        }
    }

    pub fn wikidata() -> Self {
        Self {
            name: "wikidata".into(),
            endpoint: WIKIDATA_ENDPOINT.into(),
            query: WIKIDATA_QUERY.into(),
            variable: default_variable(),
            method: QueryMethod::Get,
            match_on: MatchField::HistoricalCode,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_snapshot_source() -> String {
    "lindas".into()
}

fn default_log_file() -> String {
    "data.json".into()
}

fn default_variable() -> String {
    "identifier".into()
}

fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig::lindas(), SourceConfig::wikidata()]
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            level: AdminLevel::default(),
            output_dir: default_output_dir(),
            timeout_secs: default_timeout_secs(),
            snapshot_source: default_snapshot_source(),
            log_file: default_log_file(),
            registry: RegistryConfig::default(),
            sources: default_sources(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl CheckConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: CheckConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.timeout_secs == 0 {
            return Err(ReconError::ConfigValidation(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.registry.url.trim().is_empty() {
            return Err(ReconError::ConfigValidation("registry.url is empty".into()));
        }

        if self.log_file.trim().is_empty() {
            return Err(ReconError::ConfigValidation("log_file is empty".into()));
        }

        if self.sources.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one reference source is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            let valid_name = !source.name.is_empty()
                && source
                    .name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
            if !valid_name {
                return Err(ReconError::ConfigValidation(format!(
                    "source name '{}' must be non-empty and use only [a-z0-9_]",
                    source.name
                )));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate source '{}'",
                    source.name
                )));
            }
            if source.endpoint.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': endpoint is empty",
                    source.name
                )));
            }
            if source.query.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': query is empty",
                    source.name
                )));
            }
            if source.variable.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': variable is empty",
                    source.name
                )));
            }
        }

        if self.mode == RunMode::Snapshot && self.snapshot_source().is_none() {
            return Err(ReconError::ConfigValidation(format!(
                "snapshot_source '{}' is not a configured source",
                self.snapshot_source
            )));
        }

        Ok(())
    }

    /// Source compared in snapshot mode.
    pub fn snapshot_source(&self) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == self.snapshot_source)
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir.join(&self.log_file)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
