//! `communecheck-recon`: registry-vs-reference reconciliation engine.
//!
//! Pure engine crate: parses registry snapshots, computes missing codes per
//! reference source, and persists reports. No network dependencies.

pub mod config;
pub mod dated_log;
pub mod engine;
pub mod error;
pub mod model;
pub mod registry;
pub mod snapshot;
pub mod summary;

pub use config::{CheckConfig, QueryMethod, RunMode, SourceConfig};
pub use dated_log::{DatedLog, DayEntry};
pub use engine::{find_missing, report_key, to_missing_rows};
pub use error::ReconError;
pub use model::{AdminLevel, MatchField, MissingRow, ReferenceCodes, RegistryRecord};
pub use registry::{filter_level, parse_registry_csv};
pub use summary::{RunSummary, SourceStatus, SourceSummary};
