//! Dated CSV snapshot reports (`<YYYY-MM-DD>_missing.csv`).
//!
//! Only the latest snapshot is kept: older `*_missing.csv` files in the
//! output directory are removed before the new one is written. An empty
//! result is written as a sentinel line, never as a header-only CSV.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::ReconError;
use crate::model::RegistryRecord;

pub const SNAPSHOT_SUFFIX: &str = "_missing.csv";
pub const NO_MISSING_SENTINEL: &str = "No missing rows found.\n";

pub fn snapshot_file_name(date: NaiveDate) -> String {
    format!("{}{SNAPSHOT_SUFFIX}", date.format("%Y-%m-%d"))
}

/// Delete every `*_missing.csv` in `dir`. Returns the removed paths.
pub fn remove_old_snapshots(dir: &Path) -> Result<Vec<PathBuf>, ReconError> {
    let pattern = format!(
        "{}/*{SNAPSHOT_SUFFIX}",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let entries = glob::glob(&pattern).map_err(|e| ReconError::Io(e.to_string()))?;

    let mut removed = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ReconError::Io(e.to_string()))?;
        if !path.is_file() {
            continue;
        }
        std::fs::remove_file(&path)
            .map_err(|e| ReconError::Io(format!("cannot remove {}: {e}", path.display())))?;
        log::debug!("removed old snapshot {}", path.display());
        removed.push(path);
    }
    Ok(removed)
}

/// Replace the snapshot in `dir` with today's. `missing` must already be
/// sorted by `HistoricalCode`.
pub fn write_snapshot(
    dir: &Path,
    date: NaiveDate,
    missing: &[&RegistryRecord],
) -> Result<PathBuf, ReconError> {
    remove_old_snapshots(dir)?;

    let path = dir.join(snapshot_file_name(date));

    if missing.is_empty() {
        std::fs::write(&path, NO_MISSING_SENTINEL)
            .map_err(|e| ReconError::Io(format!("cannot write {}: {e}", path.display())))?;
        return Ok(path);
    }

    let file = std::fs::File::create(&path)
        .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", path.display())))?;
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(std::io::BufWriter::new(file));

    for record in missing {
        writer
            .serialize(record)
            .map_err(|e| ReconError::Io(format!("CSV write error: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| ReconError::Io(format!("CSV flush error: {e}")))?;

    Ok(path)
}
