//! One reconciliation pass: fetch registry → fetch references → compare → persist.

use std::time::Duration;

use chrono::NaiveDate;

use communecheck_recon::snapshot::write_snapshot;
use communecheck_recon::{
    find_missing, report_key, to_missing_rows, CheckConfig, DatedLog, DayEntry, RegistryRecord,
    RunMode, RunSummary, SourceSummary,
};
use communecheck_sources::{ReferenceSource, RegistryFetcher, RegistrySource, SparqlSource};

use crate::CliError;

/// Build the fetchers named by `config` and run one pass for `date`.
pub fn run_from_config(config: &CheckConfig, date: NaiveDate) -> Result<RunSummary, CliError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let registry = RegistryFetcher::new(&config.registry.url, timeout).map_err(CliError::fetch)?;

    let source_configs = match config.mode {
        RunMode::Snapshot => config.snapshot_source().into_iter().cloned().collect(),
        RunMode::Log => config.sources.clone(),
    };
    let mut sources: Vec<Box<dyn ReferenceSource>> = Vec::new();
    for source_config in source_configs {
        sources.push(Box::new(
            SparqlSource::new(source_config, timeout).map_err(CliError::fetch)?,
        ));
    }

    run_check(config, date, &registry, &sources)
}

pub fn run_check(
    config: &CheckConfig,
    date: NaiveDate,
    registry: &dyn RegistrySource,
    sources: &[Box<dyn ReferenceSource>],
) -> Result<RunSummary, CliError> {
    let records = registry.fetch(date, config.level).map_err(CliError::fetch)?;
    let mut summary = RunSummary::new(date, config.mode, config.level, records.len());

    match config.mode {
        RunMode::Snapshot => run_snapshot(config, &records, sources, &mut summary)?,
        RunMode::Log => run_log(config, &records, sources, &mut summary)?,
    }

    log::info!(
        "{} registry records, {} missing across {} source(s)",
        summary.registry_records,
        summary.total_missing(),
        summary.sources.len(),
    );
    Ok(summary)
}

/// Any failure aborts before the output directory is touched.
fn run_snapshot(
    config: &CheckConfig,
    records: &[RegistryRecord],
    sources: &[Box<dyn ReferenceSource>],
    summary: &mut RunSummary,
) -> Result<(), CliError> {
    let source = sources
        .iter()
        .find(|s| s.name() == config.snapshot_source)
        .ok_or_else(|| {
            CliError::args(format!(
                "snapshot source '{}' is not configured",
                config.snapshot_source
            ))
        })?;

    let codes = source.fetch().map_err(CliError::fetch)?;
    let missing = find_missing(records, &codes, source.match_on());
    log::info!("{} missing from {}", missing.len(), source.name());

    let path = write_snapshot(&config.output_dir, summary.date, &missing).map_err(CliError::recon)?;
    log::info!("wrote {}", path.display());

    summary.sources.push(SourceSummary::ok(
        source.name(),
        codes.len(),
        codes.rejected.len(),
        missing.len(),
    ));
    summary.output = Some(path.display().to_string());
    Ok(())
}

/// Reference failures are isolated per source; registry and file errors are fatal.
fn run_log(
    config: &CheckConfig,
    records: &[RegistryRecord],
    sources: &[Box<dyn ReferenceSource>],
    summary: &mut RunSummary,
) -> Result<(), CliError> {
    let path = config.log_path();
    let mut dated_log = DatedLog::load(&path).map_err(CliError::recon)?;

    let mut entry = DayEntry::new();
    let mut failed = Vec::new();

    for source in sources {
        let key = report_key(source.name(), config.level);
        match source.fetch() {
            Ok(codes) => {
                let missing = find_missing(records, &codes, source.match_on());
                log::info!("{} missing from {}", missing.len(), source.name());
                summary.sources.push(SourceSummary::ok(
                    source.name(),
                    codes.len(),
                    codes.rejected.len(),
                    missing.len(),
                ));
                entry.insert(key, to_missing_rows(&missing));
            }
            Err(e) => {
                log::error!("{} failed: {}", source.name(), e);
                summary.sources.push(SourceSummary::failed(source.name(), e.to_string()));
                failed.push(key);
            }
        }
    }

    if dated_log.merge_day(summary.date, entry, &failed) {
        dated_log.save(&path).map_err(CliError::recon)?;
        log::info!("wrote {} ({} dates)", path.display(), dated_log.len());
        summary.output = Some(path.display().to_string());
    } else {
        log::warn!("no source produced a result, {} left unchanged", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use communecheck_recon::snapshot::NO_MISSING_SENTINEL;
    use communecheck_recon::{AdminLevel, MatchField, ReferenceCodes, SourceStatus};
    use communecheck_sources::FetchError;

    use crate::exit_codes;

    // ── Fakes ───────────────────────────────────────────────────────

    struct FakeRegistry {
        records: Vec<RegistryRecord>,
        fail: bool,
    }

    impl RegistrySource for FakeRegistry {
        fn fetch(&self, _date: NaiveDate, level: AdminLevel) -> Result<Vec<RegistryRecord>, FetchError> {
            if self.fail {
                return Err(FetchError::Http(503, "registry returned 503".into()));
            }
            Ok(communecheck_recon::filter_level(self.records.clone(), level))
        }
    }

    struct FakeSource {
        name: &'static str,
        codes: Option<Vec<u32>>,
    }

    impl ReferenceSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        fn fetch(&self) -> Result<ReferenceCodes, FetchError> {
            match &self.codes {
                Some(codes) => Ok(codes.iter().copied().collect()),
                None => Err(FetchError::Http(500, format!("{} returned 500", self.name))),
            }
        }
    }

    fn record(code: u32, level: u8) -> RegistryRecord {
        RegistryRecord {
            historical_code: code,
            bfs_code: Some(code),
            name: format!("Gemeinde {code}"),
            valid_from: None,
            level,
            parent: None,
            inscription: None,
        }
    }

    fn registry() -> FakeRegistry {
        FakeRegistry {
            records: vec![record(261, 3), record(262, 3), record(263, 3), record(999, 1)],
            fail: false,
        }
    }

    fn source(name: &'static str, codes: Option<Vec<u32>>) -> Box<dyn ReferenceSource> {
        Box::new(FakeSource { name, codes })
    }

    fn config(mode: RunMode, dir: &std::path::Path) -> CheckConfig {
        CheckConfig {
            mode,
            output_dir: dir.to_path_buf(),
            ..CheckConfig::default()
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    fn read_log(dir: &std::path::Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(dir.join("data.json")).unwrap()).unwrap()
    }

    // ── Snapshot mode ───────────────────────────────────────────────

    #[test]
    fn snapshot_reports_missing_commune() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![source("lindas", Some(vec![261, 263]))];

        let summary = run_check(&config(RunMode::Snapshot, dir.path()), day(3), &registry(), &sources).unwrap();

        assert_eq!(summary.registry_records, 3);
        assert_eq!(summary.sources[0].missing, 1);
        let content = std::fs::read_to_string(dir.path().join("2025-08-03_missing.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("262,262,Gemeinde 262,"));
    }

    #[test]
    fn snapshot_sentinel_when_nothing_missing() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![source("lindas", Some(vec![261, 262, 263]))];

        run_check(&config(RunMode::Snapshot, dir.path()), day(3), &registry(), &sources).unwrap();

        let content = std::fs::read_to_string(dir.path().join("2025-08-03_missing.csv")).unwrap();
        assert_eq!(content, NO_MISSING_SENTINEL);
    }

    #[test]
    fn snapshot_source_failure_leaves_directory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("2025-08-02_missing.csv");
        std::fs::write(&old, "previous").unwrap();
        let sources = vec![source("lindas", None)];

        let err = run_check(&config(RunMode::Snapshot, dir.path()), day(3), &registry(), &sources).unwrap_err();

        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert_eq!(std::fs::read_to_string(&old).unwrap(), "previous");
        assert!(!dir.path().join("2025-08-03_missing.csv").exists());
    }

    #[test]
    fn snapshot_registry_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let failing = FakeRegistry { records: Vec::new(), fail: true };
        let sources = vec![source("lindas", Some(vec![]))];

        let err = run_check(&config(RunMode::Snapshot, dir.path()), day(3), &failing, &sources).unwrap_err();

        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    // ── Log mode ────────────────────────────────────────────────────

    #[test]
    fn log_records_every_source() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![
            source("lindas", Some(vec![261, 263])),
            source("wikidata", Some(vec![261, 262, 263])),
        ];

        let summary = run_check(&config(RunMode::Log, dir.path()), day(3), &registry(), &sources).unwrap();

        assert!(summary.failed_sources().is_empty());
        let log = read_log(dir.path());
        let today = &log["2025-08-03"];
        assert_eq!(today["lindas_missing_communes"][0]["HistoricalCode"], 262);
        assert_eq!(today["wikidata_missing_communes"], serde_json::json!([]));
    }

    #[test]
    fn log_isolates_failed_source() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![
            source("lindas", None),
            source("wikidata", Some(vec![261, 263])),
        ];

        let summary = run_check(&config(RunMode::Log, dir.path()), day(3), &registry(), &sources).unwrap();

        assert_eq!(summary.failed_sources(), vec!["lindas"]);
        assert_eq!(summary.sources[0].status, SourceStatus::Failed);
        let log = read_log(dir.path());
        let today = log["2025-08-03"].as_object().unwrap();
        assert!(!today.contains_key("lindas_missing_communes"));
        assert_eq!(today["wikidata_missing_communes"][0]["HistoricalCode"], 262);
    }

    #[test]
    fn log_rerun_keeps_earlier_result_of_failed_source() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(RunMode::Log, dir.path());

        let healthy = vec![
            source("lindas", Some(vec![261])),
            source("wikidata", Some(vec![261, 262, 263])),
        ];
        run_check(&cfg, day(3), &registry(), &healthy).unwrap();

        let degraded = vec![
            source("lindas", None),
            source("wikidata", Some(vec![261, 263])),
        ];
        run_check(&cfg, day(3), &registry(), &degraded).unwrap();

        let log = read_log(dir.path());
        let today = &log["2025-08-03"];
        assert_eq!(today["lindas_missing_communes"].as_array().unwrap().len(), 2);
        assert_eq!(today["wikidata_missing_communes"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn log_all_sources_failed_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![source("lindas", None), source("wikidata", None)];

        let summary = run_check(&config(RunMode::Log, dir.path()), day(3), &registry(), &sources).unwrap();

        assert_eq!(summary.failed_sources().len(), 2);
        assert!(summary.output.is_none());
        assert!(!dir.path().join("data.json").exists());
    }

    #[test]
    fn log_same_day_rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(RunMode::Log, dir.path());
        let sources = vec![source("lindas", Some(vec![261, 263]))];

        run_check(&cfg, day(3), &registry(), &sources).unwrap();
        let first = std::fs::read_to_string(dir.path().join("data.json")).unwrap();
        run_check(&cfg, day(3), &registry(), &sources).unwrap();
        let second = std::fs::read_to_string(dir.path().join("data.json")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn log_corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.json"), "not json").unwrap();
        let sources = vec![source("lindas", Some(vec![]))];

        let err = run_check(&config(RunMode::Log, dir.path()), day(3), &registry(), &sources).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_RUN_OUTPUT_IO);
    }

    #[test]
    fn bfs_match_uses_bfs_code() {
        struct BfsSource;
        impl ReferenceSource for BfsSource {
            fn name(&self) -> &str {
                "wikidata"
            }
            fn match_on(&self) -> MatchField {
                MatchField::BfsCode
            }
            fn fetch(&self) -> Result<ReferenceCodes, FetchError> {
                Ok([261u32, 262].into_iter().collect())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let sources: Vec<Box<dyn ReferenceSource>> = vec![Box::new(BfsSource)];
        let summary = run_check(&config(RunMode::Log, dir.path()), day(3), &registry(), &sources).unwrap();
        assert_eq!(summary.sources[0].missing, 1);
    }
}
