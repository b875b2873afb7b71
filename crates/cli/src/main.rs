// communecheck - find Swiss communes missing from reference datasets
// One run per invocation; schedule it with cron or a CI timer.

mod exit_codes;
mod logging;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

use communecheck_recon::{CheckConfig, ReconError, RunMode, RunSummary};
use communecheck_sources::FetchError;

use exit_codes::{
    fetch_exit_code, recon_exit_code, EXIT_ERROR, EXIT_RUN_PARTIAL, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "communecheck")]
#[command(about = "Compare the BFS commune registry against LINDAS and Wikidata")]
#[command(long_version = long_version())]
#[command(version)]
#[command(after_help = "\
Examples:
  communecheck
  communecheck --mode log --out-dir reports
  communecheck --config check.toml --date 2025-08-01
  communecheck --mode log --json --quiet | jq .sources

Exit codes:
  0   success
  2   bad arguments or config
  3   some reference sources failed (log mode)
  4   output could not be read or written
  50  upstream unreachable or returned an error status
  51  upstream response could not be parsed")]
struct Cli {
    /// TOML config file (endpoints, queries, output settings)
    #[arg(long, env = "COMMUNECHECK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output mode: dated CSV snapshot or cumulative JSON log
    #[arg(long)]
    mode: Option<ModeArg>,

    /// Directory for the snapshot CSV or the JSON log
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Registry date to check (default: today, UTC)
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Only log warnings and errors
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Snapshot,
    Log,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Snapshot => RunMode::Snapshot,
            ModeArg::Log => RunMode::Log,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  communecheck-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  communecheck-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.quiet);

    match cmd_check(cli) {
        Ok(code) => ExitCode::from(code),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// check
// ============================================================================

fn cmd_check(cli: Cli) -> Result<u8, CliError> {
    let config = load_config(&cli)?;
    let date = cli.date.unwrap_or_else(|| chrono::Utc::now().date_naive());

    log::info!("{} run for {} ({})", config.mode, date, config.level);
    let summary = run::run_from_config(&config, date)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot encode summary: {e}")))?;
        println!("{}", json);
    }

    Ok(outcome_code(&summary))
}

fn load_config(cli: &Cli) -> Result<CheckConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                CliError::args(format!("cannot read config {}: {}", path.display(), e))
            })?;
            CheckConfig::from_toml(&text).map_err(|e| {
                CliError::recon(e).with_hint(format!("check {}", path.display()))
            })?
        }
        None => CheckConfig::default(),
    };

    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }
    if let Some(dir) = &cli.out_dir {
        config.output_dir = dir.clone();
    }

    // Overrides can invalidate a file that passed on its own (e.g. --mode snapshot).
    config.validate().map_err(CliError::recon)?;
    Ok(config)
}

fn outcome_code(summary: &RunSummary) -> u8 {
    let failed = summary.failed_sources();
    if failed.is_empty() {
        EXIT_SUCCESS
    } else {
        log::warn!("sources failed: {}", failed.join(", "));
        EXIT_RUN_PARTIAL
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Create error from a fetch failure with proper exit code.
    pub fn fetch(err: FetchError) -> Self {
        let code = fetch_exit_code(&err);
        let hint = match &err {
            FetchError::Timeout(_) => Some("raise timeout_secs in the config".to_string()),
            FetchError::Network(_) => Some("check network access to the endpoint".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn recon(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::LogParse(_) => {
                Some("fix or move the log file; it is never overwritten when unreadable".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
