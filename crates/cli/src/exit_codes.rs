//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; schedulers rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, bad config)   |
//! | 3-9     | run              | Reconciliation outcome codes             |
//! | 50-59   | fetch            | Registry / reference source failures     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError` construction

use communecheck_recon::ReconError;
use communecheck_sources::FetchError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - report written, every source answered.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable or invalid config.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Run (3-9)
// =============================================================================

/// Some reference sources failed (log mode). Results of the others were written.
pub const EXIT_RUN_PARTIAL: u8 = 3;

/// Output could not be read or written (dated log, snapshot CSV).
pub const EXIT_RUN_OUTPUT_IO: u8 = 4;

// =============================================================================
// Fetch (50-59)
// =============================================================================

/// Upstream unreachable, non-success HTTP status, or timeout.
pub const EXIT_FETCH_UPSTREAM: u8 = 50;

/// Upstream answered with a body that could not be parsed.
pub const EXIT_FETCH_PARSE: u8 = 51;

/// Map a FetchError to its exit code.
pub fn fetch_exit_code(err: &FetchError) -> u8 {
    if err.is_network() {
        EXIT_FETCH_UPSTREAM
    } else {
        EXIT_FETCH_PARSE
    }
}

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_USAGE,
        ReconError::MissingColumn(_) | ReconError::RegistryParse { .. } => EXIT_FETCH_PARSE,
        ReconError::LogParse(_) | ReconError::Io(_) => EXIT_RUN_OUTPUT_IO,
    }
}
