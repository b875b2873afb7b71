use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (duplicate source, unknown snapshot source, etc.).
    ConfigValidation(String),
    /// Registry CSV lacks a required header column.
    MissingColumn(String),
    /// Registry row could not be parsed.
    RegistryParse { line: u64, message: String },
    /// Existing dated log is not in the expected shape.
    LogParse(String),
    /// IO error (read log, delete old snapshot, write output).
    Io(String),
}

impl ReconError {
    /// True for errors caused by malformed input data rather than local IO.
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            Self::MissingColumn(_) | Self::RegistryParse { .. } | Self::LogParse(_)
        )
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn(column) => write!(f, "registry CSV: missing column '{column}'"),
            Self::RegistryParse { line, message } => {
                write!(f, "registry CSV line {line}: {message}")
            }
            Self::LogParse(msg) => write!(f, "dated log parse error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
