use crate::session::EvalError;
use rustyline::error::ReadlineError;
use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum CliError {
    IoError(io::Error),
    ConfigError(String),
    SessionError(EvalError),
    ReadlineError(ReadlineError),
    /// Already reported to the user; only the exit status is left.
    Reported,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::IoError(e) => write!(f, "File I/O error: {}", e),
            CliError::ConfigError(e) => write!(f, "Configuration error: {}", e),
            CliError::SessionError(e) => write!(f, "{}", e),
            CliError::ReadlineError(e) => write!(f, "Line editor error: {}", e),
            CliError::Reported => write!(f, "evaluation failed"),
        }
    }
}

impl Error for CliError {}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::IoError(err)
    }
}

impl From<EvalError> for CliError {
    fn from(err: EvalError) -> Self {
        CliError::SessionError(err)
    }
}

impl From<ReadlineError> for CliError {
    fn from(err: ReadlineError) -> Self {
        CliError::ReadlineError(err)
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::ConfigError(err.to_string())
    }
}
