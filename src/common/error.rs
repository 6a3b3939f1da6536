//! Error types for the tiobench harness
//!
//! Every variant is a scenario failure. Nothing here is recovered locally;
//! the scenario runner attaches the captured driver output when it reports
//! one of these.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid value '{value}' for {name}: expected a non-negative integer")]
    InvalidCount { name: String, value: String },

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Preflight Errors ===
    #[error("Executable '{path}' not usable: {reason}")]
    Preflight { path: String, reason: String },

    // === Process Errors ===
    #[error("Failed to start '{path}': {reason}")]
    SpawnFailed { path: String, reason: String },

    #[error("Driver exited with status {}", fmt_exit_code(.0))]
    DriverFailed(Option<i32>),

    // === Report Errors ===
    #[error("Benchmark report did not match: {0}")]
    Parse(String),

    // === Protocol Errors ===
    #[error("Failed to connect to {uri}: {source}")]
    Connection {
        uri: String,
        #[source]
        source: io::Error,
    },

    #[error("Container '{0}' not found: {1}")]
    NotFound(String, String),

    #[error("Tio protocol error: {0}")]
    Protocol(String),

    #[error("Server closed the connection")]
    ConnectionClosed,

    // === Verification Errors ===
    #[error("Assertion failed: {0}")]
    Assertion(String),

    // === Timeout Errors ===
    #[error("{what} timed out after {secs} seconds")]
    Timeout { what: String, secs: u64 },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn fmt_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "<killed by signal>".to_string(),
    }
}

impl Error {
    /// Create a preflight error for an executable
    pub fn preflight(path: &str, reason: &str) -> Self {
        Self::Preflight {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a spawn failure error
    pub fn spawn_failed(path: &str, reason: impl std::fmt::Display) -> Self {
        Self::SpawnFailed {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a timeout error
    pub fn timeout(what: &str, secs: u64) -> Self {
        Self::Timeout {
            what: what.to_string(),
            secs,
        }
    }

    /// Short category name, used in scenario summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_)
            | Error::InvalidCount { .. }
            | Error::ConfigParse(_)
            | Error::FileRead { .. } => "ConfigurationError",
            Error::Preflight { .. } => "PreflightError",
            Error::SpawnFailed { .. } | Error::DriverFailed(_) => "ProcessError",
            Error::Parse(_) => "ParseError",
            Error::Connection { .. } | Error::ConnectionClosed => "ConnectionError",
            Error::NotFound(..) => "NotFoundError",
            Error::Protocol(_) => "ProtocolError",
            Error::Assertion(_) => "AssertionError",
            Error::Timeout { .. } => "TimeoutError",
            Error::Io(_) => "IoError",
        }
    }
}
