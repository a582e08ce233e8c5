//! Error types for edc-stream.
//!
//! Errors follow the thiserror pattern and split into two groups: failures
//! that end a session (connection, configuration, I/O at startup) and
//! per-record failures (malformed records, sink writes) that are logged and
//! skipped without stopping the stream.

use std::path::PathBuf;

use thiserror::Error;

/// Maximum number of characters of raw record text shown in error messages.
const PREVIEW_CHARS: usize = 120;

/// Primary error type for edc-stream operations.
#[derive(Error, Debug)]
pub enum EdcError {
    /// Transport-level failure while opening or reading the stream.
    #[error("Connection failed: {message}")]
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying HTTP client error, if available.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The stream endpoint answered with a non-success status.
    #[error("Stream endpoint {url} returned HTTP {status}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Endpoint that was requested.
        url: String,
    },

    /// A completed record could not be decoded.
    #[error("Malformed record: {message} ({})", preview(.raw))]
    MalformedRecord {
        /// Human-readable error message.
        message: String,
        /// The raw record text, kept for manual replay.
        raw: String,
    },

    /// A decoded record could not be stored.
    #[error("Activity not written ({id}): {message}")]
    SinkWrite {
        /// Identifier of the record, or a raw-text preview when unknown.
        id: String,
        /// Human-readable error message.
        message: String,
        /// Underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration file could not be found or is missing required fields.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Human-readable error message.
        message: String,
    },

    /// Configuration file could not be parsed.
    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig {
        /// Path of the configuration file.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {context}")]
    IoError {
        /// Context describing the operation that failed.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Database error outside of a single record write (open, schema).
    #[error("Database error: {context}")]
    Database {
        /// Context describing the operation that failed.
        context: String,
        /// Underlying rusqlite error.
        #[source]
        source: rusqlite::Error,
    },

    /// No data (not even a heartbeat) arrived within the idle timeout.
    #[error("Stream idle for {duration_ms}ms")]
    Timeout {
        /// Idle timeout in milliseconds.
        duration_ms: u64,
    },

    /// The session was cancelled.
    #[error("Operation interrupted")]
    Interrupted,

    /// A background task panicked or was aborted.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl EdcError {
    /// Create a new connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new connection error with the underlying HTTP error.
    #[must_use]
    pub fn connection_with_source(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a new malformed record error.
    #[must_use]
    pub fn malformed(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Create a new sink write error.
    #[must_use]
    pub fn sink(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            id: id.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a new sink write error with source.
    #[must_use]
    pub fn sink_with_source(
        id: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SinkWrite {
            id: id.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a new I/O error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoError {
            context: context.into(),
            source,
        }
    }

    /// Create a new database error with context.
    #[must_use]
    pub fn database(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Database {
            context: context.into(),
            source,
        }
    }

    /// Get the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::MalformedRecord { .. } => exit_codes::EXIT_DATA_ERROR,
            Self::ConfigError { .. } | Self::InvalidConfig { .. } => exit_codes::EXIT_CONFIG_ERROR,
            Self::Connection { .. } | Self::HttpStatus { .. } | Self::Timeout { .. } => {
                exit_codes::EXIT_UNAVAILABLE
            }
            Self::IoError { .. } | Self::SinkWrite { .. } => exit_codes::EXIT_IO_ERROR,
            Self::Interrupted => exit_codes::EXIT_INTERRUPTED,
            Self::Database { .. } | Self::Internal { .. } => exit_codes::EXIT_GENERAL_ERROR,
        }
    }
}

/// Shorten raw record text for display.
pub(crate) fn preview(raw: &str) -> String {
    let mut chars = raw.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Result type alias for edc-stream operations.
pub type Result<T> = std::result::Result<T, EdcError>;

impl From<std::io::Error> for EdcError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            context: "I/O operation failed".to_string(),
            source: err,
        }
    }
}

impl From<reqwest::Error> for EdcError {
    fn from(err: reqwest::Error) -> Self {
        Self::Connection {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Exit codes for CLI operations.
pub mod exit_codes {
    /// Operation completed successfully.
    pub const EXIT_SUCCESS: i32 = 0;
    /// General/unspecified error.
    pub const EXIT_GENERAL_ERROR: i32 = 1;
    /// Invalid configuration.
    pub const EXIT_CONFIG_ERROR: i32 = 5;
    /// Input data format error (BSD standard).
    pub const EXIT_DATA_ERROR: i32 = 65;
    /// Remote service unavailable (BSD standard).
    pub const EXIT_UNAVAILABLE: i32 = 69;
    /// I/O error (BSD standard).
    pub const EXIT_IO_ERROR: i32 = 74;
    /// Terminated by Ctrl+C (128 + SIGINT).
    pub const EXIT_INTERRUPTED: i32 = 130;
}
