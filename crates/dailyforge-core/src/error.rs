//! Core error types for dailyforge-core.
//!
//! One umbrella [`CoreError`] with `#[from]` conversions for each concern,
//! following the same layering the storage, config and AI modules use.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dailyforge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Free-text command did not match its grammar
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    /// AI collaborator errors
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The connection mutex was poisoned by a panicking holder
    #[error("Database connection poisoned")]
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Typed failures of the free-text challenge/plan grammars.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrammarError {
    #[error("challenge name is empty")]
    MissingName,

    #[error("goal label '{label}:' not found")]
    MissingGoal { label: String },

    #[error("goal '{0}' is not a number")]
    InvalidGoal(String),

    #[error("end date '{0}' is not a YYYY-MM-DD date")]
    InvalidDate(String),

    #[error("unexpected segment '{0}'")]
    UnexpectedSegment(String),

    #[error("plan has no items")]
    EmptyPlan,

    #[error("plan item {position} is empty")]
    EmptyItem { position: usize },
}

/// AI collaborator errors. Never surfaced to the user: the renderer
/// substitutes fallback content.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} response is missing {field}")]
    MissingField {
        service: &'static str,
        field: &'static str,
    },

    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
