//! Error types for the bot binary.

use dailyforge_core::{AiError, ConfigError, CoreError, DatabaseError};
use thiserror::Error;

/// Telegram Bot API failures.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Request never produced a response. The URL is stripped since it
    /// carries the bot token.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Bot API answered `ok: false` or a non-2xx status
    #[error("{method} failed (HTTP {status}): {description}")]
    Api {
        method: &'static str,
        status: u16,
        description: String,
    },

    /// Response body was not the expected shape
    #[error("{method}: unexpected response: {message}")]
    Decode {
        method: &'static str,
        message: String,
    },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

impl TransportError {
    /// Telegram rejected the entity markup of a Markdown message.
    pub fn is_markup_rejection(&self) -> bool {
        matches!(self, Self::Api { status: 400, description, .. }
            if description.contains("can't parse entities"))
    }

    /// Editing produced identical content; nothing to do.
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::Api { status: 400, description, .. }
            if description.contains("message is not modified"))
    }
}

/// Fatal startup errors.
#[derive(Error, Debug)]
pub enum StartupError {
    /// Required environment variable is unset or empty
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    /// Environment variable present but unusable
    #[error("Invalid value for {key}: {message}")]
    InvalidEnv { key: &'static str, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
