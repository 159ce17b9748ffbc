use std::path::PathBuf;

use thiserror::Error;

use crate::domain::EconomyError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {domain} document: {source}")]
    Encode {
        domain: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Economy(#[from] EconomyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("command queue closed")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The economy rule violation behind this error, if any.
    #[must_use]
    pub const fn as_economy(&self) -> Option<&EconomyError> {
        match self {
            Self::Economy(e) => Some(e),
            _ => None,
        }
    }
}
