//! Error types for the connection manager.

use std::path::PathBuf;

use mkv_client::ClientError;
use thiserror::Error;

/// Result type for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Top-level error type for manager operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Malformed or incomplete configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Opening, selecting the database of, or configuring a connection failed
    #[error("failed to connect `{name}`: {source}")]
    Connect {
        /// Connection name from the configuration
        name: String,
        #[source]
        source: ClientError,
    },

    /// The store rejected the configured password
    #[error("authentication failed for `{name}`: {source}")]
    Auth {
        /// Connection name from the configuration
        name: String,
        #[source]
        source: ClientError,
    },

    /// No connection is registered under the name
    #[error("no connection named `{0}`")]
    NotFound(String),

    /// Failure surfaced by the store for a forwarded command
    #[error("command failed: {0}")]
    Command(#[from] ClientError),
}

/// Errors related to configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration text is not valid TOML
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("invalid configuration value for {field}: {reason}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// The reason for validation failure
        reason: String,
    },

    /// Two server entries share a name
    #[error("duplicate connection name `{0}`")]
    Duplicate(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a fallible cache-aside helper.
#[derive(Debug, Error)]
pub enum RememberError<E> {
    /// The store read or write failed
    #[error(transparent)]
    Store(#[from] ManagerError),

    /// The producer failed; nothing was written
    #[error("cache producer failed: {0}")]
    Producer(E),
}
