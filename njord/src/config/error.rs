//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::{BssidParseError, CatalogError};
use crate::sink::SinkSpecError;

/// Errors loading, parsing or validating configuration.
///
/// Any of these during a refresh leaves the active configuration in place.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a local configuration file.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the local configuration cache.
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to download a remote configuration document.
    #[error("Failed to fetch config from {url}: {message}")]
    Fetch { url: String, message: String },

    /// Document is not valid JSON or is missing required fields.
    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// `LastUpdated` is neither Unix seconds nor an ISO 8601 timestamp.
    #[error("Invalid LastUpdated value '{0}'")]
    InvalidTimestamp(String),

    #[error("Invalid known access point: {0}")]
    Bssid(#[from] BssidParseError),

    #[error("Invalid access point catalog: {0}")]
    Catalog(#[from] CatalogError),

    /// A sink entry failed validation.
    #[error("Invalid sink #{index}: {source}")]
    Sink {
        index: usize,
        #[source]
        source: SinkSpecError,
    },

    /// A beacon setting is out of range or inconsistent.
    #[error("Invalid configuration: {key} = {value} - {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}
