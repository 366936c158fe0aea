//! Error types for gateway and radio scan sources.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors reading a position or scan source.
///
/// The beacon never aborts on these: a failed gateway read becomes an
/// unavailable fix and a failed scan contributes no observations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Base URL is neither an http(s) URL nor an existing file.
    #[error("Invalid gateway base URL or file path: {0}")]
    InvalidBaseUrl(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Gateway answered with a non-success status.
    #[error("Gateway returned HTTP {0}")]
    Status(u16),

    /// Authentication was rejected or returned no token.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Response body was not the expected JSON shape.
    #[error("Failed to parse response: {0}")]
    JsonError(String),

    /// Response contained no data object.
    #[error("Gateway response contained no data")]
    EmptyResponse,

    /// Failed to read a file-proxy document.
    #[error("Failed to read gateway proxy file {path}: {source}")]
    ProxyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Call exceeded its time budget.
    #[error("Source timed out after {0:?}")]
    Timeout(Duration),
}
