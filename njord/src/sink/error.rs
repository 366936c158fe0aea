//! Sink error types.

use std::io;

use thiserror::Error;

use crate::wire::EncodingError;

/// Errors validating a sink specification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SinkSpecError {
    #[error("unknown sink protocol '{0}' (expected udp, tcp or stdout)")]
    UnknownProtocol(String),

    #[error("{0} sink requires a port")]
    MissingPort(&'static str),

    #[error("tcp sink requires a host")]
    MissingHost,

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("malformed sink '{0}' (expected TYPE:PROTO:PORT[:HOST][:ALIAS])")]
    Malformed(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Per-sink transport failure.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Could not bind the shared UDP socket.
    #[error("failed to bind UDP socket: {0}")]
    Bind(#[source] io::Error),

    #[error("failed to send datagram to {endpoint}: {source}")]
    Send {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("connect to {endpoint} timed out")]
    ConnectTimeout { endpoint: String },

    #[error("failed to write to {endpoint}: {source}")]
    Write {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("write to {endpoint} timed out")]
    WriteTimeout { endpoint: String },

    #[error("console write failed: {0}")]
    Console(#[source] io::Error),
}
