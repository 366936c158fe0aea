//! Encoder error types.

use thiserror::Error;

/// Errors raised while rendering a fix or parsing sink options.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    /// Alias expression is not a decimal integer or signed delta.
    #[error("invalid alias '{input}': {reason}")]
    InvalidAlias { input: String, reason: &'static str },

    /// Resolved identifier does not fit the 4-digit TAIP ID field.
    #[error("identifier {0} does not fit in 4 digits")]
    IdentifierOutOfRange(i64),

    /// Latitude is non-finite or outside [-90, 90].
    #[error("latitude {0} out of range")]
    LatitudeOutOfRange(f64),

    /// Longitude is non-finite or outside [-180, 180].
    #[error("longitude {0} out of range")]
    LongitudeOutOfRange(f64),

    /// Unknown message type name.
    #[error("unknown message type '{0}' (expected TAIP_PV or NMEA_RMC)")]
    UnknownMessageType(String),
}
