//! Wire encoder for beacon sentences.
//!
//! Renders an [`AuthoritativeFix`] as one of two ASCII sentence formats:
//!
//! - `TAIP_PV` - Trimble ASCII Interface Protocol position/velocity
//! - `NMEA_RMC` - NMEA 0183 recommended minimum data
//!
//! Encoding is pure: the same fix and identifier always yield the same bytes.

mod alias;
mod checksum;
mod error;
mod nmea;
mod taip;

use std::fmt;
use std::str::FromStr;

pub use alias::{TaipAlias, MAX_TAIP_ID};
pub use checksum::{verify_nmea, verify_taip, xor_checksum};
pub use error::EncodingError;

use crate::position::AuthoritativeFix;

/// Meters per second to knots.
pub const MS_TO_KNOTS: f64 = 1.94384;

/// Meters per second to statute miles per hour.
pub const MS_TO_MPH: f64 = 2.2369362920544;

/// Supported sentence formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageType {
    TaipPv,
    NmeaRmc,
}

impl MessageType {
    /// Whether the format carries a unit identifier.
    pub fn uses_identifier(&self) -> bool {
        matches!(self, MessageType::TaipPv)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::TaipPv => write!(f, "TAIP_PV"),
            MessageType::NmeaRmc => write!(f, "NMEA_RMC"),
        }
    }
}

impl FromStr for MessageType {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TAIP_PV" | "TAIP" => Ok(MessageType::TaipPv),
            "NMEA_RMC" | "NMEA" => Ok(MessageType::NmeaRmc),
            _ => Err(EncodingError::UnknownMessageType(s.to_string())),
        }
    }
}

/// Render a fix in the requested format.
///
/// `id` is the resolved TAIP identifier; NMEA ignores it.
pub fn encode(message: MessageType, fix: &AuthoritativeFix, id: u32) -> Result<String, EncodingError> {
    match message {
        MessageType::TaipPv => taip::encode_pv(fix, id),
        MessageType::NmeaRmc => nmea::encode_rmc(fix),
    }
}

pub(crate) fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), EncodingError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(EncodingError::LatitudeOutOfRange(latitude));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(EncodingError::LongitudeOutOfRange(longitude));
    }
    Ok(())
}
