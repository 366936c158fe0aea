//! TAIP `PV` (position/velocity) sentences.
//!
//! ```text
//! >RPV TTTTT ±AAAAAAA ±OOOOOOOO SSS HHH S A ;ID=NNNN ;*CS<
//!      time  lat      lon       mph hdg src age
//! ```

use chrono::Timelike;

use super::checksum::xor_checksum;
use super::error::EncodingError;
use super::{validate_coordinates, MS_TO_MPH};
use crate::position::{AuthoritativeFix, FixSource};

/// TAIP source code for a 3D GPS fix.
const SOURCE_3D_GPS: u8 = 1;
/// TAIP source code for an unknown or non-GPS source.
const SOURCE_UNKNOWN: u8 = 9;
/// TAIP age code for a fresh fix.
const AGE_FRESH: u8 = 2;

fn source_code(source: FixSource) -> u8 {
    match source {
        FixSource::Gateway => SOURCE_3D_GPS,
        FixSource::Wifi => SOURCE_UNKNOWN,
    }
}

/// Render a `>RPV` sentence with the given 4-digit identifier.
pub fn encode_pv(fix: &AuthoritativeFix, id: u32) -> Result<String, EncodingError> {
    validate_coordinates(fix.latitude, fix.longitude)?;
    if id > super::alias::MAX_TAIP_ID {
        return Err(EncodingError::IdentifierOutOfRange(i64::from(id)));
    }

    let time_of_day = fix.timestamp.num_seconds_from_midnight();
    let latitude = (fix.latitude * 1e5).round() as i64;
    let longitude = (fix.longitude * 1e5).round() as i64;
    let speed = finite_or_zero(fix.speed_ms * MS_TO_MPH).round().clamp(0.0, 999.0) as u32;
    let heading = (finite_or_zero(fix.heading).round() as i64).rem_euclid(360);

    let body = format!(
        ">RPV{:05}{:+08}{:+09}{:03}{:03}{}{};ID={:04};*",
        time_of_day,
        latitude,
        longitude,
        speed,
        heading,
        source_code(fix.source),
        AGE_FRESH,
        id
    );
    let checksum = xor_checksum(body.as_bytes());

    Ok(format!("{}{:02X}<", body, checksum))
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
