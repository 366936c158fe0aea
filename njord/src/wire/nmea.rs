//! NMEA 0183 `RMC` (recommended minimum) sentences.

use chrono::{Datelike, Timelike};

use super::checksum::xor_checksum;
use super::error::EncodingError;
use super::{validate_coordinates, MS_TO_KNOTS};
use crate::position::{AuthoritativeFix, FixSource};

/// Ten-thousandths of a minute per degree.
const UNITS_PER_DEGREE: u64 = 60 * 10_000;

/// Render a `$GPRMC` sentence terminated by CRLF.
pub fn encode_rmc(fix: &AuthoritativeFix) -> Result<String, EncodingError> {
    validate_coordinates(fix.latitude, fix.longitude)?;

    let ts = fix.timestamp;
    // Leap-second nanos can exceed one second.
    let centis = (ts.nanosecond() / 10_000_000).min(99);
    let time = format!(
        "{:02}{:02}{:02}.{:02}",
        ts.hour(),
        ts.minute(),
        ts.second(),
        centis
    );
    let date = format!("{:02}{:02}{:02}", ts.day(), ts.month(), ts.year().rem_euclid(100));

    let (lat_deg, lat_min) = degrees_minutes(fix.latitude);
    let (lon_deg, lon_min) = degrees_minutes(fix.longitude);
    let ns = if fix.latitude < 0.0 { 'S' } else { 'N' };
    let ew = if fix.longitude < 0.0 { 'W' } else { 'E' };

    let speed = finite_or_zero(fix.speed_ms * MS_TO_KNOTS).max(0.0);
    let track = finite_or_zero(fix.heading).rem_euclid(360.0);
    let mode = match fix.source {
        FixSource::Gateway => 'A',
        FixSource::Wifi => 'E',
    };

    let payload = format!(
        "GPRMC,{},A,{:02}{},{},{:03}{},{},{:.1},{:.1},{},0.0,E,{}",
        time, lat_deg, lat_min, ns, lon_deg, lon_min, ew, speed, track, date, mode
    );
    let checksum = xor_checksum(payload.as_bytes());

    Ok(format!("${}*{:02X}\r\n", payload, checksum))
}

/// Split an absolute coordinate into whole degrees and `mm.mmmm` minutes.
///
/// Rounds once at 1/10000 minute so minutes never render as `60.0000`.
fn degrees_minutes(value: f64) -> (u64, String) {
    let total = (value.abs() * UNITS_PER_DEGREE as f64).round() as u64;
    let degrees = total / UNITS_PER_DEGREE;
    let remainder = total % UNITS_PER_DEGREE;
    let minutes = format!("{:02}.{:04}", remainder / 10_000, remainder % 10_000);
    (degrees, minutes)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
