//! Core fix types for beacon positioning.
//!
//! - [`FixSource`] - Where did the authoritative position come from?
//! - [`GatewayFix`] - Satellite fix and quality as reported by the gateway
//! - [`AuthoritativeFix`] - The single position chosen for a beacon tick

use chrono::{DateTime, Utc};

/// Source of an authoritative fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixSource {
    /// The gateway's GNSS receiver.
    Gateway,
    /// Centroid of known WiFi access points seen in a scan.
    Wifi,
}

impl std::fmt::Display for FixSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gateway => write!(f, "GATEWAY"),
            Self::Wifi => write!(f, "WIFI"),
        }
    }
}

/// A GNSS reading from the gateway.
///
/// A failed or timed-out read is represented by [`GatewayFix::unavailable`]:
/// invalid, with infinite HDOP, so the selector never trusts it.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayFix {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,

    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,

    /// Horizontal dilution of precision (lower is better).
    pub hdop: f64,

    /// Whether the receiver reports a usable fix.
    pub valid: bool,

    /// When the fix was taken.
    pub timestamp: DateTime<Utc>,

    /// Track over ground in degrees, 0.0 if unknown.
    pub heading: f64,

    /// Ground speed in meters per second, 0.0 if unknown.
    pub speed_ms: f64,

    /// Unit identifier configured on the gateway's GNSS, if reported.
    pub unit_id: Option<u32>,
}

impl GatewayFix {
    /// Create a gateway fix with no vector data.
    pub fn new(latitude: f64, longitude: f64, hdop: f64, valid: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            hdop,
            valid,
            timestamp,
            heading: 0.0,
            speed_ms: 0.0,
            unit_id: None,
        }
    }

    /// Stand-in for a gateway that could not be read.
    pub fn unavailable(timestamp: DateTime<Utc>) -> Self {
        Self::new(f64::NAN, f64::NAN, f64::INFINITY, false, timestamp)
    }

    pub fn with_vectors(mut self, heading: f64, speed_ms: f64) -> Self {
        self.heading = heading;
        self.speed_ms = speed_ms;
        self
    }

    pub fn with_unit_id(mut self, unit_id: u32) -> Self {
        self.unit_id = Some(unit_id);
        self
    }
}

/// The position chosen for one beacon tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthoritativeFix {
    /// Latitude in degrees.
    pub latitude: f64,

    /// Longitude in degrees.
    pub longitude: f64,

    /// Which input produced this position.
    pub source: FixSource,

    /// Fix time. Gateway fixes keep the receiver's time; WiFi fixes use the tick time.
    pub timestamp: DateTime<Utc>,

    /// Track in degrees (0.0 for WiFi fixes).
    pub heading: f64,

    /// Ground speed in m/s (0.0 for WiFi fixes).
    pub speed_ms: f64,

    /// Unit identifier reported by the gateway, used as the TAIP alias base.
    pub unit_id: Option<u32>,
}

impl AuthoritativeFix {
    /// Adopt the gateway's fix as-is.
    pub fn from_gateway(fix: &GatewayFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            source: FixSource::Gateway,
            timestamp: fix.timestamp,
            heading: fix.heading,
            speed_ms: fix.speed_ms,
            unit_id: fix.unit_id,
        }
    }

    /// Stationary fix at a WiFi-derived position.
    pub fn from_wifi(latitude: f64, longitude: f64, timestamp: DateTime<Utc>, unit_id: Option<u32>) -> Self {
        Self {
            latitude,
            longitude,
            source: FixSource::Wifi,
            timestamp,
            heading: 0.0,
            speed_ms: 0.0,
            unit_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_fix_is_untrustworthy() {
        let fix = GatewayFix::unavailable(Utc::now());
        assert!(!fix.valid);
        assert!(fix.hdop.is_infinite());
    }

    #[test]
    fn test_from_gateway_keeps_vectors_and_time() {
        let ts = Utc::now();
        let fix = GatewayFix::new(53.5, 10.0, 1.2, true, ts)
            .with_vectors(90.0, 5.0)
            .with_unit_id(17);
        let auth = AuthoritativeFix::from_gateway(&fix);

        assert_eq!(auth.source, FixSource::Gateway);
        assert_eq!(auth.timestamp, ts);
        assert_eq!(auth.heading, 90.0);
        assert_eq!(auth.speed_ms, 5.0);
        assert_eq!(auth.unit_id, Some(17));
    }

    #[test]
    fn test_from_wifi_is_stationary() {
        let auth = AuthoritativeFix::from_wifi(40.71, -74.01, Utc::now(), None);
        assert_eq!(auth.source, FixSource::Wifi);
        assert_eq!(auth.heading, 0.0);
        assert_eq!(auth.speed_ms, 0.0);
    }

    #[test]
    fn test_source_display() {
        assert_eq!(FixSource::Gateway.to_string(), "GATEWAY");
        assert_eq!(FixSource::Wifi.to_string(), "WIFI");
    }
}
