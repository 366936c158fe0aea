//! AirLink OS data keys and response parsing.
//!
//! The `db/get` endpoint returns a flat object keyed by dotted field names.
//! Numeric fields may arrive as JSON numbers or as strings.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::catalog::{Bssid, ScanObservation};
use crate::position::GatewayFix;

/// Field prefix requested for GNSS data.
pub const GNSS_FIELDS: &str = "location.gnss";
pub const GNSS_LATITUDE: &str = "location.gnss.latitude";
pub const GNSS_LONGITUDE: &str = "location.gnss.longitude";
pub const GNSS_HDOP: &str = "location.gnss.hdop";
/// Fix time in Unix milliseconds.
pub const GNSS_FIXTIME: &str = "location.gnss.fixtime";
pub const GNSS_HEADING: &str = "location.gnss.heading";
/// Ground speed in km/h.
pub const GNSS_SPEED: &str = "location.gnss.speed";
pub const GNSS_TAIP_ID: &str = "location.gnss.taipid";

/// Field prefix requested for WiFi scan data.
pub const WIFI_FIELDS: &str = "net.wifi.ssid";

/// Radio bands reported per SSID.
pub const WIFI_BANDS: [&str; 2] = ["band2400", "band5400"];

/// Key holding scan results for one SSID on one band.
pub fn wifi_scan_key(ssid: &str, band: &str) -> String {
    format!("net.wifi.ssid.scan[{}].{}", ssid, band)
}

const KMH_TO_MS: f64 = 1.0 / 3.6;

/// Read a numeric field that may be a number or a numeric string.
fn number(data: &Map<String, Value>, key: &str) -> Option<f64> {
    match data.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Build a [`GatewayFix`] from a GNSS response object.
///
/// The fix is valid only when latitude, longitude and HDOP are present and
/// the coordinates are in range. A missing HDOP reads as infinite.
pub fn parse_gnss(data: &Map<String, Value>, now: DateTime<Utc>) -> GatewayFix {
    let latitude = number(data, GNSS_LATITUDE);
    let longitude = number(data, GNSS_LONGITUDE);
    let hdop = number(data, GNSS_HDOP);

    let timestamp = number(data, GNSS_FIXTIME)
        .filter(|ms| *ms > 0.0)
        .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
        .unwrap_or(now);

    let valid = match (latitude, longitude, hdop) {
        (Some(lat), Some(lon), Some(h)) => {
            (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) && !h.is_nan()
        }
        _ => false,
    };

    let mut fix = GatewayFix::new(
        latitude.unwrap_or(f64::NAN),
        longitude.unwrap_or(f64::NAN),
        hdop.unwrap_or(f64::INFINITY),
        valid,
        timestamp,
    )
    .with_vectors(
        number(data, GNSS_HEADING).unwrap_or(0.0),
        number(data, GNSS_SPEED).unwrap_or(0.0) * KMH_TO_MS,
    );

    let unit_id = match data.get(GNSS_TAIP_ID) {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    if let Some(id) = unit_id {
        fix = fix.with_unit_id(id);
    }

    fix
}

/// Collect observations for `ssids` from a WiFi response object.
pub fn parse_wifi(data: &Map<String, Value>, ssids: &[String]) -> Vec<ScanObservation> {
    let mut observations = Vec::new();
    for ssid in ssids {
        for band in WIFI_BANDS {
            if let Some(Value::String(text)) = data.get(&wifi_scan_key(ssid, band)) {
                observations.extend(parse_scan_blocks(text, ssid));
            }
        }
    }
    observations
}

/// Parse a scan listing: blank-line separated blocks of `Key: value` lines.
///
/// Blocks without a parseable `BSSID` are dropped.
pub fn parse_scan_blocks(text: &str, ssid: &str) -> Vec<ScanObservation> {
    text.trim()
        .split("\n\n")
        .filter_map(|block| {
            let mut bssid = None;
            let mut name = None;
            let mut signal = None;

            for line in block.lines() {
                let Some((key, value)) = line.split_once(':') else {
                    continue;
                };
                let value = value.trim();
                match key.trim().to_ascii_uppercase().as_str() {
                    "BSSID" => bssid = Some(value),
                    "SSID" => name = Some(value),
                    "SIGNAL" | "RSSI" => {
                        signal = value
                            .trim_end_matches("dBm")
                            .trim()
                            .parse::<i32>()
                            .ok()
                    }
                    _ => {}
                }
            }

            let parsed: Bssid = match bssid?.parse() {
                Ok(b) => b,
                Err(e) => {
                    debug!(error = %e, "Skipping scan entry");
                    return None;
                }
            };

            let mut observation =
                ScanObservation::new(parsed).with_ssid(name.unwrap_or(ssid).to_string());
            if let Some(signal) = signal {
                observation = observation.with_signal(signal);
            }
            Some(observation)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_parse_gnss_numbers_and_strings() {
        let data = object(json!({
            "location.gnss.latitude": "40.70",
            "location.gnss.longitude": -74.0,
            "location.gnss.hdop": 0.9,
            "location.gnss.fixtime": 1718006400000i64,
            "location.gnss.heading": "180",
            "location.gnss.speed": 36.0,
            "location.gnss.taipid": "0100"
        }));

        let fix = parse_gnss(&data, Utc::now());

        assert!(fix.valid);
        assert_eq!(fix.latitude, 40.70);
        assert_eq!(fix.longitude, -74.0);
        assert_eq!(fix.hdop, 0.9);
        assert_eq!(fix.timestamp.timestamp(), 1_718_006_400);
        assert_eq!(fix.heading, 180.0);
        assert!((fix.speed_ms - 10.0).abs() < 1e-9);
        assert_eq!(fix.unit_id, Some(100));
    }

    #[test]
    fn test_parse_gnss_missing_fields_is_invalid() {
        let now = Utc::now();
        let data = object(json!({"location.gnss.latitude": 40.7}));

        let fix = parse_gnss(&data, now);

        assert!(!fix.valid);
        assert!(fix.hdop.is_infinite());
        assert_eq!(fix.timestamp, now);
        assert_eq!(fix.unit_id, None);
    }

    #[test]
    fn test_parse_gnss_out_of_range_is_invalid() {
        let data = object(json!({
            "location.gnss.latitude": 95.0,
            "location.gnss.longitude": 0.0,
            "location.gnss.hdop": 1.0
        }));
        assert!(!parse_gnss(&data, Utc::now()).valid);
    }

    #[test]
    fn test_parse_scan_blocks() {
        let text = "SSID: dock\nBSSID: AA:BB:CC:DD:EE:01\nSignal: -61 dBm\nChannel: 6\n\n\
                    SSID: dock\nBSSID: aa:bb:cc:dd:ee:02\n\n\
                    SSID: dock\nChannel: 11\n\n\
                    BSSID: garbage";

        let observations = parse_scan_blocks(text, "dock");

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].bssid.to_string(), "aa:bb:cc:dd:ee:01");
        assert_eq!(observations[0].signal, Some(-61));
        assert_eq!(observations[0].ssid.as_deref(), Some("dock"));
        assert_eq!(observations[1].signal, None);
    }

    #[test]
    fn test_parse_wifi_reads_both_bands() {
        let data = object(json!({
            "net.wifi.ssid.scan[dock].band2400": "BSSID: aa:bb:cc:dd:ee:01",
            "net.wifi.ssid.scan[dock].band5400": "BSSID: aa:bb:cc:dd:ee:02",
            "net.wifi.ssid.scan[other].band2400": "BSSID: aa:bb:cc:dd:ee:03"
        }));

        let observations = parse_wifi(&data, &["dock".to_string()]);

        assert_eq!(observations.len(), 2);
        // SSID falls back to the queried network.
        assert_eq!(observations[1].ssid.as_deref(), Some("dock"));
    }
}
