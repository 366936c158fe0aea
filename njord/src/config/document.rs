//! JSON configuration document.
//!
//! The on-disk shape is deserialized into raw structs first, then validated
//! into domain types. Validation is all-or-nothing: the first bad field
//! rejects the whole document.
//!
//! ```json
//! {
//!   "KnownAps": [{"Ssid": "dock", "Bssid": "aa:bb:cc:dd:ee:01", "Latitude": 40.71, "Longitude": -74.01}],
//!   "LastUpdated": 1718000000,
//!   "ApiUser": {"Username": "user", "Password": "secret"},
//!   "Beacon": {"Interval": 1.0, "HdopExcellent": 2.0, "HdopPoor": 6.0},
//!   "Sinks": [{"Message": "TAIP_PV", "Protocol": "udp", "Port": 21000}]
//! }
//! ```

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use super::defaults::*;
use super::error::ConfigError;
use super::snapshot::{BeaconConfig, ConfigSnapshot};
use crate::catalog::{ApCatalog, ApiCredentials, Bssid, KnownAccessPoint};
use crate::position::HdopThresholds;
use crate::sink::SinkSpec;
use crate::wire::MAX_TAIP_ID;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConfigDocument {
    known_aps: Vec<RawAccessPoint>,
    last_updated: RawTimestamp,
    api_user: RawApiUser,
    #[serde(default)]
    beacon: RawBeacon,
    #[serde(default)]
    sinks: Vec<RawSink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawAccessPoint {
    ssid: String,
    bssid: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(i64),
    FractionalSeconds(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawApiUser {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RawBeacon {
    interval: f64,
    update_interval: f64,
    hdop_excellent: f64,
    hdop_poor: f64,
    num_wifi_scan: u32,
    wifi_scan_delay: f64,
    taip_id: u32,
    source_timeout: f64,
}

impl Default for RawBeacon {
    fn default() -> Self {
        Self {
            interval: DEFAULT_BEACON_INTERVAL_SECS,
            update_interval: DEFAULT_UPDATE_INTERVAL_SECS,
            hdop_excellent: DEFAULT_HDOP_EXCELLENT,
            hdop_poor: DEFAULT_HDOP_POOR,
            num_wifi_scan: DEFAULT_NUM_WIFI_SCAN,
            wifi_scan_delay: DEFAULT_WIFI_SCAN_DELAY_SECS,
            taip_id: DEFAULT_TAIP_ID,
            source_timeout: DEFAULT_SOURCE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawSink {
    message: String,
    protocol: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    alias: Option<RawAlias>,
}

/// Aliases may be written as JSON numbers or strings (`42`, `"+2"`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAlias {
    Number(i64),
    Text(String),
}

impl RawAlias {
    fn to_expression(&self) -> String {
        match self {
            RawAlias::Number(n) => n.to_string(),
            RawAlias::Text(s) => s.clone(),
        }
    }
}

/// Parse and validate a configuration document.
pub fn parse_config(bytes: &[u8]) -> Result<ConfigSnapshot, ConfigError> {
    let document: ConfigDocument = serde_json::from_slice(bytes)?;

    let last_updated = document.last_updated.to_datetime()?;

    let entries = document
        .known_aps
        .into_iter()
        .map(|ap| {
            let bssid: Bssid = ap.bssid.parse()?;
            Ok(KnownAccessPoint::new(ap.ssid, bssid, ap.latitude, ap.longitude))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let credentials = ApiCredentials::new(document.api_user.username, document.api_user.password);
    let catalog = ApCatalog::new(entries, last_updated, credentials)?;

    let beacon = document.beacon.validate()?;

    let sinks = document
        .sinks
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let alias = raw.alias.as_ref().map(RawAlias::to_expression);
            SinkSpec::from_parts(
                &raw.message,
                &raw.protocol,
                raw.port,
                raw.host.as_deref(),
                alias.as_deref(),
            )
            .map_err(|source| ConfigError::Sink { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ConfigSnapshot::new(catalog, beacon, sinks))
}

impl RawTimestamp {
    fn to_datetime(&self) -> Result<DateTime<Utc>, ConfigError> {
        let parsed = match self {
            RawTimestamp::Seconds(secs) => Utc.timestamp_opt(*secs, 0).single(),
            RawTimestamp::FractionalSeconds(secs) if secs.is_finite() => {
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9) as u32;
                Utc.timestamp_opt(whole as i64, nanos).single()
            }
            RawTimestamp::FractionalSeconds(_) => None,
            RawTimestamp::Text(text) => parse_timestamp_text(text),
        };

        parsed.ok_or_else(|| ConfigError::InvalidTimestamp(self.describe()))
    }

    fn describe(&self) -> String {
        match self {
            RawTimestamp::Seconds(secs) => secs.to_string(),
            RawTimestamp::FractionalSeconds(secs) => secs.to_string(),
            RawTimestamp::Text(text) => text.clone(),
        }
    }
}

/// RFC 3339, or a naive ISO 8601 date-time taken as UTC.
fn parse_timestamp_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl RawBeacon {
    fn validate(self) -> Result<BeaconConfig, ConfigError> {
        let interval = positive_secs("Beacon.Interval", self.interval)?;
        let update_interval = positive_secs("Beacon.UpdateInterval", self.update_interval)?;
        let source_timeout = positive_secs("Beacon.SourceTimeout", self.source_timeout)?;

        let wifi_scan_delay = bounded_secs("Beacon.WifiScanDelay", self.wifi_scan_delay)?;

        if !self.hdop_excellent.is_finite() || self.hdop_excellent < 0.0 {
            return Err(invalid(
                "Beacon.HdopExcellent",
                self.hdop_excellent,
                "must be a non-negative number",
            ));
        }
        if !self.hdop_poor.is_finite() || self.hdop_poor <= self.hdop_excellent {
            return Err(invalid(
                "Beacon.HdopPoor",
                self.hdop_poor,
                "must be greater than Beacon.HdopExcellent",
            ));
        }

        if self.num_wifi_scan == 0 {
            return Err(invalid("Beacon.NumWifiScan", 0, "must be at least 1"));
        }

        if self.taip_id > MAX_TAIP_ID {
            return Err(invalid("Beacon.TaipId", self.taip_id, "must fit in 4 digits"));
        }

        Ok(BeaconConfig {
            interval,
            update_interval,
            thresholds: HdopThresholds::new(self.hdop_excellent, self.hdop_poor),
            num_wifi_scan: self.num_wifi_scan,
            wifi_scan_delay,
            default_unit_id: self.taip_id,
            source_timeout,
        })
    }
}

fn positive_secs(key: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    if secs.is_nan() || secs <= 0.0 {
        return Err(invalid(key, secs, "must be a positive number of seconds"));
    }
    bounded_secs(key, secs)
}

/// Zero or more seconds, no longer than [`MAX_DURATION_SECS`].
fn bounded_secs(key: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    if !(0.0..=MAX_DURATION_SECS).contains(&secs) {
        return Err(invalid(key, secs, "must be between 0 and 604800 seconds"));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| invalid(key, secs, "is not a representable duration"))
}

fn invalid(key: &'static str, value: impl ToString, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason,
    }
}
