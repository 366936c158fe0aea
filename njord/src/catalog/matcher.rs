//! Scan-to-catalog matching.
//!
//! Observations from every scan repetition of a tick are pooled and matched
//! in one pass. Each catalog entry counts once no matter how many scans saw
//! it, and the estimate is the unweighted centroid of all matched entries.
//! Signal strength is carried through but not used: not every radio reports it.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::{ApCatalog, Bssid};

/// One access point seen by a radio scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanObservation {
    pub bssid: Bssid,
    pub ssid: Option<String>,
    /// Received signal strength in dBm, if the radio reports it.
    pub signal: Option<i32>,
}

impl ScanObservation {
    /// Observation with only a BSSID.
    pub fn new(bssid: Bssid) -> Self {
        Self {
            bssid,
            ssid: None,
            signal: None,
        }
    }

    pub fn with_ssid(mut self, ssid: impl Into<String>) -> Self {
        self.ssid = Some(ssid.into());
        self
    }

    pub fn with_signal(mut self, signal: i32) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// Position estimated from matched access points.
#[derive(Debug, Clone, PartialEq)]
pub struct ApMatch {
    pub latitude: f64,
    pub longitude: f64,
    /// Distinct catalog entries that contributed, in BSSID order.
    pub matched: Vec<Bssid>,
}

/// Match pooled observations against the catalog.
///
/// Returns `None` when no observation matches a catalog entry.
pub fn match_observations(catalog: &ApCatalog, observations: &[ScanObservation]) -> Option<ApMatch> {
    let mut matched = BTreeSet::new();

    for observation in observations {
        let Some(known) = catalog.get(&observation.bssid) else {
            trace!(bssid = %observation.bssid, "Observation not in catalog");
            continue;
        };

        if let Some(ssid) = &observation.ssid {
            if *ssid != known.ssid {
                debug!(
                    bssid = %observation.bssid,
                    observed_ssid = %ssid,
                    catalog_ssid = %known.ssid,
                    "SSID differs from catalog, matching on BSSID"
                );
            }
        }

        matched.insert(observation.bssid);
    }

    if matched.is_empty() {
        return None;
    }

    let (lat_sum, lon_sum) = matched
        .iter()
        .filter_map(|bssid| catalog.get(bssid))
        .fold((0.0, 0.0), |(lat, lon), ap| (lat + ap.latitude, lon + ap.longitude));
    let count = matched.len() as f64;

    Some(ApMatch {
        latitude: lat_sum / count,
        longitude: lon_sum / count,
        matched: matched.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ApiCredentials, KnownAccessPoint};
    use chrono::Utc;

    fn bssid(s: &str) -> Bssid {
        s.parse().unwrap()
    }

    fn catalog(aps: &[(&str, f64, f64)]) -> ApCatalog {
        let entries = aps
            .iter()
            .map(|(b, lat, lon)| KnownAccessPoint::new("buoy-net", bssid(b), *lat, *lon))
            .collect();
        ApCatalog::new(entries, Utc::now(), ApiCredentials::default()).unwrap()
    }

    #[test]
    fn test_no_observations_no_match() {
        let catalog = catalog(&[("aa:bb:cc:dd:ee:01", 1.0, 1.0)]);
        assert!(match_observations(&catalog, &[]).is_none());
    }

    #[test]
    fn test_unknown_bssid_no_match() {
        let catalog = catalog(&[("aa:bb:cc:dd:ee:01", 1.0, 1.0)]);
        let seen = [ScanObservation::new(bssid("11:22:33:44:55:66"))];
        assert!(match_observations(&catalog, &seen).is_none());
    }

    #[test]
    fn test_single_match_returns_ap_position() {
        let catalog = catalog(&[("aa:bb:cc:dd:ee:01", 40.71, -74.01)]);
        let seen = [ScanObservation::new(bssid("AA-BB-CC-DD-EE-01"))];

        let m = match_observations(&catalog, &seen).unwrap();
        assert_eq!((m.latitude, m.longitude), (40.71, -74.01));
        assert_eq!(m.matched, vec![bssid("aa:bb:cc:dd:ee:01")]);
    }

    #[test]
    fn test_centroid_of_two_aps() {
        let catalog = catalog(&[("aa:bb:cc:dd:ee:01", 0.0, 0.0), ("aa:bb:cc:dd:ee:02", 2.0, 2.0)]);
        let seen = [
            ScanObservation::new(bssid("aa:bb:cc:dd:ee:01")),
            ScanObservation::new(bssid("aa:bb:cc:dd:ee:02")),
        ];

        let m = match_observations(&catalog, &seen).unwrap();
        assert_eq!((m.latitude, m.longitude), (1.0, 1.0));
        assert_eq!(m.matched.len(), 2);
    }

    #[test]
    fn test_repeated_sightings_count_once() {
        let catalog = catalog(&[("aa:bb:cc:dd:ee:01", 0.0, 0.0), ("aa:bb:cc:dd:ee:02", 3.0, 3.0)]);
        // First AP seen in three scans, second in one.
        let seen = [
            ScanObservation::new(bssid("aa:bb:cc:dd:ee:01")),
            ScanObservation::new(bssid("aa:bb:cc:dd:ee:01")),
            ScanObservation::new(bssid("aa:bb:cc:dd:ee:01")),
            ScanObservation::new(bssid("aa:bb:cc:dd:ee:02")),
        ];

        let m = match_observations(&catalog, &seen).unwrap();
        assert_eq!((m.latitude, m.longitude), (1.5, 1.5));
    }

    #[test]
    fn test_ssid_mismatch_still_matches() {
        let catalog = catalog(&[("aa:bb:cc:dd:ee:01", 5.0, 6.0)]);
        let seen = [ScanObservation::new(bssid("aa:bb:cc:dd:ee:01"))
            .with_ssid("renamed-network")
            .with_signal(-70)];

        let m = match_observations(&catalog, &seen).unwrap();
        assert_eq!((m.latitude, m.longitude), (5.0, 6.0));
    }
}
