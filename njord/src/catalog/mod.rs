//! Known access point catalog and scan matching.
//!
//! The catalog is the set of WiFi access points whose physical location is
//! known ahead of time (dock masts, shore stations, moorings). A scan that
//! sees one or more of them gives a position estimate independent of GNSS.
//!
//! # Components
//!
//! - [`Bssid`] - Normalized MAC address used as the catalog key
//! - [`ApCatalog`] - Immutable catalog snapshot with API credentials
//! - [`match_observations`] - Centroid of every catalog entry seen in a scan

mod bssid;
mod matcher;

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use bssid::{Bssid, BssidParseError};
pub use matcher::{match_observations, ApMatch, ScanObservation};

/// Errors raised while building a catalog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    /// The same BSSID appears more than once.
    #[error("duplicate BSSID {0} in known access points")]
    DuplicateBssid(Bssid),

    /// Coordinates are not a valid position.
    #[error("access point {bssid} has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates {
        bssid: Bssid,
        latitude: f64,
        longitude: f64,
    },
}

/// An access point with a surveyed location.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownAccessPoint {
    /// Network name. Advisory only; matching uses the BSSID.
    pub ssid: String,
    /// Hardware address.
    pub bssid: Bssid,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl KnownAccessPoint {
    /// Create a known access point.
    pub fn new(ssid: impl Into<String>, bssid: Bssid, latitude: f64, longitude: f64) -> Self {
        Self {
            ssid: ssid.into(),
            bssid,
            latitude,
            longitude,
        }
    }

    fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Credentials for the gateway API.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ApiCredentials {
    pub username: String,
    pub password: String,
}

impl ApiCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs.
impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Immutable catalog of known access points.
///
/// Entries keep their configured order; lookups go through a BSSID index.
#[derive(Debug, Clone)]
pub struct ApCatalog {
    entries: Vec<KnownAccessPoint>,
    index: HashMap<Bssid, usize>,
    last_updated: DateTime<Utc>,
    credentials: ApiCredentials,
}

impl ApCatalog {
    /// Build a catalog, rejecting duplicate BSSIDs and invalid coordinates.
    pub fn new(
        entries: Vec<KnownAccessPoint>,
        last_updated: DateTime<Utc>,
        credentials: ApiCredentials,
    ) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, ap) in entries.iter().enumerate() {
            if !ap.has_valid_coordinates() {
                return Err(CatalogError::InvalidCoordinates {
                    bssid: ap.bssid,
                    latitude: ap.latitude,
                    longitude: ap.longitude,
                });
            }
            if index.insert(ap.bssid, i).is_some() {
                return Err(CatalogError::DuplicateBssid(ap.bssid));
            }
        }

        Ok(Self {
            entries,
            index,
            last_updated,
            credentials,
        })
    }

    /// An empty catalog (nothing can match).
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            last_updated: DateTime::<Utc>::default(),
            credentials: ApiCredentials::default(),
        }
    }

    /// Look up an access point by BSSID.
    pub fn get(&self, bssid: &Bssid) -> Option<&KnownAccessPoint> {
        self.index.get(bssid).map(|&i| &self.entries[i])
    }

    /// Entries in configured order.
    pub fn entries(&self) -> &[KnownAccessPoint] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When the catalog document was last updated.
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Gateway API credentials delivered with the catalog.
    pub fn credentials(&self) -> &ApiCredentials {
        &self.credentials
    }

    /// Replace the credentials (used for command-line overrides).
    pub fn with_credentials(mut self, credentials: ApiCredentials) -> Self {
        self.credentials = credentials;
        self
    }
}
