//! Immutable configuration snapshots and the shared handle that swaps them.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::defaults::*;
use crate::catalog::{ApCatalog, ApiCredentials};
use crate::position::HdopThresholds;
use crate::sink::SinkSpec;

/// Validated beacon settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconConfig {
    /// Period of the beacon cycle.
    pub interval: Duration,

    /// Period of the configuration refresh cycle.
    pub update_interval: Duration,

    /// HDOP bands for source selection.
    pub thresholds: HdopThresholds,

    /// WiFi scans per tick (at least 1).
    pub num_wifi_scan: u32,

    /// Pause after each WiFi scan.
    pub wifi_scan_delay: Duration,

    /// TAIP identifier base when the gateway reports no unit id.
    pub default_unit_id: u32,

    /// Timeout for each gateway read or scan.
    pub source_timeout: Duration,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs_f64(DEFAULT_BEACON_INTERVAL_SECS),
            update_interval: Duration::from_secs_f64(DEFAULT_UPDATE_INTERVAL_SECS),
            thresholds: HdopThresholds::new(DEFAULT_HDOP_EXCELLENT, DEFAULT_HDOP_POOR),
            num_wifi_scan: DEFAULT_NUM_WIFI_SCAN,
            wifi_scan_delay: Duration::from_secs_f64(DEFAULT_WIFI_SCAN_DELAY_SECS),
            default_unit_id: DEFAULT_TAIP_ID,
            source_timeout: Duration::from_secs_f64(DEFAULT_SOURCE_TIMEOUT_SECS),
        }
    }
}

/// Everything a tick needs, loaded and validated together.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub catalog: ApCatalog,
    pub beacon: BeaconConfig,
    pub sinks: Vec<SinkSpec>,
}

impl ConfigSnapshot {
    pub fn new(catalog: ApCatalog, beacon: BeaconConfig, sinks: Vec<SinkSpec>) -> Self {
        Self {
            catalog,
            beacon,
            sinks,
        }
    }

    /// When the underlying document was last updated.
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.catalog.last_updated()
    }

    pub fn credentials(&self) -> &ApiCredentials {
        self.catalog.credentials()
    }

    /// Distinct SSIDs in the catalog, in first-seen order.
    pub fn ssids(&self) -> Vec<String> {
        let mut ssids: Vec<String> = Vec::new();
        for ap in self.catalog.entries() {
            if !ssids.contains(&ap.ssid) {
                ssids.push(ap.ssid.clone());
            }
        }
        ssids
    }
}

/// Settings applied on top of every loaded document.
///
/// Used for command-line sinks and credentials.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Sinks appended after the document's own sinks.
    pub extra_sinks: Vec<SinkSpec>,
    /// Replaces the document's API user.
    pub credentials: Option<ApiCredentials>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.extra_sinks.is_empty() && self.credentials.is_none()
    }

    pub fn apply(&self, mut snapshot: ConfigSnapshot) -> ConfigSnapshot {
        snapshot.sinks.extend(self.extra_sinks.iter().cloned());
        if let Some(credentials) = &self.credentials {
            snapshot.catalog = snapshot.catalog.with_credentials(credentials.clone());
        }
        snapshot
    }
}

struct Versioned {
    generation: u64,
    snapshot: Arc<ConfigSnapshot>,
}

/// Shared handle to the active snapshot.
///
/// Readers take an `Arc` and keep it for a whole tick; a swap never mutates
/// a snapshot someone is holding.
#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Versioned>>,
}

impl SharedConfig {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Versioned {
                generation: 0,
                snapshot: Arc::new(snapshot),
            })),
        }
    }

    /// The active snapshot.
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard.snapshot)
    }

    /// The active snapshot together with its generation.
    pub fn versioned(&self) -> (u64, Arc<ConfigSnapshot>) {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        (guard.generation, Arc::clone(&guard.snapshot))
    }

    /// Incremented on every swap.
    pub fn generation(&self) -> u64 {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).generation
    }

    /// Atomically replace the active snapshot, returning the new generation.
    pub fn replace(&self, snapshot: ConfigSnapshot) -> u64 {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.generation += 1;
        guard.snapshot = Arc::new(snapshot);
        guard.generation
    }
}

impl std::fmt::Debug for SharedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConfig")
            .field("generation", &self.generation())
            .finish()
    }
}
