//! Default values for beacon configuration.

use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Beacon cadence
// =============================================================================

/// Seconds between beacon transmissions.
pub const DEFAULT_BEACON_INTERVAL_SECS: f64 = 1.0;

/// Seconds between configuration refreshes.
pub const DEFAULT_UPDATE_INTERVAL_SECS: f64 = 3600.0;

// =============================================================================
// Source selection
// =============================================================================

/// HDOP at or below which the gateway fix is trusted outright.
pub const DEFAULT_HDOP_EXCELLENT: f64 = 2.0;

/// HDOP above which the gateway fix is ignored.
pub const DEFAULT_HDOP_POOR: f64 = 6.0;

/// WiFi scans per tick when the gateway fix is not excellent.
pub const DEFAULT_NUM_WIFI_SCAN: u32 = 1;

/// Seconds to wait after each WiFi scan.
pub const DEFAULT_WIFI_SCAN_DELAY_SECS: f64 = 0.5;

/// Timeout in seconds for each gateway or scan call.
pub const DEFAULT_SOURCE_TIMEOUT_SECS: f64 = 5.0;

/// Upper bound in seconds for any configured interval, delay or timeout (one week).
pub const MAX_DURATION_SECS: f64 = 604_800.0;

// =============================================================================
// Identity and transport
// =============================================================================

/// Unit identifier used when the gateway reports none.
pub const DEFAULT_TAIP_ID: u32 = 0;

/// Timeout for downloading a remote configuration document.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Get the path to the config directory (~/.njord).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".njord")
}

/// Get the path to the config file (~/.njord/config.json).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.json")
}
