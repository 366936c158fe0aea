//! Source selector - picks the authoritative position for a tick.
//!
//! # Selection Logic
//!
//! The gateway's HDOP sorts each tick into one of three bands:
//!
//! 1. **Excellent** (`hdop <= excellent`): trust GNSS, WiFi is not consulted
//! 2. **Poor** (`hdop > poor`, or the fix is flagged invalid): GNSS is ignored,
//!    a WiFi match is required or the tick produces nothing
//! 3. **Borderline** (in between): WiFi wins when available, GNSS otherwise
//!
//! A NaN HDOP sorts as poor.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::state::{AuthoritativeFix, GatewayFix};
use crate::catalog::ApMatch;

/// Error when neither source yields a usable position.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    /// Gateway fix untrustworthy and no known access point in range.
    #[error("no fix available (gateway hdop {hdop}, valid {valid}, no WiFi match)")]
    NoFixAvailable { hdop: f64, valid: bool },
}

/// HDOP quality band of a gateway fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixQuality {
    Excellent,
    Borderline,
    Poor,
}

/// HDOP thresholds separating the quality bands.
///
/// `excellent < poor` is enforced when configuration is loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HdopThresholds {
    pub excellent: f64,
    pub poor: f64,
}

impl HdopThresholds {
    pub fn new(excellent: f64, poor: f64) -> Self {
        Self { excellent, poor }
    }

    /// Classify a gateway fix.
    ///
    /// The excellent check comes first and looks at HDOP alone.
    pub fn classify(&self, fix: &GatewayFix) -> FixQuality {
        if fix.hdop <= self.excellent {
            FixQuality::Excellent
        } else if fix.hdop.is_nan() || fix.hdop > self.poor || !fix.valid {
            FixQuality::Poor
        } else {
            FixQuality::Borderline
        }
    }

    /// True when scanning can be skipped for this fix.
    pub fn is_excellent(&self, fix: &GatewayFix) -> bool {
        self.classify(fix) == FixQuality::Excellent
    }
}

impl Default for HdopThresholds {
    fn default() -> Self {
        Self {
            excellent: crate::config::DEFAULT_HDOP_EXCELLENT,
            poor: crate::config::DEFAULT_HDOP_POOR,
        }
    }
}

/// Produce the authoritative fix for a tick.
///
/// # Arguments
///
/// * `gateway` - This tick's gateway reading (use [`GatewayFix::unavailable`] on read failure)
/// * `wifi` - Catalog match over the pooled scan observations, if any
/// * `thresholds` - Active HDOP thresholds
/// * `now` - Tick time, stamped onto WiFi-derived fixes
pub fn select_fix(
    gateway: &GatewayFix,
    wifi: Option<&ApMatch>,
    thresholds: &HdopThresholds,
    now: DateTime<Utc>,
) -> Result<AuthoritativeFix, SelectionError> {
    let from_wifi =
        |m: &ApMatch| AuthoritativeFix::from_wifi(m.latitude, m.longitude, now, gateway.unit_id);

    match (thresholds.classify(gateway), wifi) {
        (FixQuality::Excellent, _) => Ok(AuthoritativeFix::from_gateway(gateway)),
        (FixQuality::Poor, Some(m)) | (FixQuality::Borderline, Some(m)) => Ok(from_wifi(m)),
        (FixQuality::Poor, None) => Err(SelectionError::NoFixAvailable {
            hdop: gateway.hdop,
            valid: gateway.valid,
        }),
        (FixQuality::Borderline, None) => Ok(AuthoritativeFix::from_gateway(gateway)),
    }
}
