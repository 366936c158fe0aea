//! Source traits consumed by the beacon.
//!
//! The scheduler only sees these traits, so tests and bench setups can swap
//! in scripted sources without a gateway on the network.

use std::future::Future;

use super::error::SourceError;
use crate::catalog::{ApiCredentials, ScanObservation};
use crate::position::GatewayFix;

/// Source of the gateway's GNSS fix.
pub trait GatewayClient: Send + Sync {
    /// Read the current fix.
    fn read_fix(&self) -> impl Future<Output = Result<GatewayFix, SourceError>> + Send;

    /// Adopt new API credentials. Sources without authentication ignore this.
    fn update_credentials(&self, _credentials: &ApiCredentials) {}
}

/// Source of WiFi scan observations.
pub trait RadioScanner: Send + Sync {
    /// Perform one scan, reporting access points for the given networks.
    ///
    /// `ssids` lists the catalog's networks; scanners that see every network
    /// may ignore it.
    fn scan(
        &self,
        ssids: &[String],
    ) -> impl Future<Output = Result<Vec<ScanObservation>, SourceError>> + Send;
}
