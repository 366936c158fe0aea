//! Gateway and radio scan sources.
//!
//! The beacon consumes two collaborator traits:
//!
//! - [`GatewayClient`] - the gateway's GNSS fix
//! - [`RadioScanner`] - WiFi access points currently in range
//!
//! [`AosClient`] implements both against a Sierra Wireless AirLink OS
//! router, or against a canned response file for bench testing.
//!
//! # Architecture
//!
//! ```text
//! BeaconScheduler (tick loop)
//!     │
//!     ├── GatewayClient::read_fix ──┐
//!     │                             ├── AosClient ── POST /api/v1/db/get
//!     └── RadioScanner::scan ───────┘
//! ```

mod aos;
mod client;
mod error;
mod keys;
mod route;

pub use aos::{AosClient, DEFAULT_AOS_URL, DEFAULT_HTTP_TIMEOUT};
pub use client::{GatewayClient, RadioScanner};
pub use error::SourceError;
pub use keys::{parse_gnss, parse_scan_blocks, parse_wifi, wifi_scan_key, WIFI_BANDS};
pub use route::{default_gateway, gateway_base_url, parse_default_gateway, PROC_NET_ROUTE};
