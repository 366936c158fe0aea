//! njord - GNSS beacon augmented with known WiFi access points.
//!
//! A buoy or vessel reports its position from a cellular gateway's GNSS
//! receiver. When the gateway's fix degrades, WiFi access points with
//! surveyed positions stand in for it. Every beacon interval the library:
//!
//! 1. Reads the gateway fix and, unless it is excellent, scans for known APs
//! 2. Selects the authoritative position ([`position::select_fix`])
//! 3. Encodes it as TAIP `PV` and/or NMEA `RMC` ([`wire`])
//! 4. Delivers the sentences over UDP, TCP and stdout ([`sink`])
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use njord::beacon::{BeaconRuntime, BeaconScheduler};
//! use njord::sink::{Dispatcher, DispatcherConfig};
//!
//! let gateway = Arc::new(AosClient::new(DEFAULT_AOS_URL, credentials, DEFAULT_HTTP_TIMEOUT)?);
//! let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig::default()));
//! let scheduler = BeaconScheduler::new(gateway.clone(), gateway, shared_config, dispatcher);
//!
//! let runtime = BeaconRuntime::start(scheduler, Some(refresher));
//! tokio::signal::ctrl_c().await?;
//! runtime.shutdown().await;
//! ```

pub mod beacon;
pub mod catalog;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod position;
pub mod sink;
pub mod wire;

/// Version of the njord library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
