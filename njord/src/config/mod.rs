//! Configuration for the beacon.
//!
//! Configuration is a single JSON document holding the known access point
//! catalog, gateway API credentials, beacon settings and sinks. It is parsed
//! and validated into an immutable [`ConfigSnapshot`]; the running beacon
//! reads it through a [`SharedConfig`] handle that swaps whole snapshots.
//!
//! # Example
//!
//! ```no_run
//! use njord::config::{ConfigLoader, ConfigOverrides, ConfigSource, SharedConfig};
//!
//! # async fn example() -> Result<(), njord::config::ConfigError> {
//! let source = ConfigSource::Local(njord::config::config_file_path());
//! let loader = ConfigLoader::new(source, ConfigOverrides::default())?;
//! let shared = SharedConfig::new(loader.load_initial().await?);
//! println!("{} known access points", shared.current().catalog.len());
//! # Ok(())
//! # }
//! ```

mod defaults;
mod document;
mod error;
mod snapshot;
mod source;

pub use defaults::*;
pub use document::parse_config;
pub use error::ConfigError;
pub use snapshot::{BeaconConfig, ConfigOverrides, ConfigSnapshot, SharedConfig};
pub use source::{write_atomic, ConfigLoader, ConfigSource};
