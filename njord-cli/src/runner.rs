//! CLI runner for common setup.
//!
//! Encapsulates logging initialization, configuration loading and gateway
//! client creation shared by the beacon commands.

use std::sync::Arc;

use tracing::info;

use njord::beacon::BeaconScheduler;
use njord::config::{ConfigLoader, SharedConfig};
use njord::gateway::{AosClient, DEFAULT_HTTP_TIMEOUT};
use njord::logging::{init_logging, LoggingGuard};
use njord::sink::{Dispatcher, DispatcherConfig};

use crate::commands::common::BeaconArgs;
use crate::error::CliError;

/// Scheduler wired to a gateway client serving both fixes and scans.
pub type AosScheduler = BeaconScheduler<AosClient, AosClient>;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
}

impl CliRunner {
    /// Initialize logging from the command-line flags.
    pub fn new(args: &BeaconArgs) -> Result<Self, CliError> {
        let logging_guard = init_logging(args.log_file.as_deref(), args.verbose)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;
        Ok(Self { logging_guard })
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("njord v{}", njord::VERSION);
        info!("njord CLI: {} command", command);
    }

    /// Load the startup configuration and build the scheduler.
    ///
    /// Returns the loader as well so the caller can keep refreshing.
    pub async fn build(&self, args: &BeaconArgs) -> Result<(AosScheduler, ConfigLoader), CliError> {
        let loader = ConfigLoader::new(args.config_source(), args.overrides())?;
        let snapshot = loader.load_initial().await?;
        info!(
            source = %loader.source(),
            known_aps = snapshot.catalog.len(),
            sinks = snapshot.sinks.len(),
            last_updated = %snapshot.last_updated(),
            "Configuration loaded"
        );

        let client = Arc::new(AosClient::new(
            &args.aos_base(),
            snapshot.credentials().clone(),
            DEFAULT_HTTP_TIMEOUT,
        )?);
        let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig::default()));
        let shared = SharedConfig::new(snapshot);

        let scheduler = BeaconScheduler::new(Arc::clone(&client), client, shared, dispatcher);
        Ok((scheduler, loader))
    }
}
