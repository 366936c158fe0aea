//! Beacon runtime.
//!
//! Owns the beacon and config-refresh tasks and their shared shutdown token.
//! The two tasks share nothing but the [`SharedConfig`] handle.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::refresher::ConfigRefresher;
use super::scheduler::BeaconScheduler;
use crate::config::SharedConfig;
use crate::gateway::{GatewayClient, RadioScanner};

/// Running beacon.
///
/// Dropping the runtime cancels both tasks without waiting; call
/// [`shutdown`](Self::shutdown) to wait for an in-flight tick.
pub struct BeaconRuntime {
    /// Cancels both tasks.
    shutdown_token: CancellationToken,

    /// Active configuration.
    config: SharedConfig,

    beacon_handle: Option<JoinHandle<()>>,
    refresh_handle: Option<JoinHandle<()>>,
}

impl BeaconRuntime {
    /// Spawn the scheduler and, when given, the refresher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<G, R>(scheduler: BeaconScheduler<G, R>, refresher: Option<ConfigRefresher>) -> Self
    where
        G: GatewayClient + 'static,
        R: RadioScanner + 'static,
    {
        let shutdown_token = CancellationToken::new();
        let config = scheduler.config().clone();

        let beacon_handle = tokio::spawn(scheduler.run(shutdown_token.clone()));
        let refresh_handle = refresher.map(|r| tokio::spawn(r.run(shutdown_token.clone())));

        info!(refresh = refresh_handle.is_some(), "Beacon runtime started");

        Self {
            shutdown_token,
            config,
            beacon_handle: Some(beacon_handle),
            refresh_handle,
        }
    }

    /// Get the shutdown token for external coordination.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// True while the beacon task is alive.
    pub fn is_running(&self) -> bool {
        self.beacon_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop both tasks, waiting for an in-flight tick to finish.
    pub async fn shutdown(mut self) {
        info!("Shutting down beacon runtime");
        self.shutdown_token.cancel();

        if let Some(handle) = self.beacon_handle.take() {
            match handle.await {
                Ok(()) => info!("Beacon scheduler shut down cleanly"),
                Err(e) => tracing::error!("Beacon scheduler task panicked: {}", e),
            }
        }

        if let Some(handle) = self.refresh_handle.take() {
            match handle.await {
                Ok(()) => info!("Config refresher shut down cleanly"),
                Err(e) => tracing::error!("Config refresher task panicked: {}", e),
            }
        }
    }
}

impl Drop for BeaconRuntime {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
