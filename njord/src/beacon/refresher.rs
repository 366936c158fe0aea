//! Configuration refresh daemon.
//!
//! Periodically reloads the configuration source and swaps the shared
//! snapshot. A failed refresh is logged and the active snapshot stays in
//! place. The period follows the active snapshot's update interval.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::scheduler::{one_period_from_now, periodic};
use crate::config::{ConfigError, ConfigLoader, SharedConfig};

/// Result of one refresh attempt.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A new snapshot became active.
    Applied { generation: u64 },
    /// The source had nothing newer.
    Unchanged,
    /// The source could not be loaded; the active snapshot is retained.
    Failed(ConfigError),
}

/// Background daemon that keeps the shared configuration current.
pub struct ConfigRefresher {
    loader: ConfigLoader,
    config: SharedConfig,
}

impl ConfigRefresher {
    pub fn new(loader: ConfigLoader, config: SharedConfig) -> Self {
        Self { loader, config }
    }

    /// Attempt a single refresh.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        let current = self.config.current();
        match self.loader.refresh(&current).await {
            Ok(Some(snapshot)) => {
                let known_aps = snapshot.catalog.len();
                let sinks = snapshot.sinks.len();
                let last_updated = snapshot.last_updated();
                let generation = self.config.replace(snapshot);
                info!(
                    generation,
                    known_aps,
                    sinks,
                    last_updated = %last_updated,
                    "Configuration refreshed"
                );
                RefreshOutcome::Applied { generation }
            }
            Ok(None) => {
                debug!(source = %self.loader.source(), "Configuration unchanged");
                RefreshOutcome::Unchanged
            }
            Err(e) => {
                warn!(
                    source = %self.loader.source(),
                    error = %e,
                    "Configuration refresh failed, keeping active configuration"
                );
                RefreshOutcome::Failed(e)
            }
        }
    }

    /// Runs the refresher until shutdown is signalled.
    ///
    /// The first refresh happens one update interval after start; the
    /// startup load has just run.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut period = self.config.current().beacon.update_interval;
        info!(
            source = %self.loader.source(),
            update_interval_secs = period.as_secs_f64(),
            "Config refresher starting"
        );

        let mut interval = periodic(period, one_period_from_now(period));

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Config refresher shutting down");
                    break;
                }

                _ = interval.tick() => {
                    self.refresh_once().await;

                    let next = self.config.current().beacon.update_interval;
                    if next != period {
                        info!(
                            old_secs = period.as_secs_f64(),
                            new_secs = next.as_secs_f64(),
                            "Update interval changed, rebuilding timer"
                        );
                        period = next;
                        interval = periodic(period, one_period_from_now(period));
                    }
                }
            }
        }
    }
}
