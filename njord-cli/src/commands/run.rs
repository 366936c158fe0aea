//! Run command - beacon until interrupted.

use tracing::{info, warn};

use njord::beacon::{BeaconRuntime, ConfigRefresher};

use super::common::BeaconArgs;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the beacon and config refresher until Ctrl-C.
pub async fn run(args: BeaconArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(&args)?;
    runner.log_startup("run");

    let (scheduler, loader) = runner.build(&args).await?;
    let refresher = ConfigRefresher::new(loader, scheduler.config().clone());
    let runtime = BeaconRuntime::start(scheduler, Some(refresher));

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received"),
        Err(e) => warn!(error = %e, "Unable to listen for interrupt, stopping"),
    }

    runtime.shutdown().await;
    Ok(())
}
