//! Probe command - run a single tick and print its sentences.
//!
//! Every configured sink is redirected to stdout, so the probe never sends
//! on the network. Without configured sinks both sentence types are printed.

use njord::sink::{SinkSpec, Transport};
use njord::wire::MessageType;

use super::common::BeaconArgs;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Exit status when no position was available.
pub const NO_FIX_EXIT_CODE: i32 = 2;

/// Result of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Fix,
    NoFix,
}

impl ProbeOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            ProbeOutcome::Fix => 0,
            ProbeOutcome::NoFix => NO_FIX_EXIT_CODE,
        }
    }
}

/// Stdout copies of the configured sinks, one per distinct sentence.
fn probe_sinks(configured: &[SinkSpec]) -> Vec<SinkSpec> {
    let mut sinks: Vec<SinkSpec> = Vec::new();
    for sink in configured {
        let redirected = SinkSpec {
            transport: Transport::Stdout,
            ..sink.clone()
        };
        if !sinks.contains(&redirected) {
            sinks.push(redirected);
        }
    }
    if sinks.is_empty() {
        sinks = vec![
            SinkSpec::new(MessageType::TaipPv, Transport::Stdout),
            SinkSpec::new(MessageType::NmeaRmc, Transport::Stdout),
        ];
    }
    sinks
}

/// Run one tick against the gateway.
pub async fn run(args: BeaconArgs) -> Result<ProbeOutcome, CliError> {
    let runner = CliRunner::new(&args)?;
    runner.log_startup("probe");

    let (mut scheduler, _) = runner.build(&args).await?;
    let config = scheduler.config().clone();
    let mut snapshot = (*config.current()).clone();
    snapshot.sinks = probe_sinks(&snapshot.sinks);
    config.replace(snapshot);

    let report = scheduler.tick().await;

    eprintln!(
        "Gateway: lat {:.6} lon {:.6} hdop {:.1} valid {}",
        report.gateway.latitude, report.gateway.longitude, report.gateway.hdop, report.gateway.valid
    );
    eprintln!("Phases:  {}", report.path());

    match &report.selection {
        Ok(fix) => {
            eprintln!(
                "Fix:     {} lat {:.6} lon {:.6}",
                fix.source, fix.latitude, fix.longitude
            );
            Ok(ProbeOutcome::Fix)
        }
        Err(e) => {
            eprintln!("Fix:     none ({})", e);
            Ok(ProbeOutcome::NoFix)
        }
    }
}
