//! njord CLI - Command-line interface
//!
//! This binary runs the njord beacon against an AirLink OS gateway.

mod commands;
mod error;
mod runner;

use std::process;

use clap::{Parser, Subcommand};

use commands::common::BeaconArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "njord")]
#[command(version = njord::VERSION)]
#[command(about = "GNSS beacon augmented with known WiFi access points", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the beacon until interrupted
    Run(BeaconArgs),

    /// Run a single beacon tick and print its sentences to stdout
    Probe(BeaconArgs),
}

fn main() {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => CliError::Runtime(e).exit(),
    };

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Run(args) => commands::run::run(args).await.map(|()| 0),
            Commands::Probe(args) => commands::probe::run(args).await.map(|o| o.exit_code()),
        }
    });

    match result {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(e) => e.exit(),
    }
}
