//! Arguments and resolution shared by the beacon commands.

use std::path::PathBuf;

use clap::Args;
use tracing::{info, warn};

use njord::catalog::ApiCredentials;
use njord::config::{config_file_path, ConfigOverrides, ConfigSource};
use njord::gateway::{default_gateway, gateway_base_url, DEFAULT_AOS_URL};
use njord::sink::{SinkSpec, Transport, DEFAULT_TCP_PORT};
use njord::wire::MessageType;

/// Options for loading configuration, reaching the gateway, and adding sinks.
#[derive(Debug, Args)]
pub struct BeaconArgs {
    /// Local configuration file; also the cache for --config-url
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Remote configuration document
    #[arg(short = 'C', long, value_name = "URL")]
    pub config_url: Option<String>,

    /// Gateway API base URL, or a file answering as a proxy API
    #[arg(short = 'b', long, value_name = "URL|PATH", default_value = DEFAULT_AOS_URL)]
    pub aos_url: String,

    /// Use this host's default gateway as the API address (overrides --aos-url)
    #[arg(short = 'g', long)]
    pub gateway: bool,

    /// Broadcast sentences on this UDP port (conventionally 21000)
    #[arg(short = 'U', long, value_name = "PORT")]
    pub udp_port: Option<u16>,

    /// Print sentences to standard output
    #[arg(short = 's', long)]
    pub stdout: bool,

    /// Send sentences to this TCP server
    #[arg(short = 'T', long, value_name = "HOST")]
    pub tcp_host: Option<String>,

    /// Port for --tcp-host
    #[arg(short = 't', long, value_name = "PORT", default_value_t = DEFAULT_TCP_PORT)]
    pub tcp_port: u16,

    /// Sentence type for --udp-port, --tcp-host and --stdout
    #[arg(short = 'm', long, value_name = "TYPE", default_value = "TAIP_PV")]
    pub message: MessageType,

    /// Extra sink, TYPE:PROTO:PORT[:HOST][:ALIAS] or TYPE:stdout[:ALIAS] (repeatable)
    #[arg(long = "sink", value_name = "SPEC")]
    pub sinks: Vec<SinkSpec>,

    /// Gateway API username (overrides the configuration)
    #[arg(short = 'u', long, requires = "password")]
    pub username: Option<String>,

    /// Gateway API password (overrides the configuration)
    #[arg(short = 'p', long, requires = "username")]
    pub password: Option<String>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl BeaconArgs {
    /// Sinks from the command line, in flag order.
    pub fn cli_sinks(&self) -> Vec<SinkSpec> {
        let mut sinks = Vec::new();
        if let Some(port) = self.udp_port {
            sinks.push(SinkSpec::new(self.message, Transport::Udp { host: None, port }));
        }
        if let Some(host) = &self.tcp_host {
            sinks.push(SinkSpec::new(
                self.message,
                Transport::Tcp {
                    host: host.clone(),
                    port: self.tcp_port,
                },
            ));
        }
        if self.stdout {
            sinks.push(SinkSpec::new(self.message, Transport::Stdout));
        }
        sinks.extend(self.sinks.iter().cloned());
        sinks
    }

    /// Settings layered over every loaded configuration.
    pub fn overrides(&self) -> ConfigOverrides {
        let credentials = match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(ApiCredentials::new(username, password)),
            _ => None,
        };
        ConfigOverrides {
            extra_sinks: self.cli_sinks(),
            credentials,
        }
    }

    /// Where configuration comes from.
    pub fn config_source(&self) -> ConfigSource {
        let path = self.config.clone().unwrap_or_else(config_file_path);
        match &self.config_url {
            Some(url) => ConfigSource::Remote {
                url: url.clone(),
                cache_path: path,
            },
            None => ConfigSource::Local(path),
        }
    }

    /// Gateway API base, resolving --gateway against the routing table.
    pub fn aos_base(&self) -> String {
        if !self.gateway {
            return self.aos_url.clone();
        }
        match default_gateway() {
            Some(addr) => {
                let base = gateway_base_url(addr);
                info!(base = %base, "Using default gateway for the API");
                base
            }
            None => {
                warn!(fallback = %self.aos_url, "No default gateway found");
                self.aos_url.clone()
            }
        }
    }
}
