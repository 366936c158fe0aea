//! Sink specifications.
//!
//! A [`SinkSpec`] binds one delivery channel to a sentence format and an
//! optional identifier alias. Specs are validated once when configuration
//! loads; the dispatcher never re-parses them.
//!
//! # Command-line syntax
//!
//! ```text
//! TYPE:PROTO:PORT[:HOST][:ALIAS]     udp / tcp
//! TYPE:stdout[:ALIAS]                console
//! ```
//!
//! Examples: `TAIP_PV:udp:21000`, `NMEA_RMC:tcp:9011:10.0.0.5:+2`,
//! `TAIP_PV:udp:21000::42` (broadcast with a fixed alias).

use std::fmt;
use std::str::FromStr;

use super::error::SinkSpecError;
use crate::wire::{MessageType, TaipAlias};

/// Limited broadcast address used when a UDP sink names no host.
pub const BROADCAST_HOST: &str = "255.255.255.255";

/// Delivery channel for a sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Datagram to `host:port`, or broadcast when `host` is `None`.
    Udp { host: Option<String>, port: u16 },
    /// Persistent stream connection.
    Tcp { host: String, port: u16 },
    /// Process console.
    Stdout,
}

impl Transport {
    /// Build a transport from its protocol name and endpoint parts.
    pub fn from_parts(
        protocol: &str,
        host: Option<&str>,
        port: Option<u16>,
    ) -> Result<Self, SinkSpecError> {
        let host = host.map(str::trim).filter(|h| !h.is_empty());

        match protocol.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(Transport::Udp {
                host: host.map(str::to_string),
                port: port.ok_or(SinkSpecError::MissingPort("udp"))?,
            }),
            "tcp" => Ok(Transport::Tcp {
                host: host.ok_or(SinkSpecError::MissingHost)?.to_string(),
                port: port.ok_or(SinkSpecError::MissingPort("tcp"))?,
            }),
            "stdout" | "console" => Ok(Transport::Stdout),
            other => Err(SinkSpecError::UnknownProtocol(other.to_string())),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Udp { host, port } => {
                write!(f, "udp://{}:{}", host.as_deref().unwrap_or(BROADCAST_HOST), port)
            }
            Transport::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
            Transport::Stdout => write!(f, "stdout"),
        }
    }
}

/// A validated sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SinkSpec {
    pub message: MessageType,
    pub transport: Transport,
    pub alias: Option<TaipAlias>,
}

impl SinkSpec {
    pub fn new(message: MessageType, transport: Transport) -> Self {
        Self {
            message,
            transport,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: TaipAlias) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Validate raw sink fields as they appear in configuration.
    pub fn from_parts(
        message: &str,
        protocol: &str,
        port: Option<u16>,
        host: Option<&str>,
        alias: Option<&str>,
    ) -> Result<Self, SinkSpecError> {
        let message: MessageType = message.parse()?;
        let transport = Transport::from_parts(protocol, host, port)?;
        let alias = alias
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::parse::<TaipAlias>)
            .transpose()?;

        Ok(Self {
            message,
            transport,
            alias,
        })
    }
}

impl fmt::Display for SinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.message, self.transport)?;
        if let Some(alias) = &self.alias {
            write!(f, " (alias {})", alias)?;
        }
        Ok(())
    }
}

impl FromStr for SinkSpec {
    type Err = SinkSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let malformed = || SinkSpecError::Malformed(s.to_string());

        let (message, protocol) = match parts.as_slice() {
            [message, protocol, ..] => (*message, *protocol),
            _ => return Err(malformed()),
        };

        if matches!(Transport::from_parts(protocol, None, None), Ok(Transport::Stdout)) {
            return match &parts[2..] {
                [] => Self::from_parts(message, protocol, None, None, None),
                [alias] => Self::from_parts(message, protocol, None, None, Some(*alias)),
                _ => Err(malformed()),
            };
        }

        let (port, host, alias) = match &parts[2..] {
            [port] => (*port, None, None),
            [port, host] => (*port, Some(*host), None),
            [port, host, alias] => (*port, Some(*host), Some(*alias)),
            _ => return Err(malformed()),
        };
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| SinkSpecError::InvalidPort(port.to_string()))?;

        Self::from_parts(message, protocol, Some(port), host, alias)
    }
}
