//! Sink dispatcher - fans one fix out to every configured sink.
//!
//! # Rendering
//!
//! The fix is encoded once per distinct `(message type, resolved id)` pair,
//! then every sink requesting that pair receives the same bytes. An encoding
//! failure skips only the sinks bound to that pair.
//!
//! # Transports
//!
//! - **UDP**: a single socket, bound on first use with broadcast enabled
//! - **TCP**: one persistent connection per `(host, port)`; a failed connect
//!   or write drops the connection and the next tick reconnects. A cached
//!   connection the peer has closed is replaced before writing
//! - **STDOUT**: newline-terminated write to the console writer
//!
//! Deliveries within a tick run concurrently and fail independently.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::OnceCell;
use tracing::{debug, info, trace, warn};

use super::error::DeliveryError;
use super::spec::{SinkSpec, Transport, BROADCAST_HOST};
use crate::position::AuthoritativeFix;
use crate::wire::{self, EncodingError, MessageType, TaipAlias};

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default per-send timeout for UDP and TCP.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Console writer shared with the dispatcher.
pub type ConsoleWriter = Box<dyn Write + Send>;

/// TCP endpoint key.
type Endpoint = (String, u16);

/// One connection slot; `None` until connected or after a failure.
type ConnectionSlot = Arc<tokio::sync::Mutex<Option<TcpStream>>>;

/// Dispatcher timeouts.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Result of delivering to a single sink.
#[derive(Debug)]
pub enum SinkOutcome {
    /// Sentence delivered; carries the byte count.
    Delivered(usize),
    /// Transport failure.
    Failed(DeliveryError),
    /// Sentence could not be rendered for this sink.
    Skipped(EncodingError),
}

/// Per-sink record in a [`DispatchReport`].
#[derive(Debug)]
pub struct SinkDelivery {
    pub sink: SinkSpec,
    pub outcome: SinkOutcome,
}

/// Summary of one dispatch.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Distinct sentences rendered.
    pub rendered: usize,
    /// Outcome per sink, in configured order.
    pub deliveries: Vec<SinkDelivery>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.count(|o| matches!(o, SinkOutcome::Delivered(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SinkOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SinkOutcome::Skipped(_)))
    }

    fn count(&self, f: impl Fn(&SinkOutcome) -> bool) -> usize {
        self.deliveries.iter().filter(|d| f(&d.outcome)).count()
    }
}

/// Render key: TAIP carries an identifier, NMEA does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct RenderKey {
    message: MessageType,
    id: Option<u32>,
}

/// Delivers rendered sentences to sinks.
pub struct Dispatcher {
    config: DispatcherConfig,
    udp: OnceCell<UdpSocket>,
    tcp: Mutex<HashMap<Endpoint, ConnectionSlot>>,
    console: Mutex<ConsoleWriter>,
}

impl Dispatcher {
    /// Create a dispatcher that writes console sinks to stdout.
    pub fn new(config: DispatcherConfig) -> Self {
        Self::with_console(config, Box::new(std::io::stdout()))
    }

    /// Create a dispatcher with a custom console writer.
    pub fn with_console(config: DispatcherConfig, console: ConsoleWriter) -> Self {
        Self {
            config,
            udp: OnceCell::new(),
            tcp: Mutex::new(HashMap::new()),
            console: Mutex::new(console),
        }
    }

    /// Encode `fix` and deliver it to every sink.
    ///
    /// `default_id` is the identifier base used when the fix carries no unit id.
    pub async fn dispatch(
        &self,
        fix: &AuthoritativeFix,
        sinks: &[SinkSpec],
        default_id: u32,
    ) -> DispatchReport {
        let batch = render(fix, sinks, default_id);
        self.deliver(&batch).await
    }

    /// Deliver a rendered batch to its sinks concurrently.
    pub async fn deliver(&self, batch: &RenderedBatch<'_>) -> DispatchReport {
        let deliveries = batch.sinks.iter().zip(&batch.keys).map(|(sink, key)| {
            let sentence = batch.sentence(key);
            async move {
                let outcome = match sentence {
                    Ok(sentence) => match self.send(&sink.transport, sentence).await {
                        Ok(bytes) => SinkOutcome::Delivered(bytes),
                        Err(e) => {
                            warn!(sink = %sink, error = %e, "Sink delivery failed");
                            SinkOutcome::Failed(e)
                        }
                    },
                    Err(e) => {
                        warn!(sink = %sink, error = %e, "Skipping sink, sentence not encodable");
                        SinkOutcome::Skipped(e)
                    }
                };
                SinkDelivery {
                    sink: sink.clone(),
                    outcome,
                }
            }
        });

        let report = DispatchReport {
            rendered: batch.rendered(),
            deliveries: join_all(deliveries).await,
        };

        debug!(
            rendered = report.rendered,
            delivered = report.delivered(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Dispatch complete"
        );
        report
    }

    /// Close TCP connections whose endpoint is not used by `sinks`.
    pub fn retain_endpoints(&self, sinks: &[SinkSpec]) {
        let active: HashSet<Endpoint> = sinks
            .iter()
            .filter_map(|s| match &s.transport {
                Transport::Tcp { host, port } => Some((host.clone(), *port)),
                _ => None,
            })
            .collect();

        let mut connections = self.tcp.lock().unwrap_or_else(|e| e.into_inner());
        let before = connections.len();
        connections.retain(|endpoint, _| active.contains(endpoint));
        let closed = before - connections.len();
        if closed > 0 {
            info!(closed, remaining = connections.len(), "Closed connections to removed sinks");
        }
    }

    /// Number of TCP endpoints currently tracked.
    pub fn tracked_endpoints(&self) -> usize {
        self.tcp.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    async fn send(&self, transport: &Transport, sentence: &str) -> Result<usize, DeliveryError> {
        match transport {
            Transport::Udp { host, port } => {
                let host = host.as_deref().unwrap_or(BROADCAST_HOST);
                self.send_udp(host, *port, sentence.as_bytes()).await
            }
            Transport::Tcp { host, port } => self.send_tcp(host, *port, sentence.as_bytes()).await,
            Transport::Stdout => self.write_console(sentence),
        }
    }

    async fn send_udp(&self, host: &str, port: u16, payload: &[u8]) -> Result<usize, DeliveryError> {
        let socket = self
            .udp
            .get_or_try_init(|| async {
                let socket = UdpSocket::bind("0.0.0.0:0").await?;
                socket.set_broadcast(true)?;
                debug!(local_addr = ?socket.local_addr().ok(), "UDP sink socket bound");
                Ok::<_, std::io::Error>(socket)
            })
            .await
            .map_err(DeliveryError::Bind)?;

        let endpoint = format!("{}:{}", host, port);
        match tokio::time::timeout(self.config.write_timeout, socket.send_to(payload, (host, port)))
            .await
        {
            Ok(Ok(sent)) => {
                trace!(endpoint = %endpoint, bytes = sent, "Datagram sent");
                Ok(sent)
            }
            Ok(Err(source)) => Err(DeliveryError::Send { endpoint, source }),
            Err(_) => Err(DeliveryError::WriteTimeout { endpoint }),
        }
    }

    async fn send_tcp(&self, host: &str, port: u16, payload: &[u8]) -> Result<usize, DeliveryError> {
        let slot = {
            let mut connections = self.tcp.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(connections.entry((host.to_string(), port)).or_default())
        };
        let endpoint = format!("{}:{}", host, port);

        let mut guard = slot.lock().await;
        if guard.as_ref().is_some_and(peer_closed) {
            info!(endpoint = %endpoint, "TCP sink closed by peer, reconnecting");
            *guard = None;
        }
        if guard.is_none() {
            let stream =
                match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect((host, port)))
                    .await
                {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(source)) => return Err(DeliveryError::Connect { endpoint, source }),
                    Err(_) => return Err(DeliveryError::ConnectTimeout { endpoint }),
                };
            info!(endpoint = %endpoint, "TCP sink connected");
            *guard = Some(stream);
        }

        let Some(stream) = guard.as_mut() else {
            return Err(DeliveryError::ConnectTimeout { endpoint });
        };

        let result = tokio::time::timeout(self.config.write_timeout, stream.write_all(payload)).await;
        match result {
            Ok(Ok(())) => Ok(payload.len()),
            Ok(Err(source)) => {
                *guard = None;
                Err(DeliveryError::Write { endpoint, source })
            }
            Err(_) => {
                *guard = None;
                Err(DeliveryError::WriteTimeout { endpoint })
            }
        }
    }

    fn write_console(&self, sentence: &str) -> Result<usize, DeliveryError> {
        let line = format!("{}\n", sentence.trim_end_matches(['\r', '\n']));
        let mut console = self.console.lock().unwrap_or_else(|e| e.into_inner());
        console
            .write_all(line.as_bytes())
            .and_then(|_| console.flush())
            .map_err(DeliveryError::Console)?;
        Ok(line.len())
    }
}

/// Whether the peer has closed or reset a cached connection.
///
/// Sink servers are not expected to send anything, so readable bytes are
/// discarded and the connection is kept.
fn peer_closed(stream: &TcpStream) -> bool {
    let mut buf = [0u8; 64];
    loop {
        match stream.try_read(&mut buf) {
            Ok(0) => return true,
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return false,
            Err(_) => return true,
        }
    }
}

/// Sentences rendered for one fix, ready for delivery.
///
/// Each distinct `(message type, resolved id)` is encoded exactly once.
pub struct RenderedBatch<'a> {
    sinks: &'a [SinkSpec],
    keys: Vec<Result<RenderKey, EncodingError>>,
    sentences: BTreeMap<RenderKey, Result<String, EncodingError>>,
}

impl RenderedBatch<'_> {
    /// Number of distinct sentences successfully encoded.
    pub fn rendered(&self) -> usize {
        self.sentences.values().filter(|r| r.is_ok()).count()
    }

    /// Sentence for each sink, in configured order.
    pub fn sentences(&self) -> impl Iterator<Item = (&SinkSpec, Result<&str, EncodingError>)> {
        self.sinks
            .iter()
            .zip(&self.keys)
            .map(|(sink, key)| (sink, self.sentence(key)))
    }

    fn sentence(&self, key: &Result<RenderKey, EncodingError>) -> Result<&str, EncodingError> {
        let key = key.as_ref().map_err(Clone::clone)?;
        match self.sentences.get(key) {
            Some(Ok(sentence)) => Ok(sentence.as_str()),
            Some(Err(e)) => Err(e.clone()),
            None => Err(EncodingError::UnknownMessageType(key.message.to_string())),
        }
    }
}

/// Encode `fix` for every sink.
pub fn render<'a>(fix: &AuthoritativeFix, sinks: &'a [SinkSpec], default_id: u32) -> RenderedBatch<'a> {
    let base = fix.unit_id.unwrap_or(default_id);

    let mut keys = Vec::with_capacity(sinks.len());
    let mut sentences = BTreeMap::new();
    for sink in sinks {
        let key = render_key(sink, base);
        if let Ok(key) = &key {
            sentences
                .entry(*key)
                .or_insert_with(|| wire::encode(key.message, fix, key.id.unwrap_or(0)));
        }
        keys.push(key);
    }

    RenderedBatch {
        sinks,
        keys,
        sentences,
    }
}

fn render_key(sink: &SinkSpec, base: u32) -> Result<RenderKey, EncodingError> {
    let id = if sink.message.uses_identifier() {
        Some(TaipAlias::resolve(sink.alias.as_ref(), base)?)
    } else {
        None
    };
    Ok(RenderKey {
        message: sink.message,
        id,
    })
}
