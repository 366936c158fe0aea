//! Sink specifications and delivery.
//!
//! - [`SinkSpec`] - Validated (message type, transport, alias) triple
//! - [`Dispatcher`] - Renders a fix and delivers it to every sink

mod dispatcher;
mod error;
mod spec;

pub use dispatcher::{
    render, ConsoleWriter, DispatchReport, Dispatcher, DispatcherConfig, RenderedBatch,
    SinkDelivery, SinkOutcome, DEFAULT_CONNECT_TIMEOUT, DEFAULT_WRITE_TIMEOUT,
};
pub use error::{DeliveryError, SinkSpecError};
pub use spec::{SinkSpec, Transport, BROADCAST_HOST};

/// Default UDP broadcast port.
pub const DEFAULT_UDP_PORT: u16 = 21000;

/// Default TCP sink port.
pub const DEFAULT_TCP_PORT: u16 = 9011;
