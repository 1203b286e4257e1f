//! Transport layer: the duplex channel seam and the connection manager built
//! on top of it.

pub mod callbacks;
pub mod connection_manager;
pub mod loopback;

use std::sync::Arc;

use thiserror::Error;

use crate::domain::events::{EventName, InboundEvent, OutboundEvent};

/// Listener attached to the transport for one event name.
pub type Listener = Arc<dyn Fn(&InboundEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Not connected to chat server")]
    NotConnected,
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("failed to emit {event}: {reason}")]
    Emit { event: &'static str, reason: String },
}

/// Event-based duplex channel. Implementations deliver inbound events by
/// invoking the listeners attached for the event's name.
pub trait Transport: Send + Sync {
    fn connect(&self, url: &str) -> Result<(), TransportError>;
    fn disconnect(&self);
    fn emit(&self, event: &OutboundEvent) -> Result<(), TransportError>;
    fn on(&self, name: EventName, listener: Listener) -> ListenerId;
    fn off(&self, name: EventName, id: ListenerId);
}

/// Returns the transport module name for smoke checks.
pub fn module_name() -> &'static str {
    "transport"
}
