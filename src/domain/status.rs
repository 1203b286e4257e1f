use std::time::{SystemTime, UNIX_EPOCH};

use super::events::InboundEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    pub message: String,
    pub at_unix_ms: u128,
}

/// Connection state of one duplex channel session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub last_error: Option<StatusError>,
    pub updated_at_unix_ms: u128,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            is_connected: false,
            last_error: None,
            updated_at_unix_ms: now_unix_ms(),
        }
    }
}

impl ConnectionStatus {
    /// Applies a lifecycle event; returns false for non-lifecycle events.
    pub fn apply(&mut self, event: &InboundEvent) -> bool {
        match event {
            InboundEvent::Connect => {
                self.is_connected = true;
                self.last_error = None;
            }
            InboundEvent::Disconnect { .. } => self.is_connected = false,
            InboundEvent::Error { message } => self.record_error(message),
            InboundEvent::Reconnect { .. } => {}
            _ => return false,
        }

        self.updated_at_unix_ms = now_unix_ms();
        true
    }

    pub fn record_error(&mut self, message: &str) {
        let at_unix_ms = now_unix_ms();
        self.last_error = Some(StatusError {
            message: message.to_owned(),
            at_unix_ms,
        });
        self.updated_at_unix_ms = at_unix_ms;
    }

    pub fn mark_closed(&mut self) {
        self.is_connected = false;
        self.updated_at_unix_ms = now_unix_ms();
    }

    pub fn as_label(&self) -> &'static str {
        match (self.is_connected, self.last_error.is_some()) {
            (true, _) => "CONNECTED",
            (false, true) => "DISCONNECTED_WITH_ERROR",
            (false, false) => "DISCONNECTED",
        }
    }
}

pub fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
