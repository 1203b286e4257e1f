//! Optional lifecycle hooks supplied by the caller of a connection manager.
//!
//! ```ignore
//! let callbacks = LifecycleCallbacks::new()
//!     .on_connect(|| tracing::info!("chat online"))
//!     .on_error(|message| tracing::warn!(%message, "chat error"));
//! ```

use std::{fmt, sync::Arc};

pub type OnConnectCallback = Arc<dyn Fn() + Send + Sync>;
pub type OnDisconnectCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type OnErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type OnReconnectCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// All hooks are optional and run after the connection status is updated.
#[derive(Clone, Default)]
pub struct LifecycleCallbacks {
    pub(crate) on_connect: Option<OnConnectCallback>,
    pub(crate) on_disconnect: Option<OnDisconnectCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
    pub(crate) on_reconnect: Option<OnReconnectCallback>,
}

impl fmt::Debug for LifecycleCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleCallbacks")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_reconnect", &self.on_reconnect.is_some())
            .finish()
    }
}

impl LifecycleCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// The callback receives the disconnect reason reported by the transport.
    pub fn on_disconnect(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// The callback receives the reconnect attempt number.
    pub fn on_reconnect(mut self, f: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_reconnect = Some(Arc::new(f));
        self
    }

    pub(crate) fn connected(&self) {
        if let Some(callback) = &self.on_connect {
            callback();
        }
    }

    pub(crate) fn disconnected(&self, reason: &str) {
        if let Some(callback) = &self.on_disconnect {
            callback(reason);
        }
    }

    pub(crate) fn errored(&self, message: &str) {
        if let Some(callback) = &self.on_error {
            callback(message);
        }
    }

    pub(crate) fn reconnected(&self, attempt: u32) {
        if let Some(callback) = &self.on_reconnect {
            callback(attempt);
        }
    }
}
