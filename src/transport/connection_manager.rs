use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Weak,
    },
};

use crate::{
    domain::{
        events::{EventName, InboundEvent, OutboundEvent},
        status::ConnectionStatus,
    },
    transport::{callbacks::LifecycleCallbacks, ListenerId, Transport, TransportError},
};

const CHAT_CHANNEL_CONNECTED: &str = "CHAT_CHANNEL_CONNECTED";
const CHAT_CHANNEL_DISCONNECTED: &str = "CHAT_CHANNEL_DISCONNECTED";
const CHAT_CHANNEL_ERROR: &str = "CHAT_CHANNEL_ERROR";
const CHAT_CHANNEL_RECONNECTING: &str = "CHAT_CHANNEL_RECONNECTING";
const CHAT_CHANNEL_TORN_DOWN: &str = "CHAT_CHANNEL_TORN_DOWN";

/// Handler registered on the manager for one event name.
pub type Handler = Arc<dyn Fn(&InboundEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
struct HandlerRegistry {
    next_id: u64,
    entries: BTreeMap<EventName, Vec<(HandlerId, Handler)>>,
}

impl HandlerRegistry {
    fn add(&mut self, name: EventName, handler: Handler) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.entries.entry(name).or_default().push((id, handler));
        id
    }

    fn remove(&mut self, name: EventName, id: Option<HandlerId>) {
        match id {
            Some(id) => {
                if let Some(handlers) = self.entries.get_mut(&name) {
                    handlers.retain(|(existing, _)| *existing != id);
                }
            }
            None => {
                self.entries.remove(&name);
            }
        }
    }

    fn for_event(&self, name: EventName) -> Vec<Handler> {
        self.entries
            .get(&name)
            .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }

    fn count(&self, name: EventName) -> usize {
        self.entries.get(&name).map_or(0, Vec::len)
    }
}

/// State reachable from transport listeners.
struct Shared {
    status: Mutex<ConnectionStatus>,
    handlers: Mutex<HandlerRegistry>,
    callbacks: LifecycleCallbacks,
}

impl Shared {
    fn status(&self) -> ConnectionStatus {
        self.status
            .lock()
            .map(|status| status.clone())
            .unwrap_or_default()
    }

    /// Status first, then the caller's lifecycle hook, then registered handlers.
    fn dispatch(&self, event: &InboundEvent) {
        if let Ok(mut status) = self.status.lock() {
            status.apply(event);
        }

        match event {
            InboundEvent::Connect => {
                tracing::info!(code = CHAT_CHANNEL_CONNECTED, "chat channel connected");
                self.callbacks.connected();
            }
            InboundEvent::Disconnect { reason } => {
                tracing::info!(
                    code = CHAT_CHANNEL_DISCONNECTED,
                    reason = %reason,
                    "chat channel disconnected"
                );
                self.callbacks.disconnected(reason);
            }
            InboundEvent::Error { message } => {
                tracing::warn!(code = CHAT_CHANNEL_ERROR, error = %message, "chat channel error");
                self.callbacks.errored(message);
            }
            InboundEvent::Reconnect { attempt } => {
                tracing::info!(
                    code = CHAT_CHANNEL_RECONNECTING,
                    attempt,
                    "chat channel reconnect attempt"
                );
                self.callbacks.reconnected(*attempt);
            }
            _ => {}
        }

        let handlers = self
            .handlers
            .lock()
            .map(|registry| registry.for_event(event.name()))
            .unwrap_or_default();

        for handler in handlers {
            handler(event);
        }
    }

    fn report_error(&self, message: &str) {
        if let Ok(mut status) = self.status.lock() {
            status.record_error(message);
        }
        tracing::warn!(code = CHAT_CHANNEL_ERROR, error = %message, "chat channel error");
        self.callbacks.errored(message);
    }
}

/// Read-only view of a manager's connection status for use inside handlers.
#[derive(Clone)]
pub struct ConnectionProbe {
    shared: Weak<Shared>,
}

impl ConnectionProbe {
    pub fn status(&self) -> ConnectionStatus {
        self.shared
            .upgrade()
            .map(|shared| shared.status())
            .unwrap_or_default()
    }
}

impl fmt::Debug for ConnectionProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProbe")
            .field("attached", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Owns one channel session: lifecycle state, caller hooks and the handler
/// registry. Handlers live in the manager rather than on the transport, so
/// they survive reconnects.
pub struct ConnectionManager {
    url: String,
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    attached: Mutex<Vec<(EventName, ListenerId)>>,
    torn_down: AtomicBool,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.url)
            .field("status", &self.status())
            .field("callbacks", &self.shared.callbacks)
            .field("torn_down", &self.torn_down.load(Ordering::SeqCst))
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        url: impl Into<String>,
        callbacks: LifecycleCallbacks,
    ) -> Self {
        Self {
            url: url.into(),
            transport,
            shared: Arc::new(Shared {
                status: Mutex::new(ConnectionStatus::default()),
                handlers: Mutex::new(HandlerRegistry::default()),
                callbacks,
            }),
            attached: Mutex::new(Vec::new()),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Opens the channel. Failures are recorded in the status and reported
    /// through the error hook.
    pub fn connect(&self) {
        if self.torn_down.load(Ordering::SeqCst) {
            return;
        }

        self.attach_listeners();

        if self.is_connected() {
            return;
        }

        if let Err(error) = self.transport.connect(&self.url) {
            self.shared.report_error(&error.to_string());
        }
    }

    pub fn disconnect(&self) {
        self.transport.disconnect();
        if let Ok(mut status) = self.shared.status.lock() {
            status.mark_closed();
        }
    }

    /// Emits without reporting failure to the caller; see [`Self::try_emit`].
    pub fn emit(&self, event: &OutboundEvent) {
        let _ = self.try_emit(event);
    }

    /// Emits and returns the failure in addition to recording it.
    pub fn try_emit(&self, event: &OutboundEvent) -> Result<(), TransportError> {
        if !self.is_connected() {
            let error = TransportError::NotConnected;
            self.shared.report_error(&error.to_string());
            return Err(error);
        }

        self.transport
            .emit(event)
            .inspect_err(|error| self.shared.report_error(&error.to_string()))
    }

    pub fn on<F>(&self, name: EventName, handler: F) -> HandlerId
    where
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        match self.shared.handlers.lock() {
            Ok(mut registry) => registry.add(name, Arc::new(handler)),
            Err(poisoned) => poisoned.into_inner().add(name, Arc::new(handler)),
        }
    }

    /// Removes one handler, or every handler for `name` when `id` is `None`.
    pub fn off(&self, name: EventName, id: Option<HandlerId>) {
        if let Ok(mut registry) = self.shared.handlers.lock() {
            registry.remove(name, id);
        }
    }

    pub fn handler_count(&self, name: EventName) -> usize {
        self.shared
            .handlers
            .lock()
            .map(|registry| registry.count(name))
            .unwrap_or_default()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    pub fn probe(&self) -> ConnectionProbe {
        ConnectionProbe {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Detaches every transport listener, drops all handlers and closes the
    /// channel. Safe to call more than once.
    pub fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let attached = self
            .attached
            .lock()
            .map(|mut attached| std::mem::take(&mut *attached))
            .unwrap_or_default();
        for (name, id) in attached {
            self.transport.off(name, id);
        }

        if let Ok(mut registry) = self.shared.handlers.lock() {
            registry.entries.clear();
        }

        self.disconnect();

        tracing::debug!(
            code = CHAT_CHANNEL_TORN_DOWN,
            url = %self.url,
            "connection manager torn down"
        );
    }

    fn attach_listeners(&self) {
        let Ok(mut attached) = self.attached.lock() else {
            return;
        };

        if !attached.is_empty() {
            return;
        }

        for name in EventName::ALL {
            let shared = Arc::downgrade(&self.shared);
            let id = self.transport.on(
                name,
                Arc::new(move |event: &InboundEvent| {
                    if let Some(shared) = shared.upgrade() {
                        shared.dispatch(event);
                    }
                }),
            );
            attached.push((name, id));
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
