//! In-process transport. Connects immediately, records emitted events and can
//! echo `send-message` back the way the chat server confirms a send.

use std::{collections::BTreeMap, fmt, sync::Mutex};

use uuid::Uuid;

use crate::{
    domain::{
        events::{EventName, InboundEvent, OutboundEvent},
        message::{DeliveryState, Message},
    },
    transport::{Listener, ListenerId, Transport, TransportError},
};

const CLIENT_DISCONNECT_REASON: &str = "io client disconnect";

#[derive(Default)]
struct LoopbackState {
    connected: bool,
    echo: bool,
    next_listener: u64,
    listeners: BTreeMap<EventName, Vec<(ListenerId, Listener)>>,
    emitted: Vec<OutboundEvent>,
    connect_calls: usize,
    fail_next_connect: Option<String>,
}

#[derive(Default)]
pub struct LoopbackTransport {
    state: Mutex<LoopbackState>,
}

impl fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("LoopbackTransport");
        if let Ok(state) = self.state.lock() {
            debug
                .field("connected", &state.connected)
                .field("echo", &state.echo)
                .field("emitted", &state.emitted.len());
        }
        debug.finish()
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Echoes every `send-message` as a confirmed `receive-message`.
    pub fn with_echo() -> Self {
        let transport = Self::default();
        if let Ok(mut state) = transport.state.lock() {
            state.echo = true;
        }
        transport
    }

    /// Delivers an inbound event to the listeners attached for its name.
    /// Listeners run outside the state lock so they may call back in.
    pub fn inject(&self, event: &InboundEvent) {
        let listeners: Vec<Listener> = self
            .state
            .lock()
            .map(|state| {
                state
                    .listeners
                    .get(&event.name())
                    .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        for listener in listeners {
            listener(event);
        }
    }

    pub fn emitted(&self) -> Vec<OutboundEvent> {
        self.state
            .lock()
            .map(|state| state.emitted.clone())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, name: EventName) -> usize {
        self.state
            .lock()
            .map(|state| state.listeners.get(&name).map_or(0, Vec::len))
            .unwrap_or_default()
    }

    pub fn connect_calls(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.connect_calls)
            .unwrap_or_default()
    }

    pub fn is_connected(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.connected)
            .unwrap_or_default()
    }

    pub fn fail_next_connect(&self, reason: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next_connect = Some(reason.to_owned());
        }
    }

    /// Simulates a server-side drop.
    pub fn drop_connection(&self, reason: &str) {
        self.set_connected(false);
        self.inject(&InboundEvent::Disconnect {
            reason: reason.to_owned(),
        });
    }

    /// Simulates a successful transport-level reconnect.
    pub fn reconnect(&self, attempt: u32) {
        self.inject(&InboundEvent::Reconnect { attempt });
        self.set_connected(true);
        self.inject(&InboundEvent::Connect);
    }

    fn set_connected(&self, connected: bool) -> bool {
        self.state
            .lock()
            .map(|mut state| std::mem::replace(&mut state.connected, connected))
            .unwrap_or_default()
    }
}

impl Transport for LoopbackTransport {
    fn connect(&self, url: &str) -> Result<(), TransportError> {
        let failure = {
            let mut state = self.state.lock().map_err(|_| TransportError::Connect {
                url: url.to_owned(),
                reason: "loopback state unavailable".to_owned(),
            })?;
            state.connect_calls += 1;
            let failure = state.fail_next_connect.take();
            if failure.is_none() {
                state.connected = true;
            }
            failure
        };

        if let Some(reason) = failure {
            return Err(TransportError::Connect {
                url: url.to_owned(),
                reason,
            });
        }

        self.inject(&InboundEvent::Connect);
        Ok(())
    }

    fn disconnect(&self) {
        if self.set_connected(false) {
            self.inject(&InboundEvent::Disconnect {
                reason: CLIENT_DISCONNECT_REASON.to_owned(),
            });
        }
    }

    fn emit(&self, event: &OutboundEvent) -> Result<(), TransportError> {
        let echo = {
            let mut state = self.state.lock().map_err(|_| TransportError::Emit {
                event: event.name(),
                reason: "loopback state unavailable".to_owned(),
            })?;
            if !state.connected {
                return Err(TransportError::NotConnected);
            }
            state.emitted.push(event.clone());
            state.echo
        };

        if echo {
            self.inject(&echo_of(event));
        }
        Ok(())
    }

    fn on(&self, name: EventName, listener: Listener) -> ListenerId {
        match self.state.lock() {
            Ok(mut state) => {
                state.next_listener += 1;
                let id = ListenerId(state.next_listener);
                state.listeners.entry(name).or_default().push((id, listener));
                id
            }
            Err(_) => ListenerId(0),
        }
    }

    fn off(&self, name: EventName, id: ListenerId) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(listeners) = state.listeners.get_mut(&name) {
                listeners.retain(|(existing, _)| *existing != id);
                if listeners.is_empty() {
                    state.listeners.remove(&name);
                }
            }
        }
    }
}

fn echo_of(event: &OutboundEvent) -> InboundEvent {
    match event {
        OutboundEvent::SendMessage(payload) => InboundEvent::ReceiveMessage(Message {
            id: format!("msg-{}", Uuid::new_v4()),
            conversation_id: payload.conversation_id.clone(),
            sender_id: payload.sender_id.clone(),
            receiver_id: payload.receiver_id.clone(),
            body: payload.message.clone(),
            read: false,
            timestamp: payload.timestamp,
            client_id: Some(payload.client_id.clone()),
            delivery: DeliveryState::Confirmed,
        }),
    }
}
