use std::{
    fmt,
    sync::{mpsc, Arc},
};

use chrono::Utc;

use crate::{
    domain::{
        chat_state::{ChatState, IncomingOutcome, LoadKind, ReadOutcome, NOT_CONNECTED_ERROR},
        events::{EventName, InboundEvent, OutboundEvent, SendMessagePayload},
        message::Message,
    },
    transport::{
        callbacks::LifecycleCallbacks, connection_manager::ConnectionManager, Transport,
    },
    usecases::{
        contracts::{ChatHistory, GENERIC_FETCH_ERROR},
        snapshot_store::SnapshotStore,
    },
};

const CHAT_STALE_LOAD_DISCARDED: &str = "CHAT_STALE_LOAD_DISCARDED";
const CHAT_LOAD_FAILED: &str = "CHAT_LOAD_FAILED";
const CHAT_SEND_REJECTED_OFFLINE: &str = "CHAT_SEND_REJECTED_OFFLINE";
const CHAT_SEND_FAILED: &str = "CHAT_SEND_FAILED";
const CHAT_READ_PERSIST_FAILED: &str = "CHAT_READ_PERSIST_FAILED";
const CHAT_DUPLICATE_IGNORED: &str = "CHAT_DUPLICATE_IGNORED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEngineConfig {
    pub user_id: String,
    pub channel_url: String,
    pub echo_window_ms: i64,
}

/// Chat model for one signed-in user, kept in sync with the channel and the
/// history service.
pub struct ChatEngine {
    user_id: String,
    connection: ConnectionManager,
    history: Arc<dyn ChatHistory>,
    store: SnapshotStore<ChatState>,
}

impl fmt::Debug for ChatEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatEngine")
            .field("user_id", &self.user_id)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl ChatEngine {
    /// Registers inbound handlers once and opens the channel.
    pub fn mount(
        config: ChatEngineConfig,
        transport: Arc<dyn Transport>,
        history: Arc<dyn ChatHistory>,
        callbacks: LifecycleCallbacks,
    ) -> Self {
        let connection = ConnectionManager::new(transport, config.channel_url, callbacks);
        let store = SnapshotStore::new(ChatState::new(
            config.user_id.clone(),
            config.echo_window_ms,
        ));

        register_handlers(&connection, &store);

        let engine = Self {
            user_id: config.user_id,
            connection,
            history,
            store,
        };
        engine.connection.connect();
        engine.sync_connection();
        engine
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn snapshot(&self) -> ChatState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> mpsc::Receiver<ChatState> {
        self.store.subscribe()
    }

    pub fn unread_count(&self) -> u32 {
        self.store.read(ChatState::unread_count)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn clear_error(&self) {
        self.store.mutate(ChatState::clear_error);
    }

    pub async fn load_conversations(&self) {
        let generation = self
            .store
            .mutate(|state| state.begin_load(LoadKind::Conversations));

        let result = self.history.conversations(&self.user_id).await;

        self.store.mutate(|state| {
            if !state.finish_load(LoadKind::Conversations, generation) {
                tracing::debug!(
                    code = CHAT_STALE_LOAD_DISCARDED,
                    generation,
                    "discarded superseded conversations load"
                );
                return;
            }

            match result {
                Ok(conversations) => state.replace_conversations(conversations),
                Err(error) => {
                    tracing::warn!(code = CHAT_LOAD_FAILED, error = %error, "conversations load failed");
                    state.fail(error.user_message(GENERIC_FETCH_ERROR));
                }
            }
        });
    }

    /// Loads one conversation and makes it active. A later call wins over an
    /// earlier one regardless of which response arrives first.
    pub async fn load_messages(&self, conversation_id: &str) {
        let generation = self.store.mutate(|state| {
            state.open_conversation(conversation_id);
            state.begin_load(LoadKind::Messages)
        });

        let result = self.history.messages(conversation_id).await;

        self.store.mutate(|state| {
            if !state.finish_load(LoadKind::Messages, generation) {
                tracing::debug!(
                    code = CHAT_STALE_LOAD_DISCARDED,
                    generation,
                    conversation_id,
                    "discarded superseded messages load"
                );
                return;
            }

            match result {
                Ok(messages) => state.replace_messages(conversation_id, messages),
                Err(error) => {
                    tracing::warn!(
                        code = CHAT_LOAD_FAILED,
                        conversation_id,
                        error = %error,
                        "messages load failed"
                    );
                    state.fail(error.user_message(GENERIC_FETCH_ERROR));
                }
            }
        });
    }

    /// Appends an optimistic message and emits it. Returns the correlation id,
    /// or `None` when the channel is down.
    pub fn send_message(
        &self,
        conversation_id: &str,
        receiver_id: &str,
        body: &str,
    ) -> Option<String> {
        if !self.ensure_connected() {
            tracing::debug!(code = CHAT_SEND_REJECTED_OFFLINE, conversation_id, "send rejected");
            return None;
        }

        let message = Message::pending(
            conversation_id,
            &self.user_id,
            receiver_id,
            body,
            Utc::now(),
        );
        let client_id = message.id.clone();
        let event = OutboundEvent::SendMessage(SendMessagePayload::from_message(&message));

        self.store.mutate(|state| state.append_optimistic(message));
        self.emit_or_mark_failed(&event, &client_id);

        Some(client_id)
    }

    /// Re-emits a failed message. Returns false when nothing was retried.
    pub fn retry_message(&self, client_id: &str) -> bool {
        if !self.ensure_connected() {
            return false;
        }

        let Some(message) = self.store.mutate(|state| state.take_for_retry(client_id)) else {
            return false;
        };

        let event = OutboundEvent::SendMessage(SendMessagePayload::from_message(&message));
        self.emit_or_mark_failed(&event, client_id);
        true
    }

    /// Flips the message locally, then persists the receipt. Ids already read
    /// locally are not persisted again; ids unknown locally still are. A
    /// failed persist is reported but the local flip stays.
    pub async fn mark_as_read(&self, message_id: &str) {
        if !self.ensure_connected() {
            return;
        }

        let outcome = self.store.mutate(|state| state.mark_read(message_id));
        if outcome == ReadOutcome::AlreadyRead {
            return;
        }

        if let Err(error) = self.history.mark_message_read(message_id).await {
            tracing::warn!(
                code = CHAT_READ_PERSIST_FAILED,
                message_id,
                error = %error,
                "read receipt was not persisted"
            );
            self.store
                .mutate(|state| state.fail(error.user_message(GENERIC_FETCH_ERROR)));
        }
    }

    /// Detaches from the channel; the engine's state stays readable.
    pub fn unmount(&self) {
        self.connection.teardown();
        self.sync_connection();
    }

    fn ensure_connected(&self) -> bool {
        if self.connection.is_connected() {
            return true;
        }

        self.store.mutate(|state| state.fail(NOT_CONNECTED_ERROR));
        false
    }

    fn emit_or_mark_failed(&self, event: &OutboundEvent, client_id: &str) {
        if let Err(error) = self.connection.try_emit(event) {
            tracing::warn!(code = CHAT_SEND_FAILED, error = %error, "send-message emit failed");
            let reason = error.to_string();
            self.store
                .mutate(|state| state.mark_send_failed(client_id, Some(&reason)));
        }
    }

    fn sync_connection(&self) {
        let status = self.connection.status();
        self.store.mutate(|state| state.set_connection(status));
    }
}

fn register_handlers(connection: &ConnectionManager, store: &SnapshotStore<ChatState>) {
    for name in EventName::LIFECYCLE {
        let store = store.clone();
        let probe = connection.probe();
        connection.on(name, move |_| {
            let status = probe.status();
            store.mutate(|state| state.set_connection(status));
        });
    }

    let messages = store.clone();
    connection.on(EventName::ReceiveMessage, move |event| {
        let InboundEvent::ReceiveMessage(message) = event else {
            return;
        };

        let outcome = messages.mutate(|state| state.apply_incoming(message.clone()));
        if outcome == IncomingOutcome::Duplicate {
            tracing::debug!(
                code = CHAT_DUPLICATE_IGNORED,
                message_id = %message.id,
                "duplicate receive-message ignored"
            );
        }
    });

    let receipts = store.clone();
    connection.on(EventName::MessageRead, move |event| {
        if let InboundEvent::MessageRead(payload) = event {
            receipts.mutate(|state| state.mark_read(&payload.message_id));
        }
    });

    let failures = store.clone();
    connection.on(EventName::MessageError, move |event| {
        if let InboundEvent::MessageError(payload) = event {
            failures.mutate(|state| {
                state.mark_send_failed(&payload.client_id, payload.error.as_deref())
            });
        }
    });

    let presence = store.clone();
    connection.on(EventName::UserStatus, move |event| {
        if let InboundEvent::UserStatus(status) = event {
            presence.mutate(|state| state.upsert_presence(status.clone()));
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        domain::{
            chat_state::DEFAULT_ECHO_WINDOW_MS,
            events::{MessageErrorPayload, MessageReadPayload},
            message::DeliveryState,
            presence::UserStatus,
        },
        test_support::{conversation, incoming, outgoing_echo, ScriptedHistory},
        transport::loopback::LoopbackTransport,
        usecases::contracts::FetchError,
    };

    const ME: &str = "user-1";

    fn mount(transport: &Arc<LoopbackTransport>, history: &Arc<ScriptedHistory>) -> ChatEngine {
        let transport: Arc<dyn Transport> = transport.clone();
        let history: Arc<dyn ChatHistory> = history.clone();
        ChatEngine::mount(
            ChatEngineConfig {
                user_id: ME.to_owned(),
                channel_url: "ws://localhost:5000".to_owned(),
                echo_window_ms: DEFAULT_ECHO_WINDOW_MS,
            },
            transport,
            history,
            LifecycleCallbacks::new(),
        )
    }

    #[tokio::test]
    async fn incoming_message_then_mark_as_read_round_trips_unread_count() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(
            ScriptedHistory::new().with_conversations(Ok(vec![conversation("conv-1", ME, "user-2", 0)])),
        );
        let engine = mount(&transport, &history);
        engine.load_conversations().await;

        transport.inject(&InboundEvent::ReceiveMessage(incoming(
            "m-1", "conv-1", "user-2", ME, "Are you free Monday?",
        )));

        let snapshot = engine.snapshot();
        assert_eq!(
            snapshot.conversation("conv-1").map(|c| c.unread_count.get()),
            Some(1)
        );
        assert_eq!(engine.unread_count(), 1);

        engine.mark_as_read("m-1").await;

        assert_eq!(engine.unread_count(), 0);
        assert_eq!(history.read_receipts(), vec!["m-1".to_owned()]);
        assert_eq!(engine.snapshot().error(), None);
    }

    #[tokio::test]
    async fn send_message_appends_pending_entry_and_emits_once() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);

        let client_id = engine
            .send_message("conv-1", "user-2", "Hello")
            .expect("connected send should be accepted");

        let snapshot = engine.snapshot();
        let thread = snapshot.thread("conv-1");
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].body, "Hello");
        assert!(thread[0].id.starts_with("temp-"));
        assert_eq!(thread[0].delivery, DeliveryState::Pending);

        let emitted = transport.emitted();
        assert_eq!(emitted.len(), 1);
        let OutboundEvent::SendMessage(payload) = &emitted[0];
        assert_eq!(payload.conversation_id, "conv-1");
        assert_eq!(payload.sender_id, ME);
        assert_eq!(payload.receiver_id, "user-2");
        assert_eq!(payload.message, "Hello");
        assert_eq!(payload.client_id, client_id);
    }

    #[tokio::test]
    async fn send_while_disconnected_adds_nothing_and_sets_error() {
        let transport = Arc::new(LoopbackTransport::new());
        transport.fail_next_connect("connection refused");
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);

        let sent = engine.send_message("conv-1", "user-2", "Hello");

        let snapshot = engine.snapshot();
        assert!(sent.is_none());
        assert!(snapshot.thread("conv-1").is_empty());
        assert_eq!(snapshot.error(), Some(NOT_CONNECTED_ERROR));
        assert!(transport.emitted().is_empty());
        assert!(!snapshot.is_connected());
        assert!(snapshot.connection().last_error.is_some());
    }

    #[tokio::test]
    async fn mark_as_read_while_disconnected_keeps_message_unread() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);
        transport.inject(&InboundEvent::ReceiveMessage(incoming(
            "m-1", "conv-1", "user-2", ME, "hi",
        )));
        transport.drop_connection("transport close");

        engine.mark_as_read("m-1").await;

        assert_eq!(engine.unread_count(), 1);
        assert_eq!(engine.snapshot().error(), Some(NOT_CONNECTED_ERROR));
        assert!(history.read_receipts().is_empty());
    }

    #[tokio::test]
    async fn echoed_send_is_confirmed_in_place() {
        let transport = Arc::new(LoopbackTransport::with_echo());
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);

        let client_id = engine
            .send_message("conv-1", "user-2", "Hello")
            .expect("send should be accepted");

        let snapshot = engine.snapshot();
        let thread = snapshot.thread("conv-1");
        assert_eq!(thread.len(), 1);
        assert!(thread[0].id.starts_with("msg-"));
        assert_eq!(thread[0].delivery, DeliveryState::Confirmed);
        assert_eq!(thread[0].client_id.as_deref(), Some(client_id.as_str()));
        assert_eq!(engine.unread_count(), 0);
    }

    #[tokio::test]
    async fn later_messages_load_wins_over_earlier_one() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(
            ScriptedHistory::new()
                .with_messages("conv-A", Ok(vec![incoming("a-1", "conv-A", "user-2", ME, "from A")]))
                .with_messages("conv-B", Ok(vec![incoming("b-1", "conv-B", "user-3", ME, "from B")])),
        );
        let release_a = history.gate("conv-A");
        let release_b = history.gate("conv-B");
        let engine = mount(&transport, &history);

        let releases = async {
            let _ = release_b.send(());
            tokio::task::yield_now().await;
            let _ = release_a.send(());
        };
        tokio::join!(
            engine.load_messages("conv-A"),
            engine.load_messages("conv-B"),
            releases
        );

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.active_conversation(), Some("conv-B"));
        let ids: Vec<&str> = snapshot.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b-1"]);
        assert!(snapshot.thread("conv-A").is_empty());
        assert!(!snapshot.is_loading());
    }

    #[tokio::test]
    async fn mark_as_read_skips_already_read_but_persists_unknown_ids() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);
        transport.inject(&InboundEvent::ReceiveMessage(incoming(
            "m-1", "conv-1", "user-2", ME, "Homework attached",
        )));

        engine.mark_as_read("m-1").await;
        engine.mark_as_read("m-1").await;
        engine.mark_as_read("m-404").await;

        assert_eq!(
            history.read_receipts(),
            vec!["m-1".to_owned(), "m-404".to_owned()]
        );
        assert_eq!(engine.unread_count(), 0);
    }

    #[tokio::test]
    async fn messages_received_during_conversation_reload_stay_counted() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(
            ScriptedHistory::new().with_conversations(Ok(vec![conversation("conv-1", ME, "user-2", 0)])),
        );
        let release = history.gate_conversations();
        let engine = mount(&transport, &history);

        let arrivals = async {
            tokio::task::yield_now().await;
            transport.inject(&InboundEvent::ReceiveMessage(incoming(
                "m-1",
                "conv-9",
                "user-3",
                ME,
                "are you free on Friday?",
            )));
            let _ = release.send(());
        };
        tokio::join!(engine.load_conversations(), arrivals);

        let snapshot = engine.snapshot();
        assert!(snapshot.conversation("conv-1").is_some());
        assert!(snapshot.conversation("conv-9").is_some());
        assert_eq!(engine.unread_count(), 1);
        assert_eq!(
            snapshot.unread_count() as usize,
            snapshot.known_unread_messages()
        );
        assert!(!snapshot.is_loading());
    }

    #[tokio::test]
    async fn echo_after_history_reload_leaves_single_message() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new().with_messages(
            "conv-1",
            Ok(vec![incoming("m-100", "conv-1", ME, "user-2", "See you at 4pm")]),
        ));
        let engine = mount(&transport, &history);

        let client_id = engine
            .send_message("conv-1", "user-2", "See you at 4pm")
            .expect("connected send should be accepted");
        engine.load_messages("conv-1").await;
        transport.inject(&InboundEvent::ReceiveMessage(outgoing_echo(
            "m-100",
            &client_id,
            "conv-1",
            "See you at 4pm",
        )));

        let snapshot = engine.snapshot();
        let thread = snapshot.thread("conv-1");
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].id, "m-100");
        assert_eq!(thread[0].delivery, DeliveryState::Confirmed);
        assert_eq!(thread[0].client_id.as_deref(), Some(client_id.as_str()));
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_state_and_reports_server_message() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(
            ScriptedHistory::new().with_conversations(Ok(vec![conversation("conv-1", ME, "user-2", 3)])),
        );
        let engine = mount(&transport, &history);
        engine.load_conversations().await;

        history.set_conversations(Err(FetchError::Server {
            status: 500,
            message: Some("History unavailable".to_owned()),
        }));
        engine.load_conversations().await;

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.error(), Some("History unavailable"));
        assert_eq!(snapshot.conversations().len(), 1);
        assert_eq!(engine.unread_count(), 3);
        assert!(!snapshot.is_loading());
    }

    #[tokio::test]
    async fn network_failure_uses_generic_message() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(
            ScriptedHistory::new()
                .with_messages("conv-1", Err(FetchError::Network("timed out".to_owned()))),
        );
        let engine = mount(&transport, &history);

        engine.load_messages("conv-1").await;

        assert_eq!(engine.snapshot().error(), Some(GENERIC_FETCH_ERROR));
    }

    #[tokio::test]
    async fn next_load_clears_previous_error() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);
        transport.drop_connection("transport close");
        engine.send_message("conv-1", "user-2", "x");
        assert!(engine.snapshot().error().is_some());

        engine.load_conversations().await;

        assert_eq!(engine.snapshot().error(), None);
    }

    #[tokio::test]
    async fn duplicate_read_receipts_decrement_once() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);
        transport.inject(&InboundEvent::ReceiveMessage(incoming(
            "m-1", "conv-1", "user-2", ME, "a",
        )));
        transport.inject(&InboundEvent::ReceiveMessage(incoming(
            "m-2", "conv-1", "user-2", ME, "b",
        )));

        let receipt = InboundEvent::MessageRead(MessageReadPayload {
            message_id: "m-1".to_owned(),
        });
        for _ in 0..3 {
            transport.inject(&receipt);
        }
        engine.mark_as_read("m-1").await;

        assert_eq!(engine.unread_count(), 1);
        assert!(history.read_receipts().is_empty());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.unread_count() as usize, snapshot.known_unread_messages());
    }

    #[tokio::test]
    async fn read_persist_failure_surfaces_error_but_keeps_local_flip() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new().with_read_failure(FetchError::Server {
            status: 404,
            message: Some("Message not found".to_owned()),
        }));
        let engine = mount(&transport, &history);
        transport.inject(&InboundEvent::ReceiveMessage(incoming(
            "m-1", "conv-1", "user-2", ME, "a",
        )));

        engine.mark_as_read("m-1").await;

        assert_eq!(engine.unread_count(), 0);
        assert_eq!(engine.snapshot().error(), Some("Message not found"));
    }

    #[tokio::test]
    async fn message_error_marks_send_failed_and_retry_re_emits() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);
        let client_id = engine
            .send_message("conv-1", "user-2", "Draft")
            .expect("send should be accepted");

        transport.inject(&InboundEvent::MessageError(MessageErrorPayload {
            client_id: client_id.clone(),
            error: Some("Recipient blocked messages".to_owned()),
        }));

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.thread("conv-1").len(), 1);
        assert_eq!(snapshot.thread("conv-1")[0].delivery, DeliveryState::Failed);
        assert_eq!(snapshot.error(), Some("Recipient blocked messages"));

        assert!(engine.retry_message(&client_id));
        assert!(!engine.retry_message(&client_id));

        assert_eq!(transport.emitted().len(), 2);
        assert_eq!(
            engine.snapshot().thread("conv-1")[0].delivery,
            DeliveryState::Pending
        );
    }

    #[tokio::test]
    async fn presence_updates_come_only_from_inbound_events() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);

        transport.inject(&InboundEvent::UserStatus(UserStatus {
            user_id: "user-2".to_owned(),
            online: true,
            last_seen: None,
        }));

        let snapshot = engine.snapshot();
        assert!(snapshot.presence().is_online("user-2"));
        assert!(!snapshot.presence().is_online("user-3"));
    }

    #[tokio::test]
    async fn disconnect_is_reported_apart_from_errors() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);
        assert!(engine.snapshot().is_connected());

        transport.drop_connection("ping timeout");

        let snapshot = engine.snapshot();
        assert!(!snapshot.is_connected());
        assert_eq!(snapshot.error(), None);
        assert_eq!(snapshot.connection().as_label(), "DISCONNECTED");

        transport.reconnect(1);
        assert!(engine.snapshot().is_connected());
    }

    #[tokio::test]
    async fn subscribers_see_each_state_change() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);
        let updates = engine.subscribe();
        let initial = updates.recv().expect("initial snapshot");
        assert_eq!(initial.unread_count(), 0);

        transport.inject(&InboundEvent::ReceiveMessage(incoming(
            "m-1", "conv-1", "user-2", ME, "a",
        )));

        let latest = updates.try_iter().last().expect("update after message");
        assert_eq!(latest.unread_count(), 1);
    }

    #[tokio::test]
    async fn unmount_removes_every_lifecycle_listener() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new());
        let engine = mount(&transport, &history);
        for name in EventName::LIFECYCLE {
            assert_eq!(transport.listener_count(name), 1);
        }

        engine.unmount();

        for name in EventName::LIFECYCLE {
            assert_eq!(transport.listener_count(name), 0, "{}", name.as_str());
        }
        assert!(!transport.is_connected());
        assert!(!engine.snapshot().is_connected());
    }

    #[tokio::test]
    async fn independent_mounts_do_not_share_state() {
        let transport = Arc::new(LoopbackTransport::new());
        let history = Arc::new(ScriptedHistory::new());
        let first = mount(&transport, &history);
        let second = mount(&transport, &history);

        first.send_message("conv-1", "user-2", "only in first");

        assert_eq!(first.snapshot().thread("conv-1").len(), 1);
        assert!(second.snapshot().thread("conv-1").is_empty());
    }
}
