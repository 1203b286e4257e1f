//! In-memory chat model for one signed-in user and the reconciliation rules
//! that merge optimistic local writes with server events.

use std::collections::{HashMap, HashSet};

use super::{
    conversation::{Conversation, ConversationMap},
    message::{DeliveryState, Message},
    presence::{PresenceMap, UserStatus},
    status::ConnectionStatus,
    unread::UnreadCounter,
};

pub const NOT_CONNECTED_ERROR: &str = "Not connected to chat server";
pub const SEND_FAILED_ERROR: &str = "Message could not be sent";

/// Default tolerance when matching an echo without correlation id by content.
pub const DEFAULT_ECHO_WINDOW_MS: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Conversations,
    Messages,
}

/// Generation tags for in-flight loads; only the latest tag of a kind may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct LoadTracker {
    next_generation: u64,
    conversations: Option<u64>,
    messages: Option<u64>,
}

impl LoadTracker {
    fn slot_mut(&mut self, kind: LoadKind) -> &mut Option<u64> {
        match kind {
            LoadKind::Conversations => &mut self.conversations,
            LoadKind::Messages => &mut self.messages,
        }
    }

    fn begin(&mut self, kind: LoadKind) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        *self.slot_mut(kind) = Some(generation);
        generation
    }

    fn finish(&mut self, kind: LoadKind, generation: u64) -> bool {
        let slot = self.slot_mut(kind);
        if *slot != Some(generation) {
            return false;
        }

        *slot = None;
        true
    }

    fn is_loading(&self) -> bool {
        self.conversations.is_some() || self.messages.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomingOutcome {
    /// A new message was appended to its conversation.
    Appended,
    /// The message confirmed its optimistic counterpart.
    Confirmed,
    /// The id was already known; nothing changed.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Marked { conversation_id: String },
    AlreadyRead,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatState {
    current_user: String,
    echo_window_ms: i64,
    conversations: ConversationMap,
    threads: HashMap<String, Vec<Message>>,
    active_conversation: Option<String>,
    presence: PresenceMap,
    connection: ConnectionStatus,
    loads: LoadTracker,
    error: Option<String>,
}

impl ChatState {
    pub fn new(current_user: impl Into<String>, echo_window_ms: i64) -> Self {
        Self {
            current_user: current_user.into(),
            echo_window_ms,
            conversations: ConversationMap::default(),
            threads: HashMap::new(),
            active_conversation: None,
            presence: PresenceMap::default(),
            connection: ConnectionStatus::default(),
            loads: LoadTracker::default(),
            error: None,
        }
    }

    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    /// Conversations ordered by most recent activity.
    pub fn conversations(&self) -> Vec<&Conversation> {
        self.conversations.sorted()
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<&Conversation> {
        self.conversations.get(conversation_id)
    }

    pub fn active_conversation(&self) -> Option<&str> {
        self.active_conversation.as_deref()
    }

    /// Messages of the active conversation.
    pub fn messages(&self) -> &[Message] {
        self.active_conversation
            .as_deref()
            .map(|conversation_id| self.thread(conversation_id))
            .unwrap_or(&[])
    }

    pub fn thread(&self, conversation_id: &str) -> &[Message] {
        self.threads
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn find_message(&self, message_id: &str) -> Option<&Message> {
        self.threads
            .values()
            .flat_map(|thread| thread.iter())
            .find(|message| message.id == message_id)
    }

    pub fn presence(&self) -> &PresenceMap {
        &self.presence
    }

    pub fn connection(&self) -> &ConnectionStatus {
        &self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected
    }

    pub fn is_loading(&self) -> bool {
        self.loads.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Aggregate unread count, derived from the conversation map on every call.
    pub fn unread_count(&self) -> u32 {
        self.conversations.total_unread()
    }

    /// Number of known messages addressed to the current user and still unread.
    pub fn known_unread_messages(&self) -> usize {
        self.threads
            .values()
            .flat_map(|thread| thread.iter())
            .filter(|message| message.is_unread_for(&self.current_user))
            .count()
    }

    pub fn set_connection(&mut self, connection: ConnectionStatus) {
        self.connection = connection;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Starts a tagged load and clears the previous error.
    pub fn begin_load(&mut self, kind: LoadKind) -> u64 {
        self.error = None;
        self.loads.begin(kind)
    }

    /// Returns false when a newer load of the same kind superseded `generation`.
    pub fn finish_load(&mut self, kind: LoadKind, generation: u64) -> bool {
        self.loads.finish(kind, generation)
    }

    pub fn open_conversation(&mut self, conversation_id: &str) {
        self.active_conversation = Some(conversation_id.to_owned());
    }

    /// Replaces the conversation list with a server page.
    ///
    /// Server counts apply only to conversations without a loaded thread;
    /// every loaded thread keeps its conversation and recounts its unread
    /// messages, so events that landed while the request was in flight
    /// survive.
    pub fn replace_conversations(&mut self, conversations: Vec<Conversation>) {
        self.conversations.replace_all(conversations);
        for (conversation_id, thread) in &self.threads {
            reseed_from_thread(
                &mut self.conversations,
                conversation_id,
                thread,
                &self.current_user,
            );
        }
    }

    /// Replaces a conversation's history with a server page.
    ///
    /// Optimistic messages that the page does not contain stay at the end of
    /// the thread, and the conversation's unread count is reseeded from the
    /// page. A pending message whose persisted copy is already on the page
    /// is dropped: by correlation id when the page carries one, otherwise by
    /// sender and body within the echo window, one page entry per pending
    /// message.
    pub fn replace_messages(&mut self, conversation_id: &str, messages: Vec<Message>) {
        let mut seen = HashSet::new();
        let mut thread: Vec<Message> = messages
            .into_iter()
            .filter(|message| seen.insert(message.id.clone()))
            .map(|mut message| {
                message.delivery = DeliveryState::Confirmed;
                message
            })
            .collect();

        let loaded_client_ids: HashSet<String> = thread
            .iter()
            .filter_map(|message| message.client_id.clone())
            .collect();

        if let Some(previous) = self.threads.remove(conversation_id) {
            let mut claimed = HashSet::new();
            let mut kept = Vec::new();
            for message in previous {
                if !message.is_awaiting_echo() {
                    continue;
                }
                if let Some(client_id) = message.client_id.as_ref() {
                    if loaded_client_ids.contains(client_id) {
                        continue;
                    }
                }
                if message.delivery == DeliveryState::Pending {
                    let persisted = thread.iter().position(|loaded| {
                        loaded.client_id.is_none()
                            && !claimed.contains(&loaded.id)
                            && loaded.sender_id == self.current_user
                            && loaded.sender_id == message.sender_id
                            && loaded.body == message.body
                            && within_window(loaded, &message, self.echo_window_ms)
                    });
                    if let Some(index) = persisted {
                        claimed.insert(thread[index].id.clone());
                        thread[index].client_id = message.client_id.clone();
                        continue;
                    }
                }
                kept.push(message);
            }
            thread.extend(kept);
        }

        reseed_from_thread(
            &mut self.conversations,
            conversation_id,
            &thread,
            &self.current_user,
        );
        self.threads.insert(conversation_id.to_owned(), thread);
    }

    pub fn append_optimistic(&mut self, message: Message) {
        let conversation = self.conversations.upsert_for_message(&message);
        conversation.record_last_message(&message);

        self.threads
            .entry(message.conversation_id.clone())
            .or_default()
            .push(message);
    }

    /// Merges a server-delivered message.
    ///
    /// A pending message is swapped in place when the echo carries its
    /// correlation id or, without one, when it has the same sender and body
    /// within the echo window. When the id is already known (a history reload
    /// delivered the persisted copy first) the matching pending entry is
    /// removed instead.
    pub fn apply_incoming(&mut self, mut message: Message) -> IncomingOutcome {
        message.delivery = DeliveryState::Confirmed;

        let thread = self
            .threads
            .entry(message.conversation_id.clone())
            .or_default();

        if let Some(known) = thread.iter().position(|existing| existing.id == message.id) {
            // A copy that already took a correlation id has its pending entry resolved.
            if message.client_id.is_none() && thread[known].client_id.is_some() {
                return IncomingOutcome::Duplicate;
            }
            let Some(index) =
                find_pending_echo(thread, &message, &self.current_user, self.echo_window_ms)
            else {
                return IncomingOutcome::Duplicate;
            };
            if index == known {
                return IncomingOutcome::Duplicate;
            }

            let pending = thread.remove(index);
            let known = if index < known { known - 1 } else { known };
            if thread[known].client_id.is_none() {
                thread[known].client_id = message.client_id.or(pending.client_id);
            }
            return IncomingOutcome::Confirmed;
        }

        let outcome =
            match find_pending_echo(thread, &message, &self.current_user, self.echo_window_ms) {
                Some(index) => {
                    if message.client_id.is_none() {
                        message.client_id = thread[index].client_id.clone();
                    }
                    thread[index] = message.clone();
                    IncomingOutcome::Confirmed
                }
                None => {
                    thread.push(message.clone());
                    IncomingOutcome::Appended
                }
            };

        let conversation = self.conversations.upsert_for_message(&message);
        conversation.record_last_message(&message);
        if message.is_unread_for(&self.current_user) {
            conversation.unread_count.increment();
        }

        outcome
    }

    /// Flips a message to read, decrementing its conversation at most once.
    pub fn mark_read(&mut self, message_id: &str) -> ReadOutcome {
        for (conversation_id, thread) in self.threads.iter_mut() {
            let Some(message) = thread.iter_mut().find(|message| message.id == message_id) else {
                continue;
            };

            if message.read {
                return ReadOutcome::AlreadyRead;
            }

            message.read = true;
            if message.receiver_id == self.current_user {
                if let Some(conversation) = self.conversations.get_mut(conversation_id) {
                    conversation.unread_count.decrement();
                }
            }

            return ReadOutcome::Marked {
                conversation_id: conversation_id.clone(),
            };
        }

        ReadOutcome::Unknown
    }

    /// Marks the pending message with `client_id` as failed. The message stays
    /// in its thread so the typed content is not lost.
    pub fn mark_send_failed(&mut self, client_id: &str, reason: Option<&str>) -> bool {
        let Some(message) = self.find_by_client_id_mut(client_id, DeliveryState::Pending) else {
            return false;
        };

        message.delivery = DeliveryState::Failed;
        self.error = Some(reason.unwrap_or(SEND_FAILED_ERROR).to_owned());
        true
    }

    /// Moves a failed message back to pending and returns a copy to re-emit.
    pub fn take_for_retry(&mut self, client_id: &str) -> Option<Message> {
        let message = self.find_by_client_id_mut(client_id, DeliveryState::Failed)?;
        message.delivery = DeliveryState::Pending;
        Some(message.clone())
    }

    pub fn upsert_presence(&mut self, status: UserStatus) -> bool {
        self.presence.upsert(status)
    }

    fn find_by_client_id_mut(
        &mut self,
        client_id: &str,
        delivery: DeliveryState,
    ) -> Option<&mut Message> {
        self.threads
            .values_mut()
            .flat_map(|thread| thread.iter_mut())
            .find(|message| {
                message.delivery == delivery && message.client_id.as_deref() == Some(client_id)
            })
    }
}

fn find_pending_echo(
    thread: &[Message],
    echo: &Message,
    current_user: &str,
    echo_window_ms: i64,
) -> Option<usize> {
    if let Some(client_id) = echo.client_id.as_deref() {
        return thread.iter().position(|candidate| {
            candidate.is_awaiting_echo() && candidate.client_id.as_deref() == Some(client_id)
        });
    }

    if echo.sender_id != current_user {
        return None;
    }

    thread.iter().position(|candidate| {
        candidate.is_awaiting_echo()
            && candidate.is_provisional()
            && candidate.sender_id == echo.sender_id
            && candidate.body == echo.body
            && within_window(echo, candidate, echo_window_ms)
    })
}

fn within_window(left: &Message, right: &Message, echo_window_ms: i64) -> bool {
    (left.timestamp - right.timestamp).num_milliseconds().abs() <= echo_window_ms
}

/// Points a conversation at its loaded thread: latest preview and an unread
/// count equal to the thread's unread messages.
fn reseed_from_thread(
    conversations: &mut ConversationMap,
    conversation_id: &str,
    thread: &[Message],
    current_user: &str,
) {
    let unread = thread
        .iter()
        .filter(|message| message.is_unread_for(current_user))
        .count();
    let unread = UnreadCounter::new(u32::try_from(unread).unwrap_or(u32::MAX));

    match thread.iter().max_by_key(|message| message.timestamp) {
        Some(latest) => {
            let conversation = conversations.upsert_for_message(latest);
            conversation.record_last_message(latest);
            conversation.unread_count = unread;
        }
        None => {
            if let Some(conversation) = conversations.get_mut(conversation_id) {
                conversation.unread_count.reset();
            }
        }
    }
}
