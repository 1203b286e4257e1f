use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::oneshot;

use crate::{
    domain::{
        conversation::Conversation,
        message::{DeliveryState, Message},
        notification::{Notification, NotificationKind},
        unread::UnreadCounter,
    },
    usecases::contracts::{ChatHistory, FetchError, NotificationHistory, NotificationPage},
};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0)
        .single()
        .expect("fixture time should be valid")
}

pub fn conversation(id: &str, me: &str, other: &str, unread: u32) -> Conversation {
    Conversation {
        id: id.to_owned(),
        participants: [me.to_owned(), other.to_owned()].into_iter().collect(),
        participant_names: Default::default(),
        last_message: None,
        last_message_time: None,
        unread_count: UnreadCounter::new(unread),
    }
}

pub fn incoming(id: &str, conversation_id: &str, sender: &str, receiver: &str, body: &str) -> Message {
    Message {
        id: id.to_owned(),
        conversation_id: conversation_id.to_owned(),
        sender_id: sender.to_owned(),
        receiver_id: receiver.to_owned(),
        body: body.to_owned(),
        read: false,
        timestamp: base_time(),
        client_id: None,
        delivery: DeliveryState::Confirmed,
    }
}

/// Server echo of a message sent by `user-1` to `user-2`.
pub fn outgoing_echo(id: &str, client_id: &str, conversation_id: &str, body: &str) -> Message {
    Message {
        client_id: Some(client_id.to_owned()),
        ..incoming(id, conversation_id, "user-1", "user-2", body)
    }
}

pub fn notification(id: &str, user_id: &str, read: bool) -> Notification {
    Notification {
        id: id.to_owned(),
        user_id: user_id.to_owned(),
        kind: NotificationKind::System,
        title: format!("Notice {id}"),
        body: String::new(),
        read,
        created_at: base_time(),
    }
}

/// History fake with canned responses, captured writes and optional gates
/// that hold a messages fetch until released.
#[derive(Debug, Default)]
pub struct ScriptedHistory {
    conversations: Mutex<Option<Result<Vec<Conversation>, FetchError>>>,
    messages: Mutex<HashMap<String, Result<Vec<Message>, FetchError>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    conversations_gate: Mutex<Option<oneshot::Receiver<()>>>,
    notifications_gate: Mutex<Option<oneshot::Receiver<()>>>,
    read_failure: Mutex<Option<FetchError>>,
    notifications: Mutex<Option<Result<NotificationPage, FetchError>>>,
    read_receipts: Mutex<Vec<String>>,
    notification_receipts: Mutex<Vec<String>>,
    read_all_calls: Mutex<Vec<String>>,
    fetches: AtomicUsize,
}

impl ScriptedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversations(self, result: Result<Vec<Conversation>, FetchError>) -> Self {
        self.set_conversations(result);
        self
    }

    pub fn set_conversations(&self, result: Result<Vec<Conversation>, FetchError>) {
        *self.conversations.lock().expect("fixture lock") = Some(result);
    }

    pub fn with_messages(
        self,
        conversation_id: &str,
        result: Result<Vec<Message>, FetchError>,
    ) -> Self {
        self.messages
            .lock()
            .expect("fixture lock")
            .insert(conversation_id.to_owned(), result);
        self
    }

    pub fn with_read_failure(self, error: FetchError) -> Self {
        *self.read_failure.lock().expect("fixture lock") = Some(error);
        self
    }

    pub fn with_notifications(self, result: Result<NotificationPage, FetchError>) -> Self {
        *self.notifications.lock().expect("fixture lock") = Some(result);
        self
    }

    /// Holds the next messages fetch for `conversation_id` until the returned
    /// sender fires or is dropped.
    pub fn gate(&self, conversation_id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .expect("fixture lock")
            .insert(conversation_id.to_owned(), rx);
        tx
    }

    /// Holds the next conversations fetch until the returned sender fires.
    pub fn gate_conversations(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.conversations_gate.lock().expect("fixture lock") = Some(rx);
        tx
    }

    /// Holds the next notifications fetch until the returned sender fires.
    pub fn gate_notifications(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.notifications_gate.lock().expect("fixture lock") = Some(rx);
        tx
    }

    pub fn read_receipts(&self) -> Vec<String> {
        self.read_receipts.lock().expect("fixture lock").clone()
    }

    pub fn notification_receipts(&self) -> Vec<String> {
        self.notification_receipts
            .lock()
            .expect("fixture lock")
            .clone()
    }

    pub fn read_all_calls(&self) -> Vec<String> {
        self.read_all_calls.lock().expect("fixture lock").clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatHistory for ScriptedHistory {
    async fn conversations(&self, _user_id: &str) -> Result<Vec<Conversation>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.conversations_gate.lock().expect("fixture lock").take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        self.conversations
            .lock()
            .expect("fixture lock")
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self
            .gates
            .lock()
            .expect("fixture lock")
            .remove(conversation_id);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        self.messages
            .lock()
            .expect("fixture lock")
            .get(conversation_id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn mark_message_read(&self, message_id: &str) -> Result<(), FetchError> {
        self.read_receipts
            .lock()
            .expect("fixture lock")
            .push(message_id.to_owned());
        match self.read_failure.lock().expect("fixture lock").clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NotificationHistory for ScriptedHistory {
    async fn notifications(&self, _user_id: &str) -> Result<NotificationPage, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.notifications_gate.lock().expect("fixture lock").take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        self.notifications
            .lock()
            .expect("fixture lock")
            .clone()
            .unwrap_or_else(|| Ok(NotificationPage::default()))
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), FetchError> {
        self.notification_receipts
            .lock()
            .expect("fixture lock")
            .push(notification_id.to_owned());
        match self.read_failure.lock().expect("fixture lock").clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<(), FetchError> {
        self.read_all_calls
            .lock()
            .expect("fixture lock")
            .push(user_id.to_owned());
        Ok(())
    }
}
