//! Typed events exchanged over the duplex channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{message::Message, notification::Notification, presence::UserStatus};

/// Name of an inbound channel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventName {
    Connect,
    Disconnect,
    Error,
    Reconnect,
    ReceiveMessage,
    MessageRead,
    MessageError,
    UserStatus,
    NotificationNew,
    NotificationRead,
}

impl EventName {
    pub const LIFECYCLE: [EventName; 4] = [
        EventName::Connect,
        EventName::Disconnect,
        EventName::Error,
        EventName::Reconnect,
    ];

    pub const ALL: [EventName; 10] = [
        EventName::Connect,
        EventName::Disconnect,
        EventName::Error,
        EventName::Reconnect,
        EventName::ReceiveMessage,
        EventName::MessageRead,
        EventName::MessageError,
        EventName::UserStatus,
        EventName::NotificationNew,
        EventName::NotificationRead,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Error => "error",
            Self::Reconnect => "reconnect",
            Self::ReceiveMessage => "receive-message",
            Self::MessageRead => "message-read",
            Self::MessageError => "message-error",
            Self::UserStatus => "user-status",
            Self::NotificationNew => "notification:new",
            Self::NotificationRead => "notification:read",
        }
    }

    pub fn is_lifecycle(self) -> bool {
        Self::LIFECYCLE.contains(&self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadPayload {
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageErrorPayload {
    pub client_id: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReadPayload {
    pub notification_id: String,
}

/// Event delivered by the transport, tagged by its channel event name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundEvent {
    #[serde(rename = "connect")]
    Connect,
    #[serde(rename = "disconnect")]
    Disconnect { reason: String },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "reconnect")]
    Reconnect { attempt: u32 },
    #[serde(rename = "receive-message")]
    ReceiveMessage(Message),
    #[serde(rename = "message-read")]
    MessageRead(MessageReadPayload),
    #[serde(rename = "message-error")]
    MessageError(MessageErrorPayload),
    #[serde(rename = "user-status")]
    UserStatus(UserStatus),
    #[serde(rename = "notification:new")]
    NotificationNew(Notification),
    #[serde(rename = "notification:read")]
    NotificationRead(NotificationReadPayload),
}

impl InboundEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::Connect => EventName::Connect,
            Self::Disconnect { .. } => EventName::Disconnect,
            Self::Error { .. } => EventName::Error,
            Self::Reconnect { .. } => EventName::Reconnect,
            Self::ReceiveMessage(_) => EventName::ReceiveMessage,
            Self::MessageRead(_) => EventName::MessageRead,
            Self::MessageError(_) => EventName::MessageError,
            Self::UserStatus(_) => EventName::UserStatus,
            Self::NotificationNew(_) => EventName::NotificationNew,
            Self::NotificationRead(_) => EventName::NotificationRead,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub client_id: String,
}

impl SendMessagePayload {
    pub fn from_message(message: &Message) -> Self {
        Self {
            conversation_id: message.conversation_id.clone(),
            sender_id: message.sender_id.clone(),
            receiver_id: message.receiver_id.clone(),
            message: message.body.clone(),
            timestamp: message.timestamp,
            client_id: message
                .client_id
                .clone()
                .unwrap_or_else(|| message.id.clone()),
        }
    }
}

/// Event emitted by the client over the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "send-message")]
    SendMessage(SendMessagePayload),
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendMessage(_) => "send-message",
        }
    }
}
