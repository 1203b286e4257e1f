use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix that marks a locally generated, not yet confirmed message id.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Delivery state of a message as seen by the local client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryState {
    /// Optimistically appended, waiting for the server echo.
    Pending,
    /// Server-issued message or a pending one matched to its echo.
    #[default]
    Confirmed,
    /// The server reported that sending failed. Kept visible for retry.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(rename = "message")]
    pub body: String,
    #[serde(default)]
    pub read: bool,
    pub timestamp: DateTime<Utc>,
    /// Correlation id chosen by the sending client and echoed by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip)]
    pub delivery: DeliveryState,
}

impl Message {
    /// Builds an optimistic message whose temporary id doubles as the
    /// correlation id sent to the server.
    pub fn pending(
        conversation_id: &str,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let id = format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4());

        Self {
            client_id: Some(id.clone()),
            id,
            conversation_id: conversation_id.to_owned(),
            sender_id: sender_id.to_owned(),
            receiver_id: receiver_id.to_owned(),
            body: body.to_owned(),
            read: false,
            timestamp,
            delivery: DeliveryState::Pending,
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    pub fn is_unread_for(&self, user_id: &str) -> bool {
        !self.read && self.receiver_id == user_id
    }

    pub fn is_awaiting_echo(&self) -> bool {
        self.delivery != DeliveryState::Confirmed
    }
}
