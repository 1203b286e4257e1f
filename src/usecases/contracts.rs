use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{conversation::Conversation, message::Message, notification::Notification};

pub const GENERIC_FETCH_ERROR: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("server responded with status {status}")]
    Server {
        status: u16,
        message: Option<String>,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response data: {0}")]
    InvalidData(String),
}

impl FetchError {
    /// Server-provided message when present, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Server {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_owned(),
        }
    }
}

/// Notifications page with the server-computed unread baseline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub unread_count: u32,
}

#[async_trait]
pub trait ChatHistory: Send + Sync {
    async fn conversations(&self, user_id: &str) -> Result<Vec<Conversation>, FetchError>;
    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, FetchError>;
    async fn mark_message_read(&self, message_id: &str) -> Result<(), FetchError>;
}

#[async_trait]
pub trait NotificationHistory: Send + Sync {
    async fn notifications(&self, user_id: &str) -> Result<NotificationPage, FetchError>;
    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), FetchError>;
    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<(), FetchError>;
}
