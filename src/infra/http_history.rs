use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    domain::{conversation::Conversation, message::Message, notification::Notification},
    infra::error::AppError,
    usecases::contracts::{ChatHistory, FetchError, NotificationHistory, NotificationPage},
};

/// REST client for conversation, message and notification history.
#[derive(Debug, Clone)]
pub struct HttpHistoryFetcher {
    client: Client,
    base_url: Url,
}

impl HttpHistoryFetcher {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let parsed = Url::parse(base_url).map_err(|source| AppError::InvalidApiUrl {
            url: base_url.to_owned(),
            details: source.to_string(),
        })?;

        if parsed.cannot_be_a_base() {
            return Err(AppError::InvalidApiUrl {
                url: base_url.to_owned(),
                details: "url cannot carry a path".to_owned(),
            });
        }

        Ok(Self {
            client: Client::new(),
            base_url: parsed,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let text = self.send(self.client.get(url)).await?;
        serde_json::from_str(&text).map_err(|e| FetchError::InvalidData(e.to_string()))
    }

    async fn patch(&self, url: Url) -> Result<(), FetchError> {
        self.send(self.client.patch(url)).await.map(|_| ())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(server_error(status.as_u16(), &text));
        }

        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

fn server_error(status: u16, body: &str) -> FetchError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message.or(body.error));

    FetchError::Server { status, message }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationPageBody {
    notifications: Vec<Notification>,
    #[serde(default)]
    unread_count: Option<u32>,
}

impl From<NotificationPageBody> for NotificationPage {
    fn from(body: NotificationPageBody) -> Self {
        let unread_count = body.unread_count.unwrap_or_else(|| {
            let unread = body.notifications.iter().filter(|n| !n.read).count();
            u32::try_from(unread).unwrap_or(u32::MAX)
        });

        Self {
            notifications: body.notifications,
            unread_count,
        }
    }
}

#[async_trait]
impl ChatHistory for HttpHistoryFetcher {
    async fn conversations(&self, user_id: &str) -> Result<Vec<Conversation>, FetchError> {
        self.get_json(self.endpoint(&["messages", "conversations", user_id]))
            .await
    }

    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, FetchError> {
        self.get_json(self.endpoint(&["messages", conversation_id]))
            .await
    }

    async fn mark_message_read(&self, message_id: &str) -> Result<(), FetchError> {
        self.patch(self.endpoint(&["messages", message_id, "read"]))
            .await
    }
}

#[async_trait]
impl NotificationHistory for HttpHistoryFetcher {
    async fn notifications(&self, user_id: &str) -> Result<NotificationPage, FetchError> {
        let body: NotificationPageBody = self
            .get_json(self.endpoint(&["notifications", "user", user_id]))
            .await?;
        Ok(body.into())
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), FetchError> {
        self.patch(self.endpoint(&["notifications", notification_id, "read"]))
            .await
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<(), FetchError> {
        self.patch(self.endpoint(&["notifications", "user", user_id, "read-all"]))
            .await
    }
}
