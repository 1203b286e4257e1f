use async_trait::async_trait;

use crate::{
    domain::{conversation::Conversation, message::Message},
    usecases::contracts::{ChatHistory, FetchError, NotificationHistory, NotificationPage},
};

#[cfg(test)]
use crate::infra::{config::AppConfig, contracts::ConfigAdapter};

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StubConfigAdapter;

#[cfg(test)]
impl ConfigAdapter for StubConfigAdapter {
    fn load(&self) -> anyhow::Result<AppConfig> {
        Ok(AppConfig::default())
    }
}

/// History source used when no api base url is configured: every fetch is
/// empty and every write succeeds.
#[derive(Debug, Clone, Default)]
pub struct OfflineHistory;

#[async_trait]
impl ChatHistory for OfflineHistory {
    async fn conversations(&self, _user_id: &str) -> Result<Vec<Conversation>, FetchError> {
        Ok(Vec::new())
    }

    async fn messages(&self, _conversation_id: &str) -> Result<Vec<Message>, FetchError> {
        Ok(Vec::new())
    }

    async fn mark_message_read(&self, _message_id: &str) -> Result<(), FetchError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationHistory for OfflineHistory {
    async fn notifications(&self, _user_id: &str) -> Result<NotificationPage, FetchError> {
        Ok(NotificationPage::default())
    }

    async fn mark_notification_read(&self, _notification_id: &str) -> Result<(), FetchError> {
        Ok(())
    }

    async fn mark_all_notifications_read(&self, _user_id: &str) -> Result<(), FetchError> {
        Ok(())
    }
}
