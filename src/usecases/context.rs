use std::{fmt, sync::Arc};

use crate::{
    infra::config::AppConfig,
    usecases::contracts::{ChatHistory, NotificationHistory},
};

pub struct AppContext {
    pub config: AppConfig,
    pub chat_history: Arc<dyn ChatHistory>,
    pub notification_history: Arc<dyn NotificationHistory>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        chat_history: Arc<dyn ChatHistory>,
        notification_history: Arc<dyn NotificationHistory>,
    ) -> Self {
        Self {
            config,
            chat_history,
            notification_history,
        }
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
