use std::{path::Path, sync::Arc};

use crate::{
    infra::{
        self,
        config::FileConfigAdapter,
        contracts::ConfigAdapter,
        error::AppError,
        http_history::HttpHistoryFetcher,
        stubs::OfflineHistory,
    },
    usecases::{
        context::AppContext,
        contracts::{ChatHistory, NotificationHistory},
    },
};

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let adapter = FileConfigAdapter::new(config_path);
    let context = build_context(&adapter)?;
    infra::logging::init(&context.config.logging)?;

    let history = match context.config.chat.api_base_url {
        Some(_) => "http",
        None => "offline",
    };
    tracing::debug!(
        config_path = %adapter.path().display(),
        history,
        "context ready"
    );

    Ok(context)
}

fn build_context(adapter: &dyn ConfigAdapter) -> Result<AppContext, AppError> {
    let config = adapter.load().map_err(AppError::Other)?;

    let (chat_history, notification_history): (Arc<dyn ChatHistory>, Arc<dyn NotificationHistory>) =
        match config.chat.api_base_url.as_deref() {
            Some(base_url) => {
                let fetcher = Arc::new(HttpHistoryFetcher::new(base_url)?);
                (
                    fetcher.clone() as Arc<dyn ChatHistory>,
                    fetcher as Arc<dyn NotificationHistory>,
                )
            }
            None => {
                let offline = Arc::new(OfflineHistory);
                (
                    offline.clone() as Arc<dyn ChatHistory>,
                    offline as Arc<dyn NotificationHistory>,
                )
            }
        };

    Ok(AppContext::new(config, chat_history, notification_history))
}
