use serde::Deserialize;

use crate::infra::config::{AppConfig, ChatConfig, LogConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub chat: Option<FileChatConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(chat) = self.chat {
            chat.merge_into(&mut config.chat);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileChatConfig {
    pub channel_url: Option<String>,
    pub api_base_url: Option<String>,
    pub user_id: Option<String>,
    pub echo_match_window_ms: Option<i64>,
}

impl FileChatConfig {
    fn merge_into(self, config: &mut ChatConfig) {
        if let Some(channel_url) = self.channel_url {
            config.channel_url = channel_url;
        }

        if let Some(api_base_url) = self.api_base_url.filter(|url| !url.trim().is_empty()) {
            config.api_base_url = Some(api_base_url);
        }

        if let Some(user_id) = self.user_id.filter(|id| !id.trim().is_empty()) {
            config.user_id = Some(user_id);
        }

        if let Some(window_ms) = self.echo_match_window_ms {
            config.echo_match_window_ms = window_ms.max(0);
        }
    }
}
