use serde::{Deserialize, Serialize};

use crate::domain::chat_state::DEFAULT_ECHO_WINDOW_MS;

pub const DEFAULT_CHANNEL_URL: &str = "ws://localhost:5000";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatConfig {
    pub channel_url: String,
    /// History service root. Without it history comes back empty.
    pub api_base_url: Option<String>,
    pub user_id: Option<String>,
    pub echo_match_window_ms: i64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            channel_url: DEFAULT_CHANNEL_URL.to_owned(),
            api_base_url: None,
            user_id: None,
            echo_match_window_ms: DEFAULT_ECHO_WINDOW_MS,
        }
    }
}
