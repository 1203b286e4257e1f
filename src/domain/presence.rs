use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    pub user_id: String,
    pub online: bool,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Presence entries keyed by user id. Only written from inbound events.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresenceMap {
    entries: HashMap<String, UserStatus>,
}

impl PresenceMap {
    /// Inserts or replaces the entry; returns true when something changed.
    pub fn upsert(&mut self, status: UserStatus) -> bool {
        match self.entries.get(&status.user_id) {
            Some(existing) if *existing == status => false,
            _ => {
                self.entries.insert(status.user_id.clone(), status);
                true
            }
        }
    }

    pub fn get(&self, user_id: &str) -> Option<&UserStatus> {
        self.entries.get(user_id)
    }

    /// Unknown users are reported offline.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.entries.get(user_id).is_some_and(|status| status.online)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
