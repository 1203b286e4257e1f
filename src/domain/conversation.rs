use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{message::Message, unread::UnreadCounter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub participants: BTreeSet<String>,
    #[serde(default)]
    pub participant_names: BTreeMap<String, String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread_count: UnreadCounter,
}

impl Conversation {
    /// Seeds a conversation from the first message seen for it.
    pub fn from_message(message: &Message) -> Self {
        Self {
            id: message.conversation_id.clone(),
            participants: [message.sender_id.clone(), message.receiver_id.clone()]
                .into_iter()
                .collect(),
            participant_names: BTreeMap::new(),
            last_message: None,
            last_message_time: None,
            unread_count: UnreadCounter::default(),
        }
    }

    /// Returns the first participant that is not `user_id`.
    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        self.participants
            .iter()
            .map(String::as_str)
            .find(|participant| *participant != user_id)
    }

    pub fn display_name<'a>(&'a self, user_id: &'a str) -> &'a str {
        self.participant_names
            .get(user_id)
            .map(String::as_str)
            .unwrap_or(user_id)
    }

    /// Moves the preview forward; older messages never replace a newer preview.
    pub fn record_last_message(&mut self, message: &Message) {
        let is_newer = self
            .last_message_time
            .map_or(true, |current| message.timestamp >= current);

        if is_newer {
            self.last_message = Some(message.body.clone());
            self.last_message_time = Some(message.timestamp);
        }
    }
}

/// Conversations keyed by id with insert-or-update semantics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationMap {
    entries: HashMap<String, Conversation>,
}

impl ConversationMap {
    pub fn replace_all(&mut self, conversations: Vec<Conversation>) {
        self.entries = conversations
            .into_iter()
            .map(|conversation| (conversation.id.clone(), conversation))
            .collect();
    }

    pub fn get(&self, conversation_id: &str) -> Option<&Conversation> {
        self.entries.get(conversation_id)
    }

    pub fn get_mut(&mut self, conversation_id: &str) -> Option<&mut Conversation> {
        self.entries.get_mut(conversation_id)
    }

    pub fn upsert_for_message(&mut self, message: &Message) -> &mut Conversation {
        self.entries
            .entry(message.conversation_id.clone())
            .or_insert_with(|| Conversation::from_message(message))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_unread(&self) -> u32 {
        self.entries
            .values()
            .map(|conversation| conversation.unread_count.get())
            .sum()
    }

    /// Most recently active first; conversations without messages last.
    pub fn sorted(&self) -> Vec<&Conversation> {
        let mut conversations: Vec<&Conversation> = self.entries.values().collect();
        conversations.sort_by(|left, right| {
            right
                .last_message_time
                .cmp(&left.last_message_time)
                .then_with(|| left.id.cmp(&right.id))
        });
        conversations
    }
}
