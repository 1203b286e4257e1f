use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Booking,
    Payment,
    Message,
    Review,
    System,
}

impl NotificationKind {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Payment => "payment",
            Self::Message => "message",
            Self::Review => "review",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_notification() {
        let raw = r#"{
            "id": "n-1",
            "userId": "user-1",
            "type": "booking",
            "title": "Lesson booked",
            "body": "Algebra on Monday",
            "read": false,
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;

        let notification: Notification = serde_json::from_str(raw).expect("payload should parse");

        assert_eq!(notification.kind, NotificationKind::Booking);
        assert_eq!(notification.kind.as_label(), "booking");
        assert!(!notification.read);
    }

    #[test]
    fn rejects_unknown_kind() {
        let raw = r#"{
            "id": "n-1",
            "userId": "user-1",
            "type": "promo",
            "title": "x",
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;

        assert!(serde_json::from_str::<Notification>(raw).is_err());
    }
}
