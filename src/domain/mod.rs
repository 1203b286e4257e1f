//! Domain layer: chat entities and reconciliation rules.

pub mod chat_state;
pub mod conversation;
pub mod events;
pub mod message;
pub mod notification;
pub mod notification_state;
pub mod presence;
pub mod status;
pub mod unread;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
