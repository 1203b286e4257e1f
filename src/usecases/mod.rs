//! Use case layer: the chat and notification engines and their wiring.

pub mod bootstrap;
pub mod chat_engine;
pub mod context;
pub mod contracts;
pub mod notification_engine;
pub mod replay;
pub mod snapshot_store;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
