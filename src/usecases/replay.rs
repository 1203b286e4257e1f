//! Scripted sessions: a JSON-lines file of user actions and server events
//! replayed against both engines over in-process transports.
//!
//! ```text
//! {"step":"load-conversations"}
//! {"step":"send","conversationId":"conv-1","receiverId":"user-2","body":"Hello"}
//! {"step":"inbound","event":{"event":"message-read","data":{"messageId":"m-1"}}}
//! ```

use std::{fmt, fs, path::Path, sync::Arc};

use serde::Deserialize;

use crate::{
    domain::{
        events::InboundEvent,
        message::{DeliveryState, Message},
    },
    infra::error::AppError,
    transport::{callbacks::LifecycleCallbacks, loopback::LoopbackTransport, Transport},
    usecases::{
        chat_engine::{ChatEngine, ChatEngineConfig},
        context::AppContext,
        notification_engine::NotificationEngine,
    },
};

const REPLAY_STEP_SKIPPED: &str = "REPLAY_STEP_SKIPPED";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ReplayStep {
    LoadConversations,
    LoadMessages {
        conversation_id: String,
    },
    Send {
        conversation_id: String,
        receiver_id: String,
        body: String,
    },
    MarkRead {
        message_id: String,
    },
    Retry {
        client_id: String,
    },
    LoadNotifications,
    MarkNotificationRead {
        notification_id: String,
    },
    MarkAllNotificationsRead,
    DropConnection {
        reason: String,
    },
    Reconnect {
        attempt: u32,
    },
    Inbound {
        event: InboundEvent,
    },
}

/// Parses a script, skipping blank lines and `#` comments.
pub fn parse_script(raw: &str) -> Result<Vec<ReplayStep>, AppError> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line.trim()).map_err(|source| AppError::ScriptParse {
                line: index + 1,
                source,
            })
        })
        .collect()
}

pub fn load_script(path: &Path) -> Result<Vec<ReplayStep>, AppError> {
    let raw = fs::read_to_string(path).map_err(|source| AppError::ScriptRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&raw)
}

/// Counts reported after a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub user_id: Option<String>,
    pub steps: usize,
    pub connection: &'static str,
    pub conversations: usize,
    pub unread_messages: u32,
    pub messages: usize,
    pub pending: usize,
    pub failed: usize,
    pub notifications: usize,
    pub unread_notifications: u32,
    pub emitted: usize,
    pub chat_error: Option<String>,
    pub notification_error: Option<String>,
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "user: {} ({})",
            self.user_id.as_deref().unwrap_or("<signed out>"),
            self.connection
        )?;
        writeln!(f, "steps replayed: {}", self.steps)?;
        writeln!(
            f,
            "conversations: {} (unread messages: {})",
            self.conversations, self.unread_messages
        )?;
        writeln!(
            f,
            "messages: {} ({} pending, {} failed)",
            self.messages, self.pending, self.failed
        )?;
        writeln!(
            f,
            "notifications: {} (unread: {})",
            self.notifications, self.unread_notifications
        )?;
        write!(f, "emitted events: {}", self.emitted)?;
        if let Some(error) = &self.chat_error {
            write!(f, "\nchat error: {error}")?;
        }
        if let Some(error) = &self.notification_error {
            write!(f, "\nnotification error: {error}")?;
        }
        Ok(())
    }
}

/// Both engines mounted for one user over loopback transports. The chat
/// transport echoes sends back as confirmations.
#[derive(Debug)]
pub struct ReplaySession {
    user_id: Option<String>,
    chat: Option<ChatEngine>,
    notifications: NotificationEngine,
    chat_transport: Arc<LoopbackTransport>,
    notification_transport: Arc<LoopbackTransport>,
    steps: usize,
}

impl ReplaySession {
    pub fn start(context: &AppContext, user_id: Option<String>) -> Self {
        let chat_transport = Arc::new(LoopbackTransport::with_echo());
        let notification_transport = Arc::new(LoopbackTransport::new());
        let chat_config = &context.config.chat;

        let chat = user_id.as_ref().map(|user_id| {
            let transport: Arc<dyn Transport> = chat_transport.clone();
            ChatEngine::mount(
                ChatEngineConfig {
                    user_id: user_id.clone(),
                    channel_url: chat_config.channel_url.clone(),
                    echo_window_ms: chat_config.echo_match_window_ms,
                },
                transport,
                Arc::clone(&context.chat_history),
                LifecycleCallbacks::new()
                    .on_disconnect(|reason| tracing::info!(%reason, "chat went offline")),
            )
        });

        let transport: Arc<dyn Transport> = notification_transport.clone();
        let notifications = NotificationEngine::mount(
            user_id.clone(),
            &chat_config.channel_url,
            transport,
            Arc::clone(&context.notification_history),
            LifecycleCallbacks::new(),
        );

        Self {
            user_id,
            chat,
            notifications,
            chat_transport,
            notification_transport,
            steps: 0,
        }
    }

    pub async fn apply(&mut self, step: &ReplayStep) {
        self.steps += 1;

        match step {
            ReplayStep::LoadNotifications => self.notifications.load().await,
            ReplayStep::MarkNotificationRead { notification_id } => {
                self.notifications.mark_as_read(notification_id).await
            }
            ReplayStep::MarkAllNotificationsRead => self.notifications.mark_all_as_read().await,
            ReplayStep::DropConnection { reason } => {
                self.chat_transport.drop_connection(reason);
                self.notification_transport.drop_connection(reason);
            }
            ReplayStep::Reconnect { attempt } => {
                self.chat_transport.reconnect(*attempt);
                self.notification_transport.reconnect(*attempt);
            }
            ReplayStep::Inbound { event } => self.route_inbound(event),
            chat_step => self.apply_chat(chat_step).await,
        }
    }

    async fn apply_chat(&self, step: &ReplayStep) {
        let Some(chat) = &self.chat else {
            tracing::warn!(code = REPLAY_STEP_SKIPPED, ?step, "chat step needs a signed-in user");
            return;
        };

        match step {
            ReplayStep::LoadConversations => chat.load_conversations().await,
            ReplayStep::LoadMessages { conversation_id } => {
                chat.load_messages(conversation_id).await
            }
            ReplayStep::Send {
                conversation_id,
                receiver_id,
                body,
            } => {
                chat.send_message(conversation_id, receiver_id, body);
            }
            ReplayStep::MarkRead { message_id } => chat.mark_as_read(message_id).await,
            ReplayStep::Retry { client_id } => {
                chat.retry_message(client_id);
            }
            _ => {}
        }
    }

    fn route_inbound(&self, event: &InboundEvent) {
        let name = event.name();
        if name.is_lifecycle() {
            self.chat_transport.inject(event);
            self.notification_transport.inject(event);
        } else if matches!(
            event,
            InboundEvent::NotificationNew(_) | InboundEvent::NotificationRead(_)
        ) {
            self.notification_transport.inject(event);
        } else {
            self.chat_transport.inject(event);
        }
    }

    pub fn summary(&self) -> ReplaySummary {
        let notifications = self.notifications.snapshot();
        let mut summary = ReplaySummary {
            user_id: self.user_id.clone(),
            steps: self.steps,
            connection: "DISCONNECTED",
            conversations: 0,
            unread_messages: 0,
            messages: 0,
            pending: 0,
            failed: 0,
            notifications: notifications.notifications().len(),
            unread_notifications: notifications.unread_count(),
            emitted: self.chat_transport.emitted().len(),
            chat_error: None,
            notification_error: notifications.error().map(str::to_owned),
        };

        if let Some(chat) = &self.chat {
            let state = chat.snapshot();
            let threads: Vec<_> = state
                .conversations()
                .iter()
                .flat_map(|conversation| state.thread(&conversation.id))
                .collect();

            summary.connection = state.connection().as_label();
            summary.conversations = state.conversations().len();
            summary.unread_messages = state.unread_count();
            summary.messages = threads.len();
            summary.pending = count_delivery(&threads, DeliveryState::Pending);
            summary.failed = count_delivery(&threads, DeliveryState::Failed);
            summary.chat_error = state.error().map(str::to_owned);
        }

        summary
    }

    pub fn unmount(&self) {
        if let Some(chat) = &self.chat {
            chat.unmount();
        }
        self.notifications.unmount();
    }
}

fn count_delivery(messages: &[&Message], delivery: DeliveryState) -> usize {
    messages
        .iter()
        .filter(|message| message.delivery == delivery)
        .count()
}

/// Replays `steps` and returns the final summary. Engines are unmounted
/// before returning.
pub async fn run_replay(
    context: &AppContext,
    user_id: Option<String>,
    steps: &[ReplayStep],
) -> ReplaySummary {
    let mut session = ReplaySession::start(context, user_id);
    for step in steps {
        session.apply(step).await;
    }

    let summary = session.summary();
    session.unmount();
    summary
}
