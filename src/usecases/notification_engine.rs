use std::{
    fmt,
    sync::{mpsc, Arc},
};

use crate::{
    domain::{
        events::{EventName, InboundEvent},
        notification_state::NotificationState,
    },
    transport::{callbacks::LifecycleCallbacks, connection_manager::ConnectionManager, Transport},
    usecases::{
        contracts::{NotificationHistory, GENERIC_FETCH_ERROR},
        snapshot_store::SnapshotStore,
    },
};

const NOTIFICATIONS_INERT: &str = "NOTIFICATIONS_INERT";
const NOTIFICATIONS_STALE_LOAD_DISCARDED: &str = "NOTIFICATIONS_STALE_LOAD_DISCARDED";
const NOTIFICATIONS_LOAD_FAILED: &str = "NOTIFICATIONS_LOAD_FAILED";
const NOTIFICATIONS_PERSIST_FAILED: &str = "NOTIFICATIONS_PERSIST_FAILED";

/// Notification list and unread count for the signed-in user. Without a user
/// the engine stays inert: no channel, no fetches.
pub struct NotificationEngine {
    user_id: Option<String>,
    connection: Option<ConnectionManager>,
    history: Arc<dyn NotificationHistory>,
    store: SnapshotStore<NotificationState>,
}

impl fmt::Debug for NotificationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationEngine")
            .field("user_id", &self.user_id)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl NotificationEngine {
    pub fn mount(
        user_id: Option<String>,
        channel_url: &str,
        transport: Arc<dyn Transport>,
        history: Arc<dyn NotificationHistory>,
        callbacks: LifecycleCallbacks,
    ) -> Self {
        let store = SnapshotStore::new(NotificationState::new(user_id.clone()));

        let connection = match user_id {
            Some(_) => {
                let connection = ConnectionManager::new(transport, channel_url, callbacks);
                register_handlers(&connection, &store);
                connection.connect();
                Some(connection)
            }
            None => {
                tracing::debug!(code = NOTIFICATIONS_INERT, "no signed-in user, notifications inert");
                None
            }
        };

        Self {
            user_id,
            connection,
            history,
            store,
        }
    }

    pub fn snapshot(&self) -> NotificationState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> mpsc::Receiver<NotificationState> {
        self.store.subscribe()
    }

    pub fn unread_count(&self) -> u32 {
        self.store.read(NotificationState::unread_count)
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(ConnectionManager::is_connected)
    }

    pub fn connection(&self) -> Option<&ConnectionManager> {
        self.connection.as_ref()
    }

    pub fn clear_error(&self) {
        self.store.mutate(|state| state.clear_error());
    }

    /// Seeds the list and the unread baseline from the server.
    pub async fn load(&self) {
        let Some(user_id) = self.user_id.as_deref() else {
            return;
        };

        let generation = self.store.mutate(NotificationState::begin_load);
        let result = self.history.notifications(user_id).await;

        self.store.mutate(|state| {
            if !state.finish_load(generation) {
                tracing::debug!(
                    code = NOTIFICATIONS_STALE_LOAD_DISCARDED,
                    generation,
                    "discarded superseded notifications load"
                );
                return;
            }

            match result {
                Ok(page) => state.replace(page.notifications, page.unread_count),
                Err(error) => {
                    tracing::warn!(
                        code = NOTIFICATIONS_LOAD_FAILED,
                        error = %error,
                        "notifications load failed"
                    );
                    state.fail(error.user_message(GENERIC_FETCH_ERROR));
                }
            }
        });
    }

    /// Persists only when the local flip actually happened.
    pub async fn mark_as_read(&self, notification_id: &str) {
        if self.user_id.is_none() {
            return;
        }

        if !self.store.mutate(|state| state.mark_read(notification_id)) {
            return;
        }

        if let Err(error) = self.history.mark_notification_read(notification_id).await {
            tracing::warn!(
                code = NOTIFICATIONS_PERSIST_FAILED,
                notification_id,
                error = %error,
                "notification read was not persisted"
            );
            self.store
                .mutate(|state| state.fail(error.user_message(GENERIC_FETCH_ERROR)));
        }
    }

    pub async fn mark_all_as_read(&self) {
        let Some(user_id) = self.user_id.as_deref() else {
            return;
        };

        if self.store.mutate(NotificationState::mark_all_read) == 0 {
            return;
        }

        if let Err(error) = self.history.mark_all_notifications_read(user_id).await {
            tracing::warn!(
                code = NOTIFICATIONS_PERSIST_FAILED,
                error = %error,
                "mark-all-read was not persisted"
            );
            self.store
                .mutate(|state| state.fail(error.user_message(GENERIC_FETCH_ERROR)));
        }
    }

    pub fn unmount(&self) {
        if let Some(connection) = &self.connection {
            connection.teardown();
        }
    }
}

fn register_handlers(connection: &ConnectionManager, store: &SnapshotStore<NotificationState>) {
    let pushed = store.clone();
    connection.on(EventName::NotificationNew, move |event| {
        if let InboundEvent::NotificationNew(notification) = event {
            pushed.mutate(|state| state.prepend(notification.clone()));
        }
    });

    let reads = store.clone();
    connection.on(EventName::NotificationRead, move |event| {
        if let InboundEvent::NotificationRead(payload) = event {
            reads.mutate(|state| state.mark_read(&payload.notification_id));
        }
    });
}
