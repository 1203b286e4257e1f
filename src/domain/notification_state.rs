use super::{notification::Notification, unread::UnreadCounter};

/// Notification list and unread counter of one user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationState {
    user_id: Option<String>,
    notifications: Vec<Notification>,
    unread: UnreadCounter,
    pending_load: Option<u64>,
    next_generation: u64,
    pushed_during_load: Vec<String>,
    error: Option<String>,
}

impl NotificationState {
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Newest first.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn get(&self, notification_id: &str) -> Option<&Notification> {
        self.notifications
            .iter()
            .find(|notification| notification.id == notification_id)
    }

    pub fn unread_count(&self) -> u32 {
        self.unread.get()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn begin_load(&mut self) -> u64 {
        self.error = None;
        if self.pending_load.is_none() {
            self.pushed_during_load.clear();
        }
        self.next_generation += 1;
        self.pending_load = Some(self.next_generation);
        self.next_generation
    }

    pub fn finish_load(&mut self, generation: u64) -> bool {
        if self.pending_load != Some(generation) {
            return false;
        }

        self.pending_load = None;
        true
    }

    /// Replaces the list with a server page and reseeds the counter from the
    /// server-provided baseline. Notifications pushed while the page was in
    /// flight and missing from it stay on top and add to the baseline when
    /// unread.
    pub fn replace(&mut self, notifications: Vec<Notification>, unread_baseline: u32) {
        let mut seen = std::collections::HashSet::new();
        let page: Vec<Notification> = notifications
            .into_iter()
            .filter(|notification| seen.insert(notification.id.clone()))
            .collect();

        let pushed_ids = std::mem::take(&mut self.pushed_during_load);
        let carried: Vec<Notification> = self
            .notifications
            .drain(..)
            .filter(|notification| {
                pushed_ids.contains(&notification.id) && !seen.contains(&notification.id)
            })
            .collect();

        let carried_unread = carried.iter().filter(|notification| !notification.read).count();
        let carried_unread = u32::try_from(carried_unread).unwrap_or(u32::MAX);

        self.notifications = carried;
        self.notifications.extend(page);
        self.unread = UnreadCounter::new(unread_baseline.saturating_add(carried_unread));
    }

    /// Prepends a pushed notification. Duplicates and notifications for other
    /// users are ignored.
    pub fn prepend(&mut self, notification: Notification) -> bool {
        if self
            .user_id
            .as_deref()
            .is_some_and(|user_id| user_id != notification.user_id)
        {
            return false;
        }

        if self.get(&notification.id).is_some() {
            return false;
        }

        if !notification.read {
            self.unread.increment();
        }
        if self.pending_load.is_some() {
            self.pushed_during_load.push(notification.id.clone());
        }
        self.notifications.insert(0, notification);
        true
    }

    /// Flips one notification to read; the counter moves only on a real flip.
    pub fn mark_read(&mut self, notification_id: &str) -> bool {
        let Some(notification) = self
            .notifications
            .iter_mut()
            .find(|notification| notification.id == notification_id)
        else {
            return false;
        };

        if notification.read {
            return false;
        }

        notification.read = true;
        self.unread.decrement();
        true
    }

    /// Marks everything read and returns the unread count before the call.
    pub fn mark_all_read(&mut self) -> u32 {
        let previous = self.unread.get();
        for notification in &mut self.notifications {
            notification.read = true;
        }
        self.unread.reset();
        previous
    }
}
