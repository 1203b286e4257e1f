use serde::{Deserialize, Serialize};

/// Non-negative unread counter maintained incrementally.
///
/// Decrements saturate at zero so duplicate read events can never push the
/// count negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnreadCounter(u32);

impl UnreadCounter {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn increment(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    /// Returns false when the counter was already at zero.
    pub fn decrement(&mut self) -> bool {
        if self.0 == 0 {
            return false;
        }

        self.0 -= 1;
        true
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

impl From<u32> for UnreadCounter {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
