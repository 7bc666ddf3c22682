use super::Topic;
use std::collections::HashMap;
use std::sync::Mutex;

/// Per-topic slot holding only the newest unread publication.
///
/// A store replaces any unread payload on the same topic, a take empties the
/// slot. Both happen under one lock, so a reader never sees two payloads of
/// one topic without having taken the first.
#[derive(Debug, Default)]
pub struct Mailbox {
    slots: Mutex<HashMap<Topic, String>>,
}

impl Mailbox {
    pub fn new() -> Self { Self::default() }

    /// Stores `payload`, returning the unread payload it overwrote, if any.
    pub fn store(&self, topic: Topic, payload: String) -> Option<String> {
        self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(topic, payload)
    }

    /// Removes and returns the pending payload of `topic`.
    pub fn take(&self, topic: Topic) -> Option<String> {
        self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remove(&topic)
    }

    /// Whether an unread payload is waiting on `topic`.
    pub fn is_pending(&self, topic: Topic) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(&topic)
    }
}
