//! Bookkeeping for bot-sent messages that should be deleted later.
//!
//! Every reply the bot sends is recorded here. The message sweeper takes
//! expired entries out with [`MessageTracker::take_expired`] and deletes
//! them from the chat. Nothing in here feeds back into task logic.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::chat::{ChatId, ChatKind, MessageId};
use crate::task::UserId;

/// A message sent by the bot, pending timed deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedMessage {
    /// Platform message id.
    pub message_id: MessageId,
    /// Chat the message was sent to.
    pub chat_id: ChatId,
    /// Kind of that chat.
    pub chat_kind: ChatKind,
    /// When the message was sent.
    pub sent_at: Instant,
}

impl TrackedMessage {
    /// A message sent just now.
    #[must_use]
    pub fn now(message_id: MessageId, chat_id: ChatId, chat_kind: ChatKind) -> Self {
        Self {
            message_id,
            chat_id,
            chat_kind,
            sent_at: Instant::now(),
        }
    }
}

/// Per-user buckets of tracked messages.
#[derive(Debug, Default)]
pub struct MessageTracker {
    by_user: Mutex<HashMap<UserId, Vec<TrackedMessage>>>,
}

impl MessageTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sent message.
    pub fn track(&self, user: &UserId, message: TrackedMessage) {
        self.by_user
            .lock()
            .entry(user.clone())
            .or_default()
            .push(message);
    }

    /// Removes and returns every message older than `lifetime` at `now`.
    ///
    /// A message is expired once its age reaches `lifetime`. Buckets left
    /// empty are dropped.
    pub fn take_expired(&self, now: Instant, lifetime: Duration) -> Vec<(UserId, TrackedMessage)> {
        let mut by_user = self.by_user.lock();
        let mut expired = Vec::new();

        for (user, messages) in by_user.iter_mut() {
            let (old, fresh): (Vec<_>, Vec<_>) = messages
                .drain(..)
                .partition(|m| now.saturating_duration_since(m.sent_at) >= lifetime);
            *messages = fresh;
            expired.extend(old.into_iter().map(|m| (user.clone(), m)));
        }
        by_user.retain(|_, messages| !messages.is_empty());
        expired
    }

    /// Number of messages tracked for `user`.
    #[must_use]
    pub fn tracked_count(&self, user: &UserId) -> usize {
        self.by_user.lock().get(user).map_or(0, Vec::len)
    }

    /// Number of users with at least one tracked message.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.by_user.lock().len()
    }
}
