//! Chat platform seam.
//!
//! Defines the [`ChatClient`] trait through which the bot sends and deletes
//! messages, and the platform-neutral message types it carries. Concrete
//! implementations include:
//! - [`RecordingChat`]: in-process client that records every call, for tests
//! - `todobot::console::ConsoleChat`: prints to stdout

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use parking_lot::Mutex;

use crate::task::UserId;

/// Identifier of a chat (private conversation, group, or channel).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatId(String);

impl ChatId {
    /// Create a chat identifier from its string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string representation of this chat id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&UserId> for ChatId {
    /// A user's private chat shares the user's id.
    fn from(user: &UserId) -> Self {
        Self(user.as_str().to_string())
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform-assigned id of a sent message, unique within its chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of chat a message lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatKind {
    /// One-to-one conversation with the bot.
    #[default]
    Private,
    /// Group chat the bot was added to.
    Group,
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Private => "private",
            Self::Group => "group",
        })
    }
}

/// An inline button. Pressing it sends `data` back as a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Text shown on the button.
    pub label: String,
    /// Callback payload.
    pub data: String,
}

impl Button {
    /// Create a button.
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// A message to send: text plus optional rows of buttons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutboundMessage {
    /// Plain message text.
    pub text: String,
    /// Button rows, top to bottom.
    pub buttons: Vec<Vec<Button>>,
}

impl OutboundMessage {
    /// A text-only message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    /// Attach button rows.
    #[must_use]
    pub fn with_buttons(mut self, buttons: Vec<Vec<Button>>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// What the platform reports back after a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    /// Id of the new message.
    pub message_id: MessageId,
}

/// Errors reported by a [`ChatClient`].
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The user blocked the bot or left the chat.
    #[error("chat {0} is not reachable")]
    Unreachable(ChatId),

    /// The message no longer exists (already deleted, or too old).
    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    /// Any other platform-side failure.
    #[error("chat platform error: {0}")]
    Platform(String),

    /// An underlying I/O error occurred.
    #[error("chat I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Async client for the chat platform.
pub trait ChatClient: Send + Sync {
    /// Send a message to a chat.
    fn send_message(
        &self,
        chat: &ChatId,
        message: &OutboundMessage,
    ) -> impl std::future::Future<Output = Result<SentMessage, ChatError>> + Send;

    /// Delete a previously sent message.
    fn delete_message(
        &self,
        chat: &ChatId,
        message_id: MessageId,
    ) -> impl std::future::Future<Output = Result<(), ChatError>> + Send;
}

/// In-process [`ChatClient`] that records every send and delete.
///
/// Message ids are handed out sequentially starting at 1. Sends and
/// deletes can be made to fail, globally or for specific chats.
#[derive(Debug, Default)]
pub struct RecordingChat {
    next_id: AtomicI64,
    sent: Mutex<Vec<(ChatId, MessageId, OutboundMessage)>>,
    deleted: Mutex<Vec<(ChatId, MessageId)>>,
    unreachable: Mutex<Vec<ChatId>>,
    fail_deletes: AtomicBool,
}

impl RecordingChat {
    /// Create a client with no recorded traffic.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `chat` fail with [`ChatError::Unreachable`].
    pub fn block_chat(&self, chat: ChatId) {
        self.unreachable.lock().push(chat);
    }

    /// Make every delete fail with [`ChatError::MessageNotFound`].
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// All successfully sent messages, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<(ChatId, MessageId, OutboundMessage)> {
        self.sent.lock().clone()
    }

    /// Text of the most recent message sent to `chat`.
    #[must_use]
    pub fn last_text(&self, chat: &ChatId) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(c, _, _)| c == chat)
            .map(|(_, _, m)| m.text.clone())
    }

    /// Most recent message sent to `chat`.
    #[must_use]
    pub fn last_message(&self, chat: &ChatId) -> Option<OutboundMessage> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(c, _, _)| c == chat)
            .map(|(_, _, m)| m.clone())
    }

    /// All delete attempts, including failed ones.
    #[must_use]
    pub fn deleted(&self) -> Vec<(ChatId, MessageId)> {
        self.deleted.lock().clone()
    }
}

impl ChatClient for RecordingChat {
    async fn send_message(
        &self,
        chat: &ChatId,
        message: &OutboundMessage,
    ) -> Result<SentMessage, ChatError> {
        if self.unreachable.lock().contains(chat) {
            return Err(ChatError::Unreachable(chat.clone()));
        }
        let message_id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.sent
            .lock()
            .push((chat.clone(), message_id, message.clone()));
        Ok(SentMessage { message_id })
    }

    async fn delete_message(&self, chat: &ChatId, message_id: MessageId) -> Result<(), ChatError> {
        self.deleted.lock().push((chat.clone(), message_id));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ChatError::MessageNotFound(message_id));
        }
        Ok(())
    }
}
