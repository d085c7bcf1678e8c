//! Line-based console transport.
//!
//! Each input line is `<user_id> <input>`, or `<user_id>@<chat_id> <input>`
//! for a message sent in a group chat. Input starting with `/` is a
//! command, input starting with `!` is a button press carrying that
//! callback data, and anything else is plain text. Replies are printed
//! to stdout together with the callback data of their buttons, so a
//! button can be "pressed" by typing `!<data>`.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::io::AsyncWriteExt;
use todobot_core::chat::{
    ChatClient, ChatError, ChatId, ChatKind, MessageId, OutboundMessage, SentMessage,
};
use todobot_core::task::UserId;

use crate::adapter::{Sender, Update};

/// [`ChatClient`] that prints messages to stdout.
#[derive(Debug, Default)]
pub struct ConsoleChat {
    next_id: AtomicI64,
}

impl ConsoleChat {
    /// Creates a console client. Message ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

async fn write_stdout(text: &str) -> Result<(), ChatError> {
    let mut out = tokio::io::stdout();
    out.write_all(text.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

/// Formats a message for the console.
#[must_use]
pub fn format_message(chat: &ChatId, id: MessageId, message: &OutboundMessage) -> String {
    let mut out = format!("[{chat} #{id}] {}\n", message.text);
    for row in &message.buttons {
        let cells: Vec<String> = row
            .iter()
            .map(|b| format!("[{}] !{}", b.label, b.data))
            .collect();
        let _ = writeln!(out, "    {}", cells.join("  "));
    }
    out
}

impl ChatClient for ConsoleChat {
    async fn send_message(
        &self,
        chat: &ChatId,
        message: &OutboundMessage,
    ) -> Result<SentMessage, ChatError> {
        let message_id = MessageId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        write_stdout(&format_message(chat, message_id, message)).await?;
        Ok(SentMessage { message_id })
    }

    async fn delete_message(&self, chat: &ChatId, message_id: MessageId) -> Result<(), ChatError> {
        write_stdout(&format!("[{chat} #{message_id}] (deleted)\n")).await
    }
}

/// Parses one console line into an update.
///
/// Returns `None` for blank lines, lines without input after the user id,
/// bare `/` or `!`, and user or chat ids that are not plain
/// (see [`UserId::is_plain`]).
#[must_use]
pub fn parse_line(line: &str) -> Option<Update> {
    let (origin, input) = line.trim().split_once(char::is_whitespace)?;
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let from = parse_sender(origin)?;

    if let Some(command) = input.strip_prefix('/') {
        let name = command.split_whitespace().next()?;
        // "/list@my_bot" addresses a specific bot in group chats.
        let name = name.split('@').next().unwrap_or(name).to_lowercase();
        if name.is_empty() {
            return None;
        }
        return Some(Update::Command {
            from,
            command: name,
        });
    }

    if let Some(data) = input.strip_prefix('!') {
        if data.is_empty() {
            return None;
        }
        return Some(Update::Callback {
            from,
            data: data.to_string(),
        });
    }

    Some(Update::Text {
        from,
        text: input.to_string(),
    })
}

fn parse_sender(origin: &str) -> Option<Sender> {
    let (user, group) = match origin.split_once('@') {
        Some((user, group)) => (UserId::new(user), Some(UserId::new(group))),
        None => (UserId::new(origin), None),
    };
    if !user.is_plain() {
        return None;
    }
    match group {
        None => Some(Sender::private(user)),
        Some(group) if group.is_plain() => Some(Sender {
            user,
            chat: ChatId::new(group.as_str()),
            chat_kind: ChatKind::Group,
        }),
        Some(_) => None,
    }
}
