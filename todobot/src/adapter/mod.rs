//! Routes chat updates to task store operations and replies to the user.
//!
//! The adapter holds no task state of its own, only a per-user input mode
//! (waiting for a new task, or for the new text of an existing one). Every
//! reply goes through [`BotAdapter::reply`], which records the sent message
//! so the message sweeper can delete it later.

pub mod action;
pub mod render;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use todobot_core::chat::{ChatClient, ChatId, ChatKind, OutboundMessage};
use todobot_core::data::{StoreError, TaskRepository};
use todobot_core::messages::{MessageTracker, TrackedMessage};
use todobot_core::rate_limit::{ActionKind, RateLimiter};
use todobot_core::store::{AddOutcome, AddRejection, EditOutcome, TaskStore};
use todobot_core::task::{TaskId, UserId};
use todobot_core::validation::validate_task_text;

pub use action::Action;

/// Who an update came from and where to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// The user who triggered the update.
    pub user: UserId,
    /// Chat to reply in.
    pub chat: ChatId,
    /// Kind of that chat.
    pub chat_kind: ChatKind,
}

impl Sender {
    /// A user writing to the bot in their private chat.
    #[must_use]
    pub fn private(user: UserId) -> Self {
        let chat = ChatId::from(&user);
        Self {
            user,
            chat,
            chat_kind: ChatKind::Private,
        }
    }
}

/// An inbound event from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// A `/command`, without the slash and lowercased.
    Command {
        /// Origin of the update.
        from: Sender,
        /// Command name.
        command: String,
    },
    /// A button press carrying callback data.
    Callback {
        /// Origin of the update.
        from: Sender,
        /// Callback payload.
        data: String,
    },
    /// A plain text message.
    Text {
        /// Origin of the update.
        from: Sender,
        /// Message text.
        text: String,
    },
}

impl Update {
    /// Origin of the update.
    #[must_use]
    pub const fn sender(&self) -> &Sender {
        match self {
            Self::Command { from, .. } | Self::Callback { from, .. } | Self::Text { from, .. } => {
                from
            }
        }
    }
}

/// What the adapter expects the user's next text message to be.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UserMode {
    /// No pending input.
    #[default]
    Idle,
    /// The next text is a new task.
    AwaitingTask,
    /// The next text replaces the text of this task.
    AwaitingEdit(TaskId),
}

const SLOW_DOWN: &str = "You are going too fast. Please wait a minute and try again.";
const NOT_SAVED: &str =
    "The change was applied, but it could not be saved. It may be lost if the bot restarts.";
const TASK_GONE: &str = "That task no longer exists.";

/// Platform-neutral bot front end.
pub struct BotAdapter<R: TaskRepository, C: ChatClient> {
    store: Arc<TaskStore<R>>,
    limiter: Arc<RateLimiter>,
    tracker: Arc<MessageTracker>,
    client: Arc<C>,
    modes: Mutex<HashMap<UserId, UserMode>>,
    max_task_length: usize,
}

impl<R: TaskRepository, C: ChatClient> BotAdapter<R, C> {
    /// Creates an adapter over shared core components.
    #[must_use]
    pub fn new(
        store: Arc<TaskStore<R>>,
        limiter: Arc<RateLimiter>,
        tracker: Arc<MessageTracker>,
        client: Arc<C>,
        max_task_length: usize,
    ) -> Self {
        Self {
            store,
            limiter,
            tracker,
            client,
            modes: Mutex::new(HashMap::new()),
            max_task_length,
        }
    }

    /// Current input mode of `user`.
    #[must_use]
    pub fn mode(&self, user: &UserId) -> UserMode {
        self.modes.lock().get(user).cloned().unwrap_or_default()
    }

    fn set_mode(&self, user: &UserId, mode: UserMode) {
        let mut modes = self.modes.lock();
        if mode == UserMode::Idle {
            modes.remove(user);
        } else {
            modes.insert(user.clone(), mode);
        }
    }

    /// Handles one inbound update.
    pub async fn handle(&self, update: Update) {
        let from = update.sender().clone();
        let kind = match &update {
            Update::Text { .. } if self.mode(&from.user) != UserMode::Idle => ActionKind::AddTask,
            _ => ActionKind::General,
        };
        if !self.limiter.check(&from.user, kind) {
            tracing::info!(user = %from.user, action = %kind, "update rate limited");
            self.reply(&from, OutboundMessage::text(SLOW_DOWN)).await;
            return;
        }

        match update {
            Update::Command { command, .. } => self.on_command(&from, &command).await,
            Update::Callback { data, .. } => match Action::parse(&data) {
                Some(action) => self.on_action(&from, action).await,
                None => {
                    tracing::debug!(user = %from.user, data = %data, "unknown callback data");
                    self.reply(&from, render::with_menu("That button is no longer valid."))
                        .await;
                }
            },
            Update::Text { text, .. } => self.on_text(&from, &text).await,
        }
    }

    async fn on_command(&self, from: &Sender, command: &str) {
        match command {
            "start" => {
                self.set_mode(&from.user, UserMode::Idle);
                self.reply(
                    from,
                    render::with_menu("Welcome! Use the buttons below to manage your tasks."),
                )
                .await;
            }
            "list" => self.show_list(from).await,
            "cancel" | "annulla" => {
                self.set_mode(&from.user, UserMode::Idle);
                self.reply(from, render::with_menu("Operation cancelled.")).await;
            }
            other => {
                tracing::debug!(user = %from.user, command = %other, "unknown command");
                self.reply(from, render::with_menu("Unknown command.")).await;
            }
        }
    }

    async fn on_action(&self, from: &Sender, action: Action) {
        let user = &from.user;
        match action {
            Action::CreateTask => {
                self.set_mode(user, UserMode::AwaitingTask);
                self.reply(
                    from,
                    OutboundMessage::text("Write the task to add, or /cancel to go back."),
                )
                .await;
            }
            Action::ShowList => self.show_list(from).await,
            Action::Menu => {
                self.set_mode(user, UserMode::Idle);
                self.reply(from, render::with_menu("What would you like to do?"))
                    .await;
            }
            Action::TogglePriority(id) => match self.store.toggle_priority(user, &id).await {
                Ok(Some(_)) => self.show_list(from).await,
                Ok(None) => self.reply(from, render::with_menu(TASK_GONE)).await,
                Err(e) => self.report_store_error(from, &e).await,
            },
            Action::Complete(id) => match self.store.remove_task(user, &id).await {
                Ok(Some(task)) => {
                    tracing::info!(user = %user, task_id = %task.id, "task completed");
                    self.reply(from, OutboundMessage::text("Task completed and removed!"))
                        .await;
                    self.show_list(from).await;
                }
                Ok(None) => self.reply(from, render::with_menu(TASK_GONE)).await,
                Err(e) => self.report_store_error(from, &e).await,
            },
            Action::AskDelete(id) => match self.store.get_task(user, &id).await {
                Some(task) => self.reply(from, render::confirm_delete(&task)).await,
                None => self.reply(from, render::with_menu(TASK_GONE)).await,
            },
            Action::ConfirmDelete(id) => match self.store.remove_task(user, &id).await {
                Ok(Some(_)) => {
                    self.reply(from, OutboundMessage::text("Task deleted.")).await;
                    self.show_list(from).await;
                }
                Ok(None) => self.reply(from, render::with_menu(TASK_GONE)).await,
                Err(e) => self.report_store_error(from, &e).await,
            },
            Action::Edit(id) => match self.store.get_task(user, &id).await {
                Some(task) => {
                    self.set_mode(user, UserMode::AwaitingEdit(id));
                    self.reply(
                        from,
                        OutboundMessage::text(format!(
                            "Send the new text for \"{}\", or /cancel to go back.",
                            task.text
                        )),
                    )
                    .await;
                }
                None => self.reply(from, render::with_menu(TASK_GONE)).await,
            },
        }
    }

    async fn on_text(&self, from: &Sender, text: &str) {
        let mode = self.mode(&from.user);
        if mode == UserMode::Idle {
            tracing::debug!(user = %from.user, "ignoring text outside of input mode");
            return;
        }

        if text.trim_start().starts_with('/') {
            self.reply(
                from,
                OutboundMessage::text("The task cannot be empty. Try again or use /cancel."),
            )
            .await;
            return;
        }

        let text = match validate_task_text(text, self.max_task_length) {
            Ok(text) => text,
            Err(e) => {
                self.reply(
                    from,
                    OutboundMessage::text(format!("{e} Try again or use /cancel.")),
                )
                .await;
                return;
            }
        };

        self.set_mode(&from.user, UserMode::Idle);
        match mode {
            UserMode::AwaitingTask => self.add(from, text).await,
            UserMode::AwaitingEdit(id) => self.edit(from, &id, text).await,
            UserMode::Idle => {}
        }
    }

    async fn add(&self, from: &Sender, text: &str) {
        match self.store.add_task(&from.user, text).await {
            Ok(AddOutcome::Added(task)) => {
                tracing::info!(user = %from.user, task_id = %task.id, "task added");
                self.reply(from, render::with_menu("Task added!")).await;
            }
            Ok(AddOutcome::Rejected(AddRejection::Full { max })) => {
                self.reply(
                    from,
                    render::with_menu(format!(
                        "You already have {max} tasks. Complete some before adding more."
                    )),
                )
                .await;
            }
            Ok(AddOutcome::Rejected(AddRejection::Duplicate)) => {
                self.reply(from, render::with_menu("This task is already in your list."))
                    .await;
            }
            Err(e) => self.report_store_error(from, &e).await,
        }
    }

    async fn edit(&self, from: &Sender, id: &TaskId, text: &str) {
        match self.store.edit_task(&from.user, id, text).await {
            Ok(EditOutcome::Edited(_)) => {
                self.reply(from, OutboundMessage::text("Task updated!")).await;
                self.show_list(from).await;
            }
            Ok(EditOutcome::NotFound) => self.reply(from, render::with_menu(TASK_GONE)).await,
            Ok(EditOutcome::Duplicate) => {
                self.reply(
                    from,
                    render::with_menu("Another task already has this text."),
                )
                .await;
            }
            Err(e) => self.report_store_error(from, &e).await,
        }
    }

    async fn show_list(&self, from: &Sender) {
        let tasks = self.store.get_task_list(&from.user).await;
        self.reply(from, render::task_list(&tasks)).await;
    }

    async fn report_store_error(&self, from: &Sender, error: &StoreError) {
        tracing::error!(user = %from.user, error = %error, "task change not persisted");
        self.reply(from, render::with_menu(NOT_SAVED)).await;
    }

    /// Sends `message` to the sender's chat and tracks it for cleanup.
    /// Send failures are logged and otherwise ignored.
    pub async fn reply(&self, from: &Sender, message: OutboundMessage) {
        match self.client.send_message(&from.chat, &message).await {
            Ok(sent) => self.tracker.track(
                &from.user,
                TrackedMessage::now(sent.message_id, from.chat.clone(), from.chat_kind),
            ),
            Err(e) => {
                tracing::warn!(user = %from.user, chat = %from.chat, error = %e, "failed to send reply");
            }
        }
    }
}
