//! End-to-end conversations with the bot adapter over an in-memory store
//! and a recording chat client.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use todobot::adapter::{Action, BotAdapter, Sender, Update, UserMode};
use todobot::console::parse_line;
use todobot_core::chat::{ChatId, OutboundMessage, RecordingChat};
use todobot_core::data::{DataManager, MemoryRepository};
use todobot_core::messages::MessageTracker;
use todobot_core::rate_limit::{RateLimiter, RateLimits};
use todobot_core::store::TaskStore;
use todobot_core::task::{TaskId, UserId};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    bot: BotAdapter<MemoryRepository, RecordingChat>,
    store: Arc<TaskStore<MemoryRepository>>,
    chat: Arc<RecordingChat>,
    tracker: Arc<MessageTracker>,
}

impl Harness {
    fn new() -> Self {
        Self::with_limits(RateLimits::default())
    }

    fn with_limits(limits: RateLimits) -> Self {
        let store = Arc::new(TaskStore::with_max_tasks(MemoryRepository::new(), 3));
        let chat = Arc::new(RecordingChat::new());
        let tracker = Arc::new(MessageTracker::new());
        let limiter = Arc::new(RateLimiter::new(limits, Duration::from_secs(60)));
        let bot = BotAdapter::new(
            Arc::clone(&store),
            limiter,
            Arc::clone(&tracker),
            Arc::clone(&chat),
            20,
        );
        Self {
            bot,
            store,
            chat,
            tracker,
        }
    }

    async fn line(&self, line: &str) {
        let update = parse_line(line).unwrap_or_else(|| panic!("unparseable line {line:?}"));
        self.bot.handle(update).await;
    }

    fn last(&self, user: &str) -> OutboundMessage {
        self.chat.last_message(&ChatId::new(user)).expect("a reply")
    }

    async fn first_task_id(&self, user: &str) -> TaskId {
        self.store.get_task_list(&UserId::new(user)).await[0]
            .id
            .clone()
    }
}

fn button_data(msg: &OutboundMessage) -> Vec<String> {
    msg.buttons
        .iter()
        .flatten()
        .map(|b| b.data.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_then_list() {
    let h = Harness::new();
    h.line("1 /start").await;
    assert!(button_data(&h.last("1")).contains(&"CREATE_TASK".to_string()));

    h.line("1 !CREATE_TASK").await;
    h.line("1 buy milk").await;
    assert_eq!(h.last("1").text, "Task added!");
    assert_eq!(h.bot.mode(&UserId::new("1")), UserMode::Idle);

    h.line("1 /list").await;
    let list = h.last("1");
    assert!(list.text.contains("buy milk"));
    let id = h.first_task_id("1").await;
    assert!(button_data(&list).contains(&Action::Complete(id).to_string()));
}

#[tokio::test]
async fn complete_removes_the_task() {
    let h = Harness::new();
    h.line("1 !CREATE_TASK").await;
    h.line("1 pay rent").await;
    let id = h.first_task_id("1").await;

    h.line(&format!("1 !COMPLETE_{id}")).await;
    assert!(h.store.get_task_list(&UserId::new("1")).await.is_empty());
    assert_eq!(h.last("1").text, "No tasks found.");

    h.line(&format!("1 !COMPLETE_{id}")).await;
    assert_eq!(h.last("1").text, "That task no longer exists.");
}

#[tokio::test]
async fn delete_requires_confirmation() {
    let h = Harness::new();
    h.line("1 !CREATE_TASK").await;
    h.line("1 old task").await;
    let id = h.first_task_id("1").await;

    h.line(&format!("1 !DELETE_{id}")).await;
    let prompt = h.last("1");
    assert_eq!(prompt.text, "Delete \"old task\"?");
    assert_eq!(h.store.get_task_list(&UserId::new("1")).await.len(), 1);

    h.line(&format!("1 !CONFIRM_DELETE_{id}")).await;
    assert!(h.store.get_task_list(&UserId::new("1")).await.is_empty());
}

#[tokio::test]
async fn toggle_priority_reorders_the_list() {
    let h = Harness::new();
    for text in ["first", "second"] {
        h.line("1 !CREATE_TASK").await;
        h.line(&format!("1 {text}")).await;
    }
    let second = h.store.get_task_list(&UserId::new("1")).await[1].id.clone();

    h.line(&format!("1 !PRIORITY_{second}")).await;
    let list = h.last("1");
    let first_line = list.text.lines().nth(2).unwrap();
    assert_eq!(first_line, "\u{2b50} second");
}

#[tokio::test]
async fn edit_flow_replaces_text() {
    let h = Harness::new();
    h.line("1 !CREATE_TASK").await;
    h.line("1 draft").await;
    let id = h.first_task_id("1").await;

    h.line(&format!("1 !EDIT_{id}")).await;
    assert_eq!(
        h.bot.mode(&UserId::new("1")),
        UserMode::AwaitingEdit(id.clone())
    );
    h.line("1 final").await;

    let task = h.store.get_task(&UserId::new("1"), &id).await.unwrap();
    assert_eq!(task.text, "final");
    assert_eq!(h.bot.mode(&UserId::new("1")), UserMode::Idle);
}

#[tokio::test]
async fn rejected_input_explains_and_keeps_waiting() {
    let h = Harness::new();
    h.line("1 !CREATE_TASK").await;

    h.line("1 this text is definitely longer than twenty").await;
    assert!(h.last("1").text.starts_with("The task is too long (max 20 characters)."));

    h.line("1 javascript:x").await;
    assert!(h.last("1").text.contains("not allowed"));

    assert_eq!(h.bot.mode(&UserId::new("1")), UserMode::AwaitingTask);
    assert!(h.store.get_task_list(&UserId::new("1")).await.is_empty());

    h.line("1 /cancel").await;
    assert_eq!(h.bot.mode(&UserId::new("1")), UserMode::Idle);
}

#[tokio::test]
async fn duplicates_and_cap_are_reported() {
    let h = Harness::new();
    for text in ["a", "b", "c"] {
        h.line("1 !CREATE_TASK").await;
        h.line(&format!("1 {text}")).await;
    }
    h.line("1 !CREATE_TASK").await;
    h.line("1 d").await;
    assert!(h.last("1").text.starts_with("You already have 3 tasks"));

    let id = h.first_task_id("1").await;
    h.line(&format!("1 !COMPLETE_{id}")).await;
    h.line("1 !CREATE_TASK").await;
    h.line("1 b").await;
    assert_eq!(h.last("1").text, "This task is already in your list.");
}

#[tokio::test]
async fn users_do_not_see_each_other() {
    let h = Harness::new();
    h.line("1 !CREATE_TASK").await;
    h.line("1 mine").await;
    h.line("2 /list").await;
    assert_eq!(h.last("2").text, "No tasks found.");

    let id = h.first_task_id("1").await;
    h.line(&format!("2 !COMPLETE_{id}")).await;
    assert_eq!(h.store.get_task_list(&UserId::new("1")).await.len(), 1);
}

#[tokio::test]
async fn add_rate_limit_blocks_fast_typists() {
    let h = Harness::with_limits(RateLimits {
        add_task: 1,
        general: 30,
    });
    h.line("1 !CREATE_TASK").await;
    h.line("1 first").await;
    h.line("1 !CREATE_TASK").await;
    h.line("1 second").await;

    assert!(h.last("1").text.starts_with("You are going too fast"));
    assert_eq!(h.store.get_task_list(&UserId::new("1")).await.len(), 1);
}

#[tokio::test]
async fn every_reply_is_tracked_for_cleanup() {
    let h = Harness::new();
    h.line("1 /start").await;
    h.line("1 /list").await;
    h.line("1 /nope").await;
    assert_eq!(h.tracker.tracked_count(&UserId::new("1")), 3);
    assert_eq!(h.chat.sent().len(), 3);
}

#[tokio::test]
async fn unreachable_chat_does_not_break_the_flow() {
    let h = Harness::new();
    h.chat.block_chat(ChatId::new("1"));
    h.bot
        .handle(Update::Callback {
            from: Sender::private(UserId::new("1")),
            data: "CREATE_TASK".into(),
        })
        .await;
    assert_eq!(h.bot.mode(&UserId::new("1")), UserMode::AwaitingTask);
    assert_eq!(h.tracker.tracked_count(&UserId::new("1")), 0);
}

#[tokio::test]
async fn tasks_added_through_the_bot_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = Arc::new(TaskStore::new(DataManager::open(dir.path()).await));
        let bot = BotAdapter::new(
            store,
            Arc::new(RateLimiter::default()),
            Arc::new(MessageTracker::new()),
            Arc::new(RecordingChat::new()),
            200,
        );
        for line in ["9 !CREATE_TASK", "9 water plants"] {
            bot.handle(parse_line(line).unwrap()).await;
        }
    }

    let store = TaskStore::new(DataManager::open(dir.path()).await);
    store.warm_up().await;
    let list = store.get_task_list(&UserId::new("9")).await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].text, "water plants");
}
