//! Background lifecycle sweepers.
//!
//! Three independent periodic routines, each on its own timer:
//! 1. message sweep: deletes bot messages older than the configured lifetime
//! 2. rate-limit sweep: drops expired rate-limit windows
//! 3. reminder broadcast: sends each user a digest of their open tasks,
//!    except during quiet hours
//!
//! Each routine is also exposed as a plain async function so it can be
//! driven directly.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Timelike;
use tokio::task::JoinHandle;

use crate::chat::{ChatClient, ChatId, ChatKind, OutboundMessage};
use crate::data::TaskRepository;
use crate::messages::{MessageTracker, TrackedMessage};
use crate::rate_limit::RateLimiter;
use crate::store::TaskStore;
use crate::task::{Task, priority_sorted};

/// Shortest period a sweeper timer may run at. Shorter periods, zero
/// included, are raised to this.
pub const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(10);

/// Errors in sweeper configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuietHoursError {
    /// An hour outside `0..=23` was given.
    #[error("quiet hour {0} is out of range (expected 0-23)")]
    HourOutOfRange(u32),
}

/// Clock-hour range during which reminders are not sent.
///
/// `start > end` is an overnight range (22-8 covers 22:00 to 07:59),
/// `start < end` a same-day range, and `start == end` disables quiet
/// hours entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    start: u32,
    end: u32,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self { start: 22, end: 8 }
    }
}

impl QuietHours {
    /// Creates a quiet-hours range.
    ///
    /// # Errors
    ///
    /// Returns [`QuietHoursError::HourOutOfRange`] if either hour is above 23.
    pub const fn new(start: u32, end: u32) -> Result<Self, QuietHoursError> {
        if start > 23 {
            return Err(QuietHoursError::HourOutOfRange(start));
        }
        if end > 23 {
            return Err(QuietHoursError::HourOutOfRange(end));
        }
        Ok(Self { start, end })
    }

    /// First quiet hour.
    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// First hour after the quiet range.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.end
    }

    /// Whether `hour` (0-23) falls inside the quiet range.
    #[must_use]
    pub const fn contains(&self, hour: u32) -> bool {
        if self.start > self.end {
            hour >= self.start || hour < self.end
        } else {
            hour >= self.start && hour < self.end
        }
    }
}

/// Timer and lifetime settings for the sweepers.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Age after which a bot message is deleted.
    pub message_lifetime: Duration,
    /// How often the message sweep runs.
    pub cleanup_interval: Duration,
    /// How often expired rate-limit windows are dropped.
    pub rate_limit_sweep_interval: Duration,
    /// How often reminders are broadcast.
    pub reminder_interval: Duration,
    /// Hours during which reminders are suppressed.
    pub quiet_hours: QuietHours,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            message_lifetime: Duration::from_secs(10 * 60),
            cleanup_interval: Duration::from_secs(60),
            rate_limit_sweep_interval: Duration::from_secs(5 * 60),
            reminder_interval: Duration::from_secs(30 * 60),
            quiet_hours: QuietHours::default(),
        }
    }
}

/// Outcome of one message sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageSweepReport {
    /// Messages deleted from the chat.
    pub deleted: usize,
    /// Deletes the platform refused (typically already gone).
    pub failed: usize,
}

/// Outcome of one reminder broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderReport {
    /// Whether the broadcast was skipped because of quiet hours.
    pub quiet: bool,
    /// Reminders delivered.
    pub sent: usize,
    /// Users whose reminder could not be delivered.
    pub failed: usize,
}

/// Deletes every tracked message older than `lifetime`.
///
/// Expired messages are untracked before the delete is attempted, so a
/// failing delete is never retried.
pub async fn sweep_messages<C: ChatClient>(
    tracker: &MessageTracker,
    client: &C,
    lifetime: Duration,
) -> MessageSweepReport {
    let expired = tracker.take_expired(Instant::now(), lifetime);
    let mut report = MessageSweepReport::default();

    for (user, message) in expired {
        match client
            .delete_message(&message.chat_id, message.message_id)
            .await
        {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                tracing::debug!(
                    user = %user,
                    chat_kind = %message.chat_kind,
                    message_id = %message.message_id,
                    error = %e,
                    "could not delete old message"
                );
                report.failed += 1;
            }
        }
    }

    if report.deleted + report.failed > 0 {
        tracing::info!(
            deleted = report.deleted,
            failed = report.failed,
            "message sweep finished"
        );
    }
    report
}

/// Drops expired rate-limit windows, returning how many were removed.
pub fn sweep_rate_limits(limiter: &RateLimiter) -> usize {
    let removed = limiter.sweep_expired();
    if removed > 0 {
        tracing::debug!(removed, "rate-limit sweep finished");
    }
    removed
}

/// Formats the reminder digest for a task list, priority tasks first.
#[must_use]
pub fn format_digest(tasks: &[Task]) -> String {
    let mut text = String::from("\u{23f0} Reminder, your open tasks:\n");
    for task in priority_sorted(tasks) {
        let _ = write!(text, "\n{} {}", task.glyph(), task.text);
    }
    text
}

/// Sends every user with open tasks a digest, unless `hour` is quiet.
///
/// A failed send (for example, the user blocked the bot) is logged and the
/// broadcast moves on to the next user. Delivered reminders are tracked
/// for cleanup like any other bot message.
pub async fn broadcast_reminders<R: TaskRepository, C: ChatClient>(
    store: &TaskStore<R>,
    tracker: &MessageTracker,
    client: &C,
    quiet_hours: QuietHours,
    hour: u32,
) -> ReminderReport {
    if quiet_hours.contains(hour) {
        tracing::debug!(hour, "quiet hours, skipping reminders");
        return ReminderReport {
            quiet: true,
            ..ReminderReport::default()
        };
    }

    let mut report = ReminderReport::default();
    for (user, tasks) in store.users_with_tasks().await {
        let chat = ChatId::from(&user);
        let message = OutboundMessage::text(format_digest(&tasks));
        match client.send_message(&chat, &message).await {
            Ok(sent) => {
                tracker.track(
                    &user,
                    TrackedMessage::now(sent.message_id, chat, ChatKind::Private),
                );
                report.sent += 1;
            }
            Err(e) => {
                tracing::warn!(user = %user, error = %e, "failed to send reminder");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        sent = report.sent,
        failed = report.failed,
        "reminder broadcast finished"
    );
    report
}

/// Handles to the running sweeper tasks. Dropping it stops them.
pub struct Sweepers {
    handles: Vec<JoinHandle<()>>,
}

impl Sweepers {
    /// Spawns the three sweepers on the current tokio runtime.
    ///
    /// Each timer's first tick fires one full period after spawning.
    pub fn spawn<R, C>(
        store: Arc<TaskStore<R>>,
        tracker: Arc<MessageTracker>,
        limiter: Arc<RateLimiter>,
        client: Arc<C>,
        config: &SweepConfig,
    ) -> Self
    where
        R: TaskRepository + 'static,
        C: ChatClient + 'static,
    {
        let messages = {
            let tracker = Arc::clone(&tracker);
            let client = Arc::clone(&client);
            let lifetime = config.message_lifetime;
            let period = config.cleanup_interval;
            tokio::spawn(async move {
                let mut tick = delayed_interval("messages", period);
                loop {
                    tick.tick().await;
                    sweep_messages(&tracker, client.as_ref(), lifetime).await;
                }
            })
        };

        let rate_limits = {
            let period = config.rate_limit_sweep_interval;
            tokio::spawn(async move {
                let mut tick = delayed_interval("rate_limits", period);
                loop {
                    tick.tick().await;
                    sweep_rate_limits(&limiter);
                }
            })
        };

        let reminders = {
            let quiet_hours = config.quiet_hours;
            let period = config.reminder_interval;
            tokio::spawn(async move {
                let mut tick = delayed_interval("reminders", period);
                loop {
                    tick.tick().await;
                    let hour = chrono::Local::now().hour();
                    broadcast_reminders(&store, &tracker, client.as_ref(), quiet_hours, hour)
                        .await;
                }
            })
        };

        tracing::info!(
            cleanup_secs = config.cleanup_interval.as_secs(),
            reminder_secs = config.reminder_interval.as_secs(),
            "sweepers started"
        );

        Self {
            handles: vec![messages, rate_limits, reminders],
        }
    }

    /// Stops all sweepers.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Sweepers {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// An interval whose first tick is one period away rather than immediate.
/// Periods below [`MIN_SWEEP_PERIOD`] are raised to it.
fn delayed_interval(name: &'static str, period: Duration) -> tokio::time::Interval {
    let period = if period < MIN_SWEEP_PERIOD {
        tracing::warn!(
            sweeper = name,
            requested_ms = period.as_millis(),
            "sweep period too short, using minimum"
        );
        MIN_SWEEP_PERIOD
    } else {
        period
    };
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval
}
