//! Per-user fixed-window rate limiting.
//!
//! Each `(user, action)` pair has a counter that resets wholesale once its
//! window has passed. Resets happen lazily on the next check;
//! [`RateLimiter::sweep_expired`] only reclaims memory.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::task::UserId;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Kind of user action being rate limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Adding or editing a task.
    AddTask,
    /// Any other interaction.
    General,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddTask => write!(f, "add_task"),
            Self::General => write!(f, "general"),
        }
    }
}

/// Maximum actions per window, by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    /// Limit for [`ActionKind::AddTask`].
    pub add_task: u32,
    /// Limit for [`ActionKind::General`].
    pub general: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            add_task: 10,
            general: 30,
        }
    }
}

impl RateLimits {
    /// Limit that applies to the given action kind.
    #[must_use]
    pub const fn limit_for(&self, action: ActionKind) -> u32 {
        match action {
            ActionKind::AddTask => self.add_task,
            ActionKind::General => self.general,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window rate limiter keyed by `(user, action)`.
///
/// Thread-safe via [`parking_lot::Mutex`]; the lock is never held across an
/// `.await`.
#[derive(Debug)]
pub struct RateLimiter {
    entries: Mutex<HashMap<(UserId, ActionKind), WindowEntry>>,
    limits: RateLimits,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimits::default(), DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    /// Creates a limiter with the given limits and window length.
    #[must_use]
    pub fn new(limits: RateLimits, window: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            limits,
            window,
        }
    }

    /// Records an action and returns whether it is allowed right now.
    pub fn check(&self, user: &UserId, action: ActionKind) -> bool {
        self.check_at(user, action, Instant::now())
    }

    /// Records an action at `now` and returns whether it is allowed.
    ///
    /// The first action of a window is always allowed. Later actions are
    /// denied once the count has reached the limit; denied actions do not
    /// increment the counter.
    pub fn check_at(&self, user: &UserId, action: ActionKind, now: Instant) -> bool {
        let mut entries = self.entries.lock();
        let key = (user.clone(), action);

        match entries.get_mut(&key) {
            Some(entry) if now <= entry.reset_at => {
                if entry.count >= self.limits.limit_for(action) {
                    tracing::debug!(user = %user, action = %action, "rate limit hit");
                    return false;
                }
                entry.count += 1;
                true
            }
            _ => {
                entries.insert(
                    key,
                    WindowEntry {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                true
            }
        }
    }

    /// Removes entries whose window has already passed, returning how many
    /// were removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// Same as [`sweep_expired`](Self::sweep_expired) with an explicit clock.
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.reset_at);
        before - entries.len()
    }

    /// Number of live `(user, action)` entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
