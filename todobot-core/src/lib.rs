//! Core of the todobot to-do list bot.
//!
//! Holds the authoritative per-user task state ([`store::TaskStore`]), its
//! durable JSON persistence ([`data`]), input validation and rate limiting,
//! and the background sweepers that evict stale outbound messages and
//! broadcast reminders. Chat-platform specifics stay behind the
//! [`chat::ChatClient`] trait.

pub mod chat;
pub mod data;
pub mod messages;
pub mod rate_limit;
pub mod store;
pub mod sweep;
pub mod task;
pub mod validation;
