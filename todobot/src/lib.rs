//! todobot: chat bot that keeps a per-user to-do list.
//!
//! Wires the [`todobot_core`] task store to a chat platform: layered
//! configuration, update routing, and a console transport.

pub mod adapter;
pub mod config;
pub mod console;
