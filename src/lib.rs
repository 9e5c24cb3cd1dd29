//! Unichat — a unified messaging aggregation engine.
//!
//! Ingests normalized events from per-platform adapters (WhatsApp, Telegram,
//! Discord, Slack, Messenger), folds them into one deduplicated, id-stable
//! chat/message model, and routes commands (send, react, mark-read) back to
//! the adapter that owns the conversation.
//!
//! See `DESIGN.md` for full architecture documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod engine;
pub mod identity;
pub mod logging;
pub mod notify;
pub mod settings;
pub mod types;
