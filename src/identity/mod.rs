//! Identity mapper: (platform, native id) → stable internal id.
//!
//! The only source of truth for deduplication. First resolution of an
//! unseen pair allocates a new internal id; every later resolution of the
//! same pair returns that id. The map lives inside the engine's state
//! mutex, so the allocate-once guarantee rides on the engine's
//! serialization of state mutations.

use std::collections::HashMap;

use crate::types::{ChatId, MessageId, PlatformId};

/// Bidirectional registry of internal ids for chats and messages.
#[derive(Debug, Default)]
pub struct IdentityMap {
    chats: HashMap<(PlatformId, String), ChatId>,
    messages: HashMap<(ChatId, String), MessageId>,
}

impl IdentityMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the internal id for a (platform, native id) pair, allocating
    /// one on first sight. Returns the id and whether it was newly created.
    ///
    /// Idempotent: identical inputs always return the same internal id.
    pub fn resolve_or_create_chat(
        &mut self,
        platform: PlatformId,
        native_id: &str,
    ) -> (ChatId, bool) {
        if let Some(&id) = self.chats.get(&(platform, native_id.to_string())) {
            return (id, false);
        }
        let id = ChatId::new();
        self.chats.insert((platform, native_id.to_string()), id);
        (id, true)
    }

    /// Look up an already-registered chat without allocating.
    pub fn resolve_chat(&self, platform: PlatformId, native_id: &str) -> Option<ChatId> {
        self.chats.get(&(platform, native_id.to_string())).copied()
    }

    /// Look up a message by its owning chat and native id.
    ///
    /// Not-found is a normal result the caller must branch on, not an error.
    pub fn resolve_message(&self, chat_id: ChatId, native_id: &str) -> Option<MessageId> {
        self.messages
            .get(&(chat_id, native_id.to_string()))
            .copied()
    }

    /// Register a message id under its (chat, native id) key.
    pub fn record_message(&mut self, chat_id: ChatId, native_id: &str, id: MessageId) {
        self.messages.insert((chat_id, native_id.to_string()), id);
    }

    /// Rebind a message from one native id to another, preserving its
    /// internal id.
    ///
    /// Used when an optimistic send is reconciled: the provisional local
    /// native id is replaced by the platform-assigned one while the internal
    /// id stays fixed. A no-op if the old key is unknown.
    pub fn rebind_message(&mut self, chat_id: ChatId, old_native_id: &str, new_native_id: &str) {
        if let Some(id) = self
            .messages
            .remove(&(chat_id, old_native_id.to_string()))
        {
            self.messages
                .insert((chat_id, new_native_id.to_string()), id);
        }
    }

    /// Number of registered chats.
    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }

    /// Drop every registration. Used by engine re-initialization and
    /// clear-all-data.
    pub fn clear(&mut self) {
        self.chats.clear();
        self.messages.clear();
    }
}
