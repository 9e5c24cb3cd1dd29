//! Aggregated state: the roster, connection map, chat index, per-chat
//! message lists, and the identity map.
//!
//! All mutation happens through methods on [`EngineState`] while the
//! engine holds its single state mutex, so every method here can assume
//! exclusive access. Methods return clones of what changed so the caller
//! can broadcast them after releasing the lock.

use std::collections::HashMap;

use chrono::Utc;

use crate::identity::IdentityMap;
use crate::settings::UserSettings;
use crate::types::{
    Chat, ChatEvent, ChatId, ChatKind, ConnectionStatus, Message, MessageEvent, MessageId,
    MessageStatus, MessageSummary, PlatformDescriptor, PlatformId, SendReceipt, StatusMap,
    SELF_USER_ID,
};

use super::EngineError;

/// Outcome of applying an inbound message event.
pub(super) struct MessageApplied {
    /// The message after the upsert.
    pub message: Message,
    /// The owning chat after its summary/unread update.
    pub chat: Chat,
    /// Whether the message was newly inserted (as opposed to merged).
    pub inserted: bool,
}

/// The engine's single mutable state.
#[derive(Debug, Default)]
pub(super) struct EngineState {
    pub initialized: bool,
    pub user_name: String,
    pub platforms: Vec<PlatformDescriptor>,
    pub connection: StatusMap,
    chats: HashMap<ChatId, Chat>,
    messages: HashMap<ChatId, Vec<Message>>,
    identity: IdentityMap,
}

impl EngineState {
    /// Rebuild the roster from settings and drop all aggregated data.
    pub fn reset_with(&mut self, settings: &UserSettings) {
        self.initialized = true;
        self.user_name = settings.user.name.clone();
        self.platforms = PlatformId::ALL
            .into_iter()
            .map(|id| PlatformDescriptor {
                id,
                display_name: id.display_name().to_string(),
                enabled: settings.is_enabled(id),
                color_hint: id.color_hint().to_string(),
                credential_ref: crate::settings::auth_key(id),
            })
            .collect();
        self.connection = self
            .platforms
            .iter()
            .map(|p| {
                let status = if p.enabled {
                    ConnectionStatus::Disconnected
                } else {
                    ConnectionStatus::Disabled
                };
                (p.id, status)
            })
            .collect();
        self.chats.clear();
        self.messages.clear();
        self.identity.clear();
    }

    /// Whether a platform is enabled in the current roster.
    pub fn platform_enabled(&self, platform: PlatformId) -> bool {
        self.platforms
            .iter()
            .any(|p| p.id == platform && p.enabled)
    }

    /// Set one platform's connection status.
    pub fn set_status(&mut self, platform: PlatformId, status: ConnectionStatus) {
        self.connection.insert(platform, status);
    }

    /// Flip a platform's enabled flag, returning its new connection status.
    pub fn set_enabled(&mut self, platform: PlatformId, enabled: bool) -> ConnectionStatus {
        for p in &mut self.platforms {
            if p.id == platform {
                p.enabled = enabled;
            }
        }
        let status = if enabled {
            // Leave an already-live status alone when re-enabling.
            match self.connection.get(&platform) {
                Some(ConnectionStatus::Disabled) | None => ConnectionStatus::Disconnected,
                Some(&live) => live,
            }
        } else {
            ConnectionStatus::Disabled
        };
        self.connection.insert(platform, status);
        status
    }

    /// Merge a chat event into the index, creating the chat on first sight.
    ///
    /// Present fields overwrite, absent fields are untouched, `members`
    /// is replaced wholesale. `is_category` is promote-only: an event
    /// never demotes a container back to a leaf.
    pub fn apply_chat_event(&mut self, platform: PlatformId, event: ChatEvent) -> Chat {
        let (chat_id, created) = self
            .identity
            .resolve_or_create_chat(platform, &event.native_id);
        let now = Utc::now();

        let chat = self.chats.entry(chat_id).or_insert_with(|| Chat {
            id: chat_id,
            platform,
            native_id: event.native_id.clone(),
            parent_native_id: None,
            kind: ChatKind::default(),
            is_category: false,
            name: event.native_id.clone(),
            avatar: None,
            unread_count: 0,
            last_message: None,
            members: Vec::new(),
            last_updated: now,
        });

        if event.parent_native_id.is_some() {
            chat.parent_native_id = event.parent_native_id;
        }
        if let Some(kind) = event.kind {
            chat.kind = kind;
        }
        if event.is_category {
            chat.is_category = true;
        }
        if let Some(name) = event.name {
            chat.name = name;
        }
        if event.avatar.is_some() {
            chat.avatar = event.avatar;
        }
        if let Some(unread) = event.unread_count {
            chat.unread_count = unread;
        }
        if event.last_message.is_some() {
            chat.last_message = event.last_message;
        }
        if let Some(members) = event.members {
            chat.members = members;
        }
        chat.last_updated = now;

        if created {
            self.messages.entry(chat_id).or_default();
        }
        chat.clone()
    }

    /// Upsert an inbound message, creating a stub chat when the owning
    /// chat has not been announced yet.
    ///
    /// A known (chat, native id) pair is merged in place under its
    /// original internal id; an unseen pair is inserted and bumps the
    /// chat's unread count unless the local user authored it. The chat's
    /// message list stays sorted ascending by timestamp.
    pub fn apply_message_event(&mut self, platform: PlatformId, event: MessageEvent) -> MessageApplied {
        let chat_id = match self.identity.resolve_chat(platform, &event.chat_native_id) {
            Some(id) => id,
            None => {
                let stub = ChatEvent {
                    native_id: event.chat_native_id.clone(),
                    ..ChatEvent::default()
                };
                self.apply_chat_event(platform, stub).id
            }
        };

        let list = self.messages.entry(chat_id).or_default();
        let known = self
            .identity
            .resolve_message(chat_id, &event.native_id)
            .and_then(|id| list.iter().position(|m| m.id == id));
        let (message, inserted) = match known {
            Some(index) => {
                let existing = &mut list[index];
                existing.sender_id = event.sender_id;
                existing.sender_name = event.sender_name;
                existing.text = event.text;
                existing.timestamp = event.timestamp;
                existing.attachments = event.attachments;
                existing.reactions = event.reactions;
                if event.reply_to.is_some() {
                    existing.reply_to = event.reply_to;
                }
                if let Some(status) = event.status {
                    existing.status = status;
                }
                existing.is_forwarded = event.is_forwarded;
                (existing.clone(), false)
            }
            None => {
                let message = Message {
                    id: MessageId::new(),
                    chat_id,
                    platform,
                    native_id: event.native_id.clone(),
                    sender_id: event.sender_id,
                    sender_name: event.sender_name,
                    text: event.text,
                    timestamp: event.timestamp,
                    attachments: event.attachments,
                    reactions: event.reactions,
                    reply_to: event.reply_to,
                    status: event.status.unwrap_or(MessageStatus::Sent),
                    is_forwarded: event.is_forwarded,
                };
                self.identity
                    .record_message(chat_id, &event.native_id, message.id);
                list.push(message.clone());
                (message, true)
            }
        };
        list.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        // The chat is always present: resolution either found it or the
        // stub branch just inserted it.
        let native_id = event.chat_native_id;
        let chat = self.chats.entry(chat_id).or_insert_with(|| Chat {
            id: chat_id,
            platform,
            native_id: native_id.clone(),
            parent_native_id: None,
            kind: ChatKind::default(),
            is_category: false,
            name: native_id,
            avatar: None,
            unread_count: 0,
            last_message: None,
            members: Vec::new(),
            last_updated: Utc::now(),
        });
        chat.last_message = Some(summary_of(&message));
        if inserted && message.sender_id != SELF_USER_ID {
            chat.unread_count = chat.unread_count.saturating_add(1);
        }
        chat.last_updated = Utc::now();

        MessageApplied {
            message,
            chat: chat.clone(),
            inserted,
        }
    }

    /// Insert an optimistic outbound message in `Sending` status with a
    /// provisional native id. Returns the provisional message.
    pub fn begin_send(
        &mut self,
        chat_id: ChatId,
        text: &str,
        attachments: Vec<crate::types::Attachment>,
    ) -> Result<Message, EngineError> {
        let chat = self
            .chats
            .get(&chat_id)
            .ok_or(EngineError::ChatNotFound(chat_id))?;
        let platform = chat.platform;

        let message = Message {
            id: MessageId::new(),
            chat_id,
            platform,
            native_id: format!("local-{}", uuid::Uuid::new_v4()),
            sender_id: SELF_USER_ID.to_string(),
            sender_name: self.user_name.clone(),
            text: text.to_string(),
            timestamp: Utc::now(),
            attachments,
            reactions: Vec::new(),
            reply_to: None,
            status: MessageStatus::Sending,
            is_forwarded: false,
        };
        self.identity
            .record_message(chat_id, &message.native_id, message.id);
        self.messages.entry(chat_id).or_default().push(message.clone());
        Ok(message)
    }

    /// Reconcile an optimistic message with the adapter's receipt. The
    /// internal id never changes; the native id, timestamp, and status do.
    ///
    /// A platform that echoes the outgoing message through its event
    /// stream may have already inserted it under the receipt's native id;
    /// that echo is absorbed here so the pair stays unique.
    pub fn complete_send(
        &mut self,
        chat_id: ChatId,
        message_id: MessageId,
        receipt: &SendReceipt,
    ) -> Result<(Message, Chat), EngineError> {
        let echoed = self
            .identity
            .resolve_message(chat_id, &receipt.native_id)
            .filter(|&id| id != message_id);
        let list = self
            .messages
            .get_mut(&chat_id)
            .ok_or(EngineError::ChatNotFound(chat_id))?;
        if let Some(echo_id) = echoed {
            list.retain(|m| m.id != echo_id);
        }
        let message = list
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(EngineError::MessageNotFound(message_id))?;

        let old_native = std::mem::replace(&mut message.native_id, receipt.native_id.clone());
        message.timestamp = receipt.timestamp;
        message.status = receipt.status;
        let message = message.clone();
        list.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        self.identity
            .rebind_message(chat_id, &old_native, &receipt.native_id);

        let chat = self
            .chats
            .get_mut(&chat_id)
            .ok_or(EngineError::ChatNotFound(chat_id))?;
        chat.last_message = Some(summary_of(&message));
        chat.last_updated = Utc::now();
        Ok((message, chat.clone()))
    }

    /// Mark an optimistic message failed. The message is retained under
    /// its provisional native id so the user can retry.
    pub fn fail_send(
        &mut self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Message, EngineError> {
        let message = self.message_mut(chat_id, message_id)?;
        message.status = MessageStatus::Error;
        Ok(message.clone())
    }

    /// Zero a chat's unread count.
    pub fn mark_read(&mut self, chat_id: ChatId) -> Result<Chat, EngineError> {
        let chat = self
            .chats
            .get_mut(&chat_id)
            .ok_or(EngineError::ChatNotFound(chat_id))?;
        chat.unread_count = 0;
        chat.last_updated = Utc::now();
        Ok(chat.clone())
    }

    /// Toggle the local user's reaction with the given emoji. Returns the
    /// updated message and whether the reaction is now present.
    pub fn toggle_self_reaction(
        &mut self,
        chat_id: ChatId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<(Message, bool), EngineError> {
        let username = self.user_name.clone();
        let message = self.message_mut(chat_id, message_id)?;
        let before = message.reactions.len();
        message
            .reactions
            .retain(|r| !(r.emoji == emoji && r.user_id == SELF_USER_ID));
        let added = message.reactions.len() == before;
        if added {
            message.reactions.push(crate::types::Reaction {
                emoji: emoji.to_string(),
                user_id: SELF_USER_ID.to_string(),
                username,
            });
        }
        Ok((message.clone(), added))
    }

    /// Remove the local user's reaction with the given emoji, if present.
    pub fn remove_self_reaction(
        &mut self,
        chat_id: ChatId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<Message, EngineError> {
        let message = self.message_mut(chat_id, message_id)?;
        message
            .reactions
            .retain(|r| !(r.emoji == emoji && r.user_id == SELF_USER_ID));
        Ok(message.clone())
    }

    /// Drop all chats, messages, and identity registrations. The roster
    /// and its statuses survive, with live statuses reset to disconnected.
    pub fn clear_data(&mut self) {
        self.chats.clear();
        self.messages.clear();
        self.identity.clear();
        for status in self.connection.values_mut() {
            if *status != ConnectionStatus::Disabled {
                *status = ConnectionStatus::Disconnected;
            }
        }
    }

    /// Look up a chat by internal id.
    pub fn chat(&self, chat_id: ChatId) -> Option<&Chat> {
        self.chats.get(&chat_id)
    }

    /// All chats, most recently touched first.
    pub fn chats_snapshot(&self) -> Vec<Chat> {
        let mut chats: Vec<Chat> = self.chats.values().cloned().collect();
        chats.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        chats
    }

    /// One chat's messages, sorted ascending by timestamp.
    pub fn messages_snapshot(&self, chat_id: ChatId) -> Result<Vec<Message>, EngineError> {
        self.messages
            .get(&chat_id)
            .cloned()
            .ok_or(EngineError::ChatNotFound(chat_id))
    }

    fn message_mut(
        &mut self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<&mut Message, EngineError> {
        self.messages
            .get_mut(&chat_id)
            .ok_or(EngineError::ChatNotFound(chat_id))?
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(EngineError::MessageNotFound(message_id))
    }
}

fn summary_of(message: &Message) -> MessageSummary {
    MessageSummary {
        text: message.text.clone(),
        timestamp: message.timestamp,
        sender_id: message.sender_id.clone(),
        sender_name: message.sender_name.clone(),
    }
}
