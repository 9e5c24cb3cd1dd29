//! Core data model: platforms, connection state, chats, messages, reactions.
//!
//! Internal ids ([`ChatId`], [`MessageId`]) are engine-assigned UUIDs, stable
//! across platform reconnects. Native ids are strings meaningful only within
//! one platform's own API and never leak into cross-platform identity.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender id reserved for the local user across all platforms.
pub const SELF_USER_ID: &str = "self";

/// The messaging platforms Unichat aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    /// WhatsApp.
    WhatsApp,
    /// Telegram.
    Telegram,
    /// Discord.
    Discord,
    /// Slack.
    Slack,
    /// Facebook Messenger.
    Messenger,
}

impl PlatformId {
    /// Every supported platform, in roster order.
    pub const ALL: [PlatformId; 5] = [
        PlatformId::WhatsApp,
        PlatformId::Telegram,
        PlatformId::Discord,
        PlatformId::Slack,
        PlatformId::Messenger,
    ];

    /// Stable lowercase identifier used in settings keys and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformId::WhatsApp => "whatsapp",
            PlatformId::Telegram => "telegram",
            PlatformId::Discord => "discord",
            PlatformId::Slack => "slack",
            PlatformId::Messenger => "messenger",
        }
    }

    /// Human-readable display name.
    pub fn display_name(self) -> &'static str {
        match self {
            PlatformId::WhatsApp => "WhatsApp",
            PlatformId::Telegram => "Telegram",
            PlatformId::Discord => "Discord",
            PlatformId::Slack => "Slack",
            PlatformId::Messenger => "Messenger",
        }
    }

    /// Brand color hint for presentation layers.
    pub fn color_hint(self) -> &'static str {
        match self {
            PlatformId::WhatsApp => "#25D366",
            PlatformId::Telegram => "#0088cc",
            PlatformId::Discord => "#7289da",
            PlatformId::Slack => "#4A154B",
            PlatformId::Messenger => "#00B2FF",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whatsapp" => Ok(PlatformId::WhatsApp),
            "telegram" => Ok(PlatformId::Telegram),
            "discord" => Ok(PlatformId::Discord),
            "slack" => Ok(PlatformId::Slack),
            "messenger" => Ok(PlatformId::Messenger),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized platform identifier.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

/// Per-platform connection state, engine-driven.
///
/// A platform with `enabled = false` in its roster entry is always
/// `Disabled`, never any other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Platform is disabled in settings.
    Disabled,
    /// Enabled but no session established.
    Disconnected,
    /// Session establishment in progress.
    Connecting,
    /// Session established.
    Connected,
    /// Session establishment or maintenance failed.
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Disabled => "disabled",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Roster entry for one platform, built at engine initialization from
/// persisted settings. Never deleted, only disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformDescriptor {
    /// Platform identity.
    pub id: PlatformId,
    /// Human-readable display name.
    pub display_name: String,
    /// Whether the user has enabled this platform.
    pub enabled: bool,
    /// Brand color hint for presentation layers.
    pub color_hint: String,
    /// Settings-store key holding this platform's credentials
    /// (e.g. `auth.telegram`).
    pub credential_ref: String,
}

/// Engine-assigned internal chat id, stable across reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(Uuid);

impl ChatId {
    /// Allocate a fresh internal chat id.
    pub fn new() -> Self {
        ChatId(Uuid::new_v4())
    }
}

impl Default for ChatId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Engine-assigned internal message id, stable across reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Allocate a fresh internal message id.
    pub fn new() -> Self {
        MessageId(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Chat taxonomy across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// One-on-one conversation.
    Private,
    /// Multi-member group conversation.
    Group,
    /// Broadcast or topic channel.
    Channel,
    /// Discord-style server (container node).
    Server,
    /// Slack-style workspace (container node).
    Workspace,
}

impl Default for ChatKind {
    fn default() -> Self {
        ChatKind::Private
    }
}

/// A member of a group chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Platform-native member id.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Compact summary of the most recent message in a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Message text.
    pub text: String,
    /// Message timestamp.
    pub timestamp: DateTime<Utc>,
    /// Platform-native sender id.
    pub sender_id: String,
    /// Sender display name.
    pub sender_name: String,
}

/// A unified chat. Exactly one exists per (platform, native id) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Engine-assigned internal id.
    pub id: ChatId,
    /// Platform this chat lives on.
    pub platform: PlatformId,
    /// Platform-native chat id.
    pub native_id: String,
    /// Native id of the containing node, if any (Discord server,
    /// Slack workspace).
    pub parent_native_id: Option<String>,
    /// Chat taxonomy.
    pub kind: ChatKind,
    /// Whether this is a non-leaf container node rather than a real
    /// conversation.
    pub is_category: bool,
    /// Display name.
    pub name: String,
    /// Avatar reference (URL or path), if known.
    pub avatar: Option<String>,
    /// Unread message count. Reset to zero only by an explicit
    /// mark-read command.
    pub unread_count: u32,
    /// Summary of the most recent message.
    pub last_message: Option<MessageSummary>,
    /// Group members, replaced wholesale on chat updates.
    pub members: Vec<Member>,
    /// Last time any event touched this chat.
    pub last_updated: DateTime<Utc>,
}

/// Delivery state of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Locally authored, awaiting adapter confirmation.
    Sending,
    /// Accepted by the platform.
    Sent,
    /// Delivered to the recipient.
    Delivered,
    /// Read by the recipient.
    Read,
    /// Dispatch failed; retained so the user can retry.
    Error,
}

/// An emoji reaction on a message, unique per (emoji, user id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Emoji glyph.
    pub emoji: String,
    /// Platform-native user id; [`SELF_USER_ID`] for the local user.
    pub user_id: String,
    /// Display name of the reacting user.
    pub username: String,
}

/// An opaque attachment reference. Media handling is adapter-internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name.
    pub name: String,
    /// MIME type, if known.
    pub mime_type: Option<String>,
    /// Location reference (URL or path).
    pub url: Option<String>,
}

/// A unified message. Exactly one exists per (chat, native id) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Engine-assigned internal id, unchanged through reconciliation.
    pub id: MessageId,
    /// Internal id of the owning chat.
    pub chat_id: ChatId,
    /// Platform this message lives on.
    pub platform: PlatformId,
    /// Platform-native message id. Provisional (`local-…`) for optimistic
    /// sends until the adapter confirms.
    pub native_id: String,
    /// Platform-native sender id; [`SELF_USER_ID`] for the local user.
    pub sender_id: String,
    /// Sender display name.
    pub sender_name: String,
    /// Message text.
    pub text: String,
    /// Message timestamp; per-chat lists are kept sorted ascending by it.
    pub timestamp: DateTime<Utc>,
    /// Attachment references.
    pub attachments: Vec<Attachment>,
    /// Reactions, unique per (emoji, user id).
    pub reactions: Vec<Reaction>,
    /// Native id of the message this replies to, resolved lazily.
    pub reply_to: Option<String>,
    /// Delivery state.
    pub status: MessageStatus,
    /// Whether the message was forwarded from elsewhere.
    pub is_forwarded: bool,
}

/// Normalized chat event emitted by an adapter.
///
/// Optional fields merge into an existing chat (present fields overwrite,
/// `members` is replaced wholesale); absent fields leave it untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Platform-native chat id.
    pub native_id: String,
    /// Native id of the containing node, if any.
    pub parent_native_id: Option<String>,
    /// Chat taxonomy, if known.
    pub kind: Option<ChatKind>,
    /// Whether this is a container node.
    pub is_category: bool,
    /// Display name, if known.
    pub name: Option<String>,
    /// Avatar reference, if known.
    pub avatar: Option<String>,
    /// Platform-reported unread count, if any.
    pub unread_count: Option<u32>,
    /// Summary of the most recent message, if known.
    pub last_message: Option<MessageSummary>,
    /// Group members; replaces the stored list when present.
    pub members: Option<Vec<Member>>,
}

/// Normalized message event emitted by an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Platform-native message id.
    pub native_id: String,
    /// Platform-native id of the owning chat.
    pub chat_native_id: String,
    /// Platform-native sender id; [`SELF_USER_ID`] for the local user.
    pub sender_id: String,
    /// Sender display name.
    pub sender_name: String,
    /// Message text.
    pub text: String,
    /// Message timestamp.
    pub timestamp: DateTime<Utc>,
    /// Attachment references.
    pub attachments: Vec<Attachment>,
    /// Reactions present on arrival.
    pub reactions: Vec<Reaction>,
    /// Native id of the message this replies to.
    pub reply_to: Option<String>,
    /// Delivery state; defaults to [`MessageStatus::Sent`] when absent.
    pub status: Option<MessageStatus>,
    /// Whether the message was forwarded.
    pub is_forwarded: bool,
}

impl MessageEvent {
    /// A minimal text message event, for adapters and tests.
    pub fn text(
        chat_native_id: impl Into<String>,
        native_id: impl Into<String>,
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        MessageEvent {
            native_id: native_id.into(),
            chat_native_id: chat_native_id.into(),
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            text: text.into(),
            timestamp,
            attachments: Vec::new(),
            reactions: Vec::new(),
            reply_to: None,
            status: None,
            is_forwarded: false,
        }
    }
}

/// Adapter confirmation of an outbound send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Platform-assigned native id for the sent message.
    pub native_id: String,
    /// Platform-reported timestamp.
    pub timestamp: DateTime<Utc>,
    /// Delivery state after acceptance, normally [`MessageStatus::Sent`].
    pub status: MessageStatus,
}

/// Snapshot of per-platform connection statuses.
pub type StatusMap = HashMap<PlatformId, ConnectionStatus>;
