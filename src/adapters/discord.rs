//! Discord simulation adapter.
//!
//! Requires a `token` credential at init (bot or user token per the
//! `token_type` setting). Seeds two servers as container nodes with their
//! text channels plus direct messages, then a scripted channel
//! conversation with reactions, an attachment, and a reply.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adapter::{AdapterConfig, AdapterError, EventSink, PlatformAdapter};
use crate::adapters::sim::{
    minutes_ago, recent_timestamp, seed_unread, ReactionSupport, Seed, SimSession,
};
use crate::types::{
    Attachment, ChatEvent, ChatKind, MessageEvent, MessageStatus, MessageSummary, PlatformId,
    Reaction, SendReceipt, SELF_USER_ID,
};

/// Credentials Discord requires at init.
const REQUIRED_CREDENTIALS: &[&str] = &["token"];

/// Simulated Discord integration.
pub struct DiscordAdapter {
    session: SimSession,
}

impl DiscordAdapter {
    /// Create the adapter.
    pub fn new() -> Self {
        Self {
            session: SimSession::new(
                PlatformId::Discord,
                "discord",
                ReactionSupport::Supported,
                seed,
            ),
        }
    }
}

impl Default for DiscordAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn seed(now: DateTime<Utc>) -> Seed {
    let servers = [
        ("discord-server-1", "Gaming Community"),
        ("discord-server-2", "Developers Hub"),
    ];
    let channels = [
        ("discord-channel-1", "discord-server-1", "general"),
        ("discord-channel-3", "discord-server-1", "game-discussion"),
        ("discord-channel-4", "discord-server-2", "general"),
        ("discord-channel-5", "discord-server-2", "help"),
        ("discord-channel-6", "discord-server-2", "projects"),
    ];
    let dms = [
        ("discord-dm-1", "Mark Anderson"),
        ("discord-dm-2", "Sophia Chen"),
    ];

    let mut chats = Vec::new();

    for (id, name) in servers {
        chats.push(ChatEvent {
            native_id: id.into(),
            kind: Some(ChatKind::Server),
            is_category: true,
            name: Some(name.into()),
            unread_count: Some(0),
            ..ChatEvent::default()
        });
    }

    for (id, server_id, name) in channels {
        chats.push(ChatEvent {
            native_id: id.into(),
            parent_native_id: Some(server_id.into()),
            kind: Some(ChatKind::Channel),
            name: Some(format!("#{name}")),
            unread_count: Some(seed_unread(4)),
            last_message: Some(MessageSummary {
                text: "Check out this new feature!".into(),
                timestamp: recent_timestamp(now),
                sender_id: "discord-user-1".into(),
                sender_name: "DevMaster".into(),
            }),
            ..ChatEvent::default()
        });
    }

    for (id, name) in dms {
        chats.push(ChatEvent {
            native_id: id.into(),
            kind: Some(ChatKind::Private),
            name: Some(name.into()),
            unread_count: Some(seed_unread(2)),
            last_message: Some(MessageSummary {
                text: "Hey, how are you?".into(),
                timestamp: recent_timestamp(now),
                sender_id: id.into(),
                sender_name: name.into(),
            }),
            ..ChatEvent::default()
        });
    }

    let millis = now.timestamp_millis();
    let native = |n: u32| format!("discord-msg-{millis}-{n}");

    let conversation = vec![
        MessageEvent {
            status: Some(MessageStatus::Delivered),
            ..MessageEvent::text(
                "discord-channel-6",
                native(1),
                "discord-user-1",
                "DevMaster",
                "Hey everyone! I just pushed a new update to my open source project.",
                minutes_ago(now, 60),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            reactions: vec![
                Reaction {
                    emoji: "👍".into(),
                    user_id: "discord-user-1".into(),
                    username: "DevMaster".into(),
                },
                Reaction {
                    emoji: "👀".into(),
                    user_id: "discord-user-3".into(),
                    username: "TechGuru".into(),
                },
            ],
            ..MessageEvent::text(
                "discord-channel-6",
                native(2),
                "discord-user-2",
                "CodeNinja",
                "Awesome! What changes did you make?",
                minutes_ago(now, 55),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            attachments: vec![Attachment {
                name: "screenshot.png".into(),
                mime_type: Some("image/png".into()),
                url: None,
            }],
            ..MessageEvent::text(
                "discord-channel-6",
                native(3),
                "discord-user-1",
                "DevMaster",
                "I improved performance by 30% and added a new feature for custom themes!",
                minutes_ago(now, 50),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            ..MessageEvent::text(
                "discord-channel-6",
                native(4),
                SELF_USER_ID,
                "You",
                "That's impressive! I'd love to contribute to the project.",
                minutes_ago(now, 45),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Delivered),
            reply_to: Some(native(4)),
            ..MessageEvent::text(
                "discord-channel-6",
                native(5),
                "discord-user-1",
                "DevMaster",
                "Great! I'll send you the repository link.",
                minutes_ago(now, 40),
            )
        },
    ];

    Seed {
        chats,
        conversation,
    }
}

#[async_trait]
impl PlatformAdapter for DiscordAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::Discord
    }

    async fn init(&self, config: AdapterConfig, sink: EventSink) -> Result<(), AdapterError> {
        self.session.init(config, sink, REQUIRED_CREDENTIALS).await
    }

    async fn connect(&self) -> Result<(), AdapterError> {
        self.session.connect().await
    }

    async fn disconnect(&self) -> Result<(), AdapterError> {
        self.session.disconnect().await
    }

    async fn send_message(
        &self,
        chat_native_id: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> Result<SendReceipt, AdapterError> {
        self.session
            .send_message(chat_native_id, text, attachments)
            .await
    }

    async fn mark_as_read(&self, chat_native_id: &str) -> Result<(), AdapterError> {
        self.session.mark_as_read(chat_native_id).await
    }

    async fn add_reaction(
        &self,
        chat_native_id: &str,
        message_native_id: &str,
        emoji: &str,
    ) -> Result<(), AdapterError> {
        self.session
            .reaction(chat_native_id, message_native_id, emoji, false)
            .await
    }

    async fn remove_reaction(
        &self,
        chat_native_id: &str,
        message_native_id: &str,
        emoji: &str,
    ) -> Result<(), AdapterError> {
        self.session
            .reaction(chat_native_id, message_native_id, emoji, true)
            .await
    }
}
