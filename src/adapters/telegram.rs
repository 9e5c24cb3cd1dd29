//! Telegram simulation adapter.
//!
//! Requires `api_id` and `api_hash` credentials at init. Seeds private
//! chats, a group, and a broadcast channel, then a scripted group
//! conversation with reactions and a reply.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adapter::{AdapterConfig, AdapterError, EventSink, PlatformAdapter};
use crate::adapters::sim::{
    minutes_ago, recent_timestamp, seed_unread, ReactionSupport, Seed, SimSession,
};
use crate::types::{
    Attachment, ChatEvent, ChatKind, Member, MessageEvent, MessageStatus, MessageSummary,
    PlatformId, Reaction, SendReceipt, SELF_USER_ID,
};

/// Credentials Telegram requires at init.
const REQUIRED_CREDENTIALS: &[&str] = &["api_id", "api_hash"];

/// Simulated Telegram integration.
pub struct TelegramAdapter {
    session: SimSession,
}

impl TelegramAdapter {
    /// Create the adapter.
    pub fn new() -> Self {
        Self {
            session: SimSession::new(
                PlatformId::Telegram,
                "telegram",
                ReactionSupport::Supported,
                seed,
            ),
        }
    }
}

impl Default for TelegramAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn seed(now: DateTime<Utc>) -> Seed {
    let group_members = vec![
        Member {
            id: "tg-member-1".into(),
            name: "David".into(),
        },
        Member {
            id: "tg-member-2".into(),
            name: "Emma".into(),
        },
        Member {
            id: "tg-member-3".into(),
            name: "Michael".into(),
        },
    ];

    let private = |id: &str, name: &str| ChatEvent {
        native_id: id.into(),
        kind: Some(ChatKind::Private),
        name: Some(name.into()),
        unread_count: Some(seed_unread(4)),
        last_message: Some(MessageSummary {
            text: "Hello from Telegram!".into(),
            timestamp: recent_timestamp(now),
            sender_id: id.into(),
            sender_name: name.into(),
        }),
        ..ChatEvent::default()
    };

    let chats = vec![
        private("tg-chat-1", "Alex Taylor"),
        private("tg-chat-2", "Sarah Wilson"),
        ChatEvent {
            native_id: "tg-chat-3".into(),
            kind: Some(ChatKind::Group),
            name: Some("Tech Enthusiasts".into()),
            unread_count: Some(seed_unread(4)),
            last_message: Some(MessageSummary {
                text: "Hello from Telegram!".into(),
                timestamp: recent_timestamp(now),
                sender_id: "tg-member-1".into(),
                sender_name: "Group Member".into(),
            }),
            members: Some(group_members),
            ..ChatEvent::default()
        },
        ChatEvent {
            native_id: "tg-chat-4".into(),
            kind: Some(ChatKind::Channel),
            name: Some("Travel Channel".into()),
            unread_count: Some(seed_unread(4)),
            last_message: Some(MessageSummary {
                text: "New post in channel".into(),
                timestamp: recent_timestamp(now),
                sender_id: "tg-chat-4".into(),
                sender_name: "Travel Channel".into(),
            }),
            ..ChatEvent::default()
        },
        ChatEvent {
            native_id: "tg-chat-5".into(),
            kind: Some(ChatKind::Group),
            name: Some("Best Friends".into()),
            unread_count: Some(seed_unread(4)),
            members: Some(Vec::new()),
            ..ChatEvent::default()
        },
    ];

    let millis = now.timestamp_millis();
    let native = |n: u32| format!("tg-msg-{millis}-{n}");

    let conversation = vec![
        MessageEvent {
            status: Some(MessageStatus::Delivered),
            ..MessageEvent::text(
                "tg-chat-3",
                native(1),
                "tg-member-1",
                "David",
                "Hey everyone! Did you see the latest tech news?",
                minutes_ago(now, 60),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            reactions: vec![
                Reaction {
                    emoji: "👍".into(),
                    user_id: "tg-member-1".into(),
                    username: "David".into(),
                },
                Reaction {
                    emoji: "❤️".into(),
                    user_id: "tg-member-3".into(),
                    username: "Michael".into(),
                },
            ],
            ..MessageEvent::text(
                "tg-chat-3",
                native(2),
                "tg-member-2",
                "Emma",
                "Yes! The new AI developments are amazing!",
                minutes_ago(now, 55),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            ..MessageEvent::text(
                "tg-chat-3",
                native(3),
                SELF_USER_ID,
                "You",
                "I've been following that too. The progress is incredible!",
                minutes_ago(now, 50),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Delivered),
            reply_to: Some(native(3)),
            ..MessageEvent::text(
                "tg-chat-3",
                native(4),
                "tg-member-3",
                "Michael",
                "Have you tried implementing any of those algorithms?",
                minutes_ago(now, 45),
            )
        },
    ];

    Seed {
        chats,
        conversation,
    }
}

#[async_trait]
impl PlatformAdapter for TelegramAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::Telegram
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
