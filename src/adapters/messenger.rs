//! Facebook Messenger simulation adapter.
//!
//! No credentials required at init — browser-based authentication is out
//! of scope and a logged-in session is assumed. Seeds individual and
//! group chats, then a scripted group conversation.

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

/// Simulated Messenger integration.
pub struct MessengerAdapter {
    session: SimSession,
}

impl MessengerAdapter {
    /// Create the adapter.
    pub fn new() -> Self {
        Self {
            session: SimSession::new(
                PlatformId::Messenger,
                "messenger",
                ReactionSupport::Supported,
                seed,
            ),
        }
    }
}

impl Default for MessengerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn seed(now: DateTime<Utc>) -> Seed {
    let individuals = [
        ("messenger-chat-1", "Jennifer Lee"),
        ("messenger-chat-2", "Mike Thompson"),
        ("messenger-chat-3", "Rachel Green"),
    ];
    let groups = [
        ("messenger-group-1", "Weekend Plans"),
        ("messenger-group-2", "Book Club"),
    ];

    let mut chats = Vec::new();

    for (id, name) in individuals {
        chats.push(ChatEvent {
            native_id: id.into(),
            kind: Some(ChatKind::Private),
            name: Some(name.into()),
            unread_count: Some(seed_unread(4)),
            last_message: Some(MessageSummary {
                text: "Hey, how are you doing?".into(),
                timestamp: recent_timestamp(now),
                sender_id: id.into(),
                sender_name: name.into(),
            }),
            ..ChatEvent::default()
        });
    }

    for (id, name) in groups {
        chats.push(ChatEvent {
            native_id: id.into(),
            kind: Some(ChatKind::Group),
            name: Some(name.into()),
            unread_count: Some(seed_unread(4)),
            last_message: Some(MessageSummary {
                text: "Looking forward to seeing everyone!".into(),
                timestamp: recent_timestamp(now),
                sender_id: "messenger-chat-1".into(),
                sender_name: "Jennifer Lee".into(),
            }),
            members: Some(vec![
                Member {
                    id: "messenger-chat-1".into(),
                    name: "Jennifer Lee".into(),
                },
                Member {
                    id: "messenger-chat-2".into(),
                    name: "Mike Thompson".into(),
                },
                Member {
                    id: SELF_USER_ID.into(),
                    name: "You".into(),
                },
            ]),
            ..ChatEvent::default()
        });
    }

    let millis = now.timestamp_millis();
    let native = |n: u32| format!("messenger-msg-{millis}-{n}");

    let conversation = vec![
        MessageEvent {
            status: Some(MessageStatus::Delivered),
            ..MessageEvent::text(
                "messenger-group-1",
                native(1),
                "messenger-chat-1",
                "Jennifer Lee",
                "Hey everyone! Who's up for hiking this weekend?",
                minutes_ago(now, 120),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            reactions: vec![Reaction {
                emoji: "👍".into(),
                user_id: "messenger-chat-1".into(),
                username: "Jennifer Lee".into(),
            }],
            ..MessageEvent::text(
                "messenger-group-1",
                native(2),
                "messenger-chat-2",
                "Mike Thompson",
                "I'm in! Which trail are we thinking of?",
                minutes_ago(now, 115),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            attachments: vec![Attachment {
                name: "trail-map.jpg".into(),
                mime_type: Some("image/jpeg".into()),
                url: None,
            }],
            ..MessageEvent::text(
                "messenger-group-1",
                native(3),
                "messenger-chat-1",
                "Jennifer Lee",
                "I was thinking of Eagle Mountain. It has great views!",
                minutes_ago(now, 110),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            ..MessageEvent::text(
                "messenger-group-1",
                native(4),
                SELF_USER_ID,
                "You",
                "That looks amazing! What time should we meet?",
                minutes_ago(now, 105),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Delivered),
            reply_to: Some(native(4)),
            ..MessageEvent::text(
                "messenger-group-1",
                native(5),
                "messenger-chat-1",
                "Jennifer Lee",
                "How about 9 AM at the trailhead?",
                minutes_ago(now, 100),
            )
        },
    ];

    Seed {
        chats,
        conversation,
    }
}

#[async_trait]
impl PlatformAdapter for MessengerAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::Messenger
    }

    async fn init(&self, config: AdapterConfig, sink: EventSink) -> Result<(), AdapterError> {
        self.session.init(config, sink, &[]).await
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
