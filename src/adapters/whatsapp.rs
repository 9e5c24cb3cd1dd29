//! WhatsApp simulation adapter.
//!
//! No credentials required at init — QR-style pairing is out of scope and
//! a linked session is assumed. The simulated session has no reaction
//! model, so reaction calls fail with `Unsupported` and stay local-only
//! in the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adapter::{AdapterConfig, AdapterError, EventSink, PlatformAdapter};
use crate::adapters::sim::{
    minutes_ago, recent_timestamp, seed_unread, ReactionSupport, Seed, SimSession,
};
use crate::types::{
    Attachment, ChatEvent, ChatKind, Member, MessageEvent, MessageStatus, MessageSummary,
    PlatformId, SendReceipt, SELF_USER_ID,
};

/// Simulated WhatsApp integration.
pub struct WhatsAppAdapter {
    session: SimSession,
}

impl WhatsAppAdapter {
    /// Create the adapter.
    pub fn new() -> Self {
        Self {
            session: SimSession::new(
                PlatformId::WhatsApp,
                "wa",
                ReactionSupport::Unsupported,
                seed,
            ),
        }
    }
}

impl Default for WhatsAppAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn seed(now: DateTime<Utc>) -> Seed {
    let contacts = [
        ("wa-contact-1", "John Doe", false),
        ("wa-contact-2", "Jane Smith", false),
        ("wa-contact-3", "Work Group", true),
        ("wa-contact-4", "Family", true),
        ("wa-contact-5", "Alice Johnson", false),
    ];

    let group_members = vec![
        Member {
            id: "member-1".into(),
            name: "Member 1".into(),
        },
        Member {
            id: "member-2".into(),
            name: "Member 2".into(),
        },
        Member {
            id: "member-3".into(),
            name: "Member 3".into(),
        },
    ];

    let chats = contacts
        .iter()
        .map(|&(id, name, is_group)| ChatEvent {
            native_id: id.into(),
            kind: Some(if is_group {
                ChatKind::Group
            } else {
                ChatKind::Private
            }),
            name: Some(name.into()),
            unread_count: Some(seed_unread(4)),
            last_message: Some(MessageSummary {
                text: "Hello from WhatsApp!".into(),
                timestamp: recent_timestamp(now),
                sender_id: id.into(),
                sender_name: name.into(),
            }),
            members: is_group.then(|| group_members.clone()),
            ..ChatEvent::default()
        })
        .collect();

    let millis = now.timestamp_millis();
    let native = |n: u32| format!("wa-msg-{millis}-{n}");

    let conversation = vec![
        MessageEvent {
            status: Some(MessageStatus::Delivered),
            ..MessageEvent::text(
                "wa-contact-1",
                native(1),
                "wa-contact-1",
                "John Doe",
                "Hey there! How are you doing?",
                minutes_ago(now, 60),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            ..MessageEvent::text(
                "wa-contact-1",
                native(2),
                SELF_USER_ID,
                "You",
                "I'm doing great! Thanks for asking.",
                minutes_ago(now, 55),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Delivered),
            ..MessageEvent::text(
                "wa-contact-1",
                native(3),
                "wa-contact-1",
                "John Doe",
                "Glad to hear that! I was wondering if you'd like to join us for dinner this weekend?",
                minutes_ago(now, 50),
            )
        },
    ];

    Seed {
        chats,
        conversation,
    }
}

#[async_trait]
impl PlatformAdapter for WhatsAppAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::WhatsApp
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
