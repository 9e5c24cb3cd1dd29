//! Slack simulation adapter.
//!
//! Requires an OAuth `token` credential at init. Seeds one workspace as a
//! container node with its channels and direct messages, then a scripted
//! channel conversation.

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

/// Credentials Slack requires at init.
const REQUIRED_CREDENTIALS: &[&str] = &["token"];

/// Simulated Slack integration.
pub struct SlackAdapter {
    session: SimSession,
}

impl SlackAdapter {
    /// Create the adapter.
    pub fn new() -> Self {
        Self {
            session: SimSession::new(PlatformId::Slack, "slack", ReactionSupport::Supported, seed),
        }
    }
}

impl Default for SlackAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn seed(now: DateTime<Utc>) -> Seed {
    const WORKSPACE: &str = "slack-workspace-1";
    let channels = [
        ("slack-channel-1", "general"),
        ("slack-channel-2", "random"),
        ("slack-channel-3", "project-alpha"),
        ("slack-channel-4", "announcements"),
    ];
    let dms = [
        ("slack-dm-1", "slack-user-1", "Robert Johnson"),
        ("slack-dm-2", "slack-user-2", "Lisa Williams"),
    ];

    let mut chats = vec![ChatEvent {
        native_id: WORKSPACE.into(),
        kind: Some(ChatKind::Workspace),
        is_category: true,
        name: Some("Acme Inc".into()),
        unread_count: Some(0),
        ..ChatEvent::default()
    }];

    for (id, name) in channels {
        chats.push(ChatEvent {
            native_id: id.into(),
            parent_native_id: Some(WORKSPACE.into()),
            kind: Some(ChatKind::Channel),
            name: Some(format!("#{name}")),
            unread_count: Some(seed_unread(4)),
            last_message: Some(MessageSummary {
                text: "Latest update on the project.".into(),
                timestamp: recent_timestamp(now),
                sender_id: "slack-user-3".into(),
                sender_name: "TeamLead".into(),
            }),
            ..ChatEvent::default()
        });
    }

    for (id, user_id, name) in dms {
        chats.push(ChatEvent {
            native_id: id.into(),
            parent_native_id: Some(WORKSPACE.into()),
            kind: Some(ChatKind::Private),
            name: Some(name.into()),
            unread_count: Some(seed_unread(2)),
            last_message: Some(MessageSummary {
                text: "Can we discuss the project timeline?".into(),
                timestamp: recent_timestamp(now),
                sender_id: user_id.into(),
                sender_name: name.into(),
            }),
            ..ChatEvent::default()
        });
    }

    let millis = now.timestamp_millis();
    let native = |n: u32| format!("slack-msg-{millis}-{n}");

    let conversation = vec![
        MessageEvent {
            status: Some(MessageStatus::Delivered),
            ..MessageEvent::text(
                "slack-channel-3",
                native(1),
                "slack-user-3",
                "TeamLead",
                "Team, we need to discuss the roadmap for Project Alpha",
                minutes_ago(now, 120),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            attachments: vec![Attachment {
                name: "mockup.png".into(),
                mime_type: Some("image/png".into()),
                url: None,
            }],
            ..MessageEvent::text(
                "slack-channel-3",
                native(2),
                "slack-user-1",
                "Robert Johnson",
                "I've prepared the initial designs. Here's the mockup:",
                minutes_ago(now, 110),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            reactions: vec![
                Reaction {
                    emoji: "👍".into(),
                    user_id: "slack-user-3".into(),
                    username: "TeamLead".into(),
                },
                Reaction {
                    emoji: "🎉".into(),
                    user_id: "slack-user-1".into(),
                    username: "Robert Johnson".into(),
                },
            ],
            ..MessageEvent::text(
                "slack-channel-3",
                native(3),
                "slack-user-2",
                "Lisa Williams",
                "Looks great! I especially like the new navigation flow.",
                minutes_ago(now, 100),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Read),
            ..MessageEvent::text(
                "slack-channel-3",
                native(4),
                SELF_USER_ID,
                "You",
                "I can start implementing the backend for this next week. When do we need the first prototype?",
                minutes_ago(now, 90),
            )
        },
        MessageEvent {
            status: Some(MessageStatus::Delivered),
            ..MessageEvent::text(
                "slack-channel-3",
                native(5),
                "slack-user-3",
                "TeamLead",
                "Great initiative! We're targeting end of month for the first demo.",
                minutes_ago(now, 83),
            )
        },
    ];

    Seed {
        chats,
        conversation,
    }
}

#[async_trait]
impl PlatformAdapter for SlackAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::Slack
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
