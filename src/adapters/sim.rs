//! Shared backbone for the simulation adapters.
//!
//! Owns the per-adapter lifecycle state machine (uninitialized →
//! initialized → {connecting → connected → disconnected} | error), the
//! stored sink/config, and the connect sequence: report `Connecting`,
//! wait a beat, report `Connected`, then spawn a background task that
//! seeds the platform's demo chats and a scripted conversation with
//! staggered delays — the same shape a real adapter's event listener
//! would have.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::adapter::{AdapterConfig, AdapterError, EventSink};
use crate::types::{
    Attachment, ChatEvent, ConnectionStatus, MessageEvent, MessageStatus, PlatformId, SendReceipt,
};

/// Simulated session-establishment delay.
const CONNECT_DELAY: Duration = Duration::from_millis(200);

/// Delay before the seed chats are emitted after connect.
const SEED_CHATS_DELAY: Duration = Duration::from_millis(300);

/// Delay before the scripted conversation starts after the chats.
const SEED_MESSAGES_DELAY: Duration = Duration::from_millis(500);

/// Gap between consecutive scripted messages.
const MESSAGE_GAP: Duration = Duration::from_millis(200);

/// Simulated round-trip for an outbound send.
const SEND_DELAY: Duration = Duration::from_millis(100);

/// Adapter lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Uninitialized,
    Initialized,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

/// Seed data a platform adapter emits after connecting.
pub struct Seed {
    /// Chats to announce, in order.
    pub chats: Vec<ChatEvent>,
    /// A scripted conversation delivered with staggered delays.
    pub conversation: Vec<MessageEvent>,
}

/// Whether the simulated platform has a reaction model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionSupport {
    /// Reaction calls are accepted.
    Supported,
    /// Reaction calls fail with [`AdapterError::Unsupported`].
    Unsupported,
}

struct SessionInner {
    sink: EventSink,
    #[allow(dead_code)] // retained for re-connects; stubs only validate it
    config: AdapterConfig,
    seed_task: Option<JoinHandle<()>>,
}

/// The shared simulated session every platform adapter delegates to.
pub struct SimSession {
    platform: PlatformId,
    /// Platform prefix for native ids of locally sent messages.
    send_prefix: &'static str,
    reactions: ReactionSupport,
    seed: fn(DateTime<Utc>) -> Seed,
    state: Mutex<SessionState>,
    inner: Mutex<Option<SessionInner>>,
}

impl SimSession {
    /// Create a session for one platform.
    ///
    /// `seed` builds the demo data relative to the connect time so the
    /// scripted conversation always lands in the recent past.
    pub fn new(
        platform: PlatformId,
        send_prefix: &'static str,
        reactions: ReactionSupport,
        seed: fn(DateTime<Utc>) -> Seed,
    ) -> Self {
        Self {
            platform,
            send_prefix,
            reactions,
            seed,
            state: Mutex::new(SessionState::Uninitialized),
            inner: Mutex::new(None),
        }
    }

    /// Validate required credentials, then store config and sink.
    pub async fn init(
        &self,
        config: AdapterConfig,
        sink: EventSink,
        required: &[&str],
    ) -> Result<(), AdapterError> {
        for key in required {
            config.require(key)?;
        }
        *self.inner.lock().await = Some(SessionInner {
            sink,
            config,
            seed_task: None,
        });
        *self.state.lock().await = SessionState::Initialized;
        debug!(platform = %self.platform, "adapter initialized");
        Ok(())
    }

    /// Simulate session establishment and start the seed task.
    pub async fn connect(&self) -> Result<(), AdapterError> {
        let sink = self.sink().await?;

        *self.state.lock().await = SessionState::Connecting;
        sink.connection_status(ConnectionStatus::Connecting).await;

        tokio::time::sleep(CONNECT_DELAY).await;

        *self.state.lock().await = SessionState::Connected;
        sink.connection_status(ConnectionStatus::Connected).await;
        debug!(platform = %self.platform, "adapter connected");

        let seed = (self.seed)(Utc::now());
        let task = tokio::spawn(run_seed(sink, seed));
        if let Some(inner) = self.inner.lock().await.as_mut() {
            if let Some(old) = inner.seed_task.replace(task) {
                old.abort();
            }
        }
        Ok(())
    }

    /// Tear down the session. No-op success when not connected.
    pub async fn disconnect(&self) -> Result<(), AdapterError> {
        let mut state = self.state.lock().await;
        match *state {
            SessionState::Connecting | SessionState::Connected | SessionState::Error => {
                *state = SessionState::Disconnected;
                drop(state);
                let mut inner = self.inner.lock().await;
                if let Some(inner) = inner.as_mut() {
                    if let Some(task) = inner.seed_task.take() {
                        task.abort();
                    }
                    inner
                        .sink
                        .connection_status(ConnectionStatus::Disconnected)
                        .await;
                }
                debug!(platform = %self.platform, "adapter disconnected");
            }
            _ => {}
        }
        Ok(())
    }

    /// Simulate an accepted send, returning a platform-prefixed receipt.
    ///
    /// All-or-nothing: the simulated platform accepts the full message
    /// plus attachments in one step.
    pub async fn send_message(
        &self,
        chat_native_id: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> Result<SendReceipt, AdapterError> {
        self.ensure_initialized().await?;
        tokio::time::sleep(SEND_DELAY).await;
        let now = Utc::now();
        debug!(
            platform = %self.platform,
            chat = chat_native_id,
            chars = text.len(),
            attachments = attachments.len(),
            "simulated send accepted"
        );
        Ok(SendReceipt {
            native_id: format!("{}-msg-{}", self.send_prefix, now.timestamp_millis()),
            timestamp: now,
            status: MessageStatus::Sent,
        })
    }

    /// Acknowledge a mark-read call.
    pub async fn mark_as_read(&self, chat_native_id: &str) -> Result<(), AdapterError> {
        self.ensure_initialized().await?;
        debug!(platform = %self.platform, chat = chat_native_id, "chat marked read");
        Ok(())
    }

    /// Acknowledge or reject a reaction call depending on platform support.
    pub async fn reaction(
        &self,
        chat_native_id: &str,
        message_native_id: &str,
        emoji: &str,
        removing: bool,
    ) -> Result<(), AdapterError> {
        self.ensure_initialized().await?;
        if self.reactions == ReactionSupport::Unsupported {
            return Err(AdapterError::Unsupported("reactions"));
        }
        debug!(
            platform = %self.platform,
            chat = chat_native_id,
            message = message_native_id,
            emoji,
            removing,
            "simulated reaction applied"
        );
        Ok(())
    }

    async fn ensure_initialized(&self) -> Result<(), AdapterError> {
        if *self.state.lock().await == SessionState::Uninitialized {
            return Err(AdapterError::NotInitialized);
        }
        Ok(())
    }

    async fn sink(&self) -> Result<EventSink, AdapterError> {
        self.inner
            .lock()
            .await
            .as_ref()
            .map(|inner| inner.sink.clone())
            .ok_or(AdapterError::NotInitialized)
    }
}

/// Emit the seed chats, then the scripted conversation, with the delays a
/// live event stream would show.
async fn run_seed(sink: EventSink, seed: Seed) {
    tokio::time::sleep(SEED_CHATS_DELAY).await;
    for chat in seed.chats {
        sink.chat(chat).await;
    }

    tokio::time::sleep(SEED_MESSAGES_DELAY).await;
    for message in seed.conversation {
        sink.message(message).await;
        tokio::time::sleep(MESSAGE_GAP).await;
    }
}

/// Random unread count for seeded chats, mirroring live-looking demo data.
pub fn seed_unread(max: u32) -> u32 {
    use rand::Rng;
    rand::thread_rng().gen_range(0..=max)
}

/// Random timestamp within the 24 hours before `now`, for seeded
/// last-message summaries.
pub fn recent_timestamp(now: DateTime<Utc>) -> DateTime<Utc> {
    use rand::Rng;
    let seconds_back = rand::thread_rng().gen_range(0..86_400);
    now.checked_sub_signed(chrono::Duration::seconds(seconds_back))
        .unwrap_or(now)
}

/// Timestamp `minutes` before `now`, clamped to `now` on overflow.
pub fn minutes_ago(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    now.checked_sub_signed(chrono::Duration::minutes(minutes))
        .unwrap_or(now)
}
