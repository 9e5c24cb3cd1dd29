//! Platform adapter contract: the capability interface every integration
//! implements, the normalized events adapters push, and the channel-backed
//! sink they push them through.
//!
//! Adapters never touch engine state. They receive an [`EventSink`] at
//! `init` time and emit [`AdapterEvent`]s over a bounded mpsc channel; the
//! engine consumes the channel from a single task, which is what serializes
//! all state mutations.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{
    Attachment, ChatEvent, ConnectionStatus, MessageEvent, PlatformId, SendReceipt,
};

/// Errors an adapter can report across the contract boundary.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Required credentials are missing or invalid. Fatal to this
    /// adapter's `init`, not to the engine.
    #[error("configuration error: {0}")]
    Config(String),
    /// Failed to establish or maintain a session. Retryable by
    /// re-invoking connect.
    #[error("connection error: {0}")]
    Connection(String),
    /// Message dispatch failed. The engine keeps the optimistic message
    /// in `Error` status so the user can retry.
    #[error("send error: {0}")]
    Send(String),
    /// The platform has no model for the requested capability.
    #[error("unsupported on this platform: {0}")]
    Unsupported(&'static str),
    /// An operation was invoked before `init`.
    #[error("adapter not initialized")]
    NotInitialized,
}

/// A normalized event pushed from an adapter to the engine.
#[derive(Debug, Clone)]
pub enum AdapterEvent {
    /// A chat was discovered or updated.
    Chat(ChatEvent),
    /// A message arrived or was updated.
    Message(MessageEvent),
    /// The adapter's session state changed.
    ConnectionStatus(ConnectionStatus),
    /// A non-fatal adapter-side error to surface to the user.
    Error(String),
}

/// Clonable handle an adapter uses to push events to the engine.
///
/// Handed to the adapter at `init` time; tags every event with the
/// adapter's platform so the engine never needs to know which platform it
/// is talking to. Sends into a closed channel are dropped silently — that
/// only happens during engine teardown.
#[derive(Debug, Clone)]
pub struct EventSink {
    platform: PlatformId,
    tx: mpsc::Sender<(PlatformId, AdapterEvent)>,
}

impl EventSink {
    /// Create a sink for the given platform over the engine's event channel.
    pub fn new(platform: PlatformId, tx: mpsc::Sender<(PlatformId, AdapterEvent)>) -> Self {
        Self { platform, tx }
    }

    /// The platform this sink is bound to.
    pub fn platform(&self) -> PlatformId {
        self.platform
    }

    /// Emit a chat event.
    pub async fn chat(&self, event: ChatEvent) {
        self.emit(AdapterEvent::Chat(event)).await;
    }

    /// Emit a message event.
    pub async fn message(&self, event: MessageEvent) {
        self.emit(AdapterEvent::Message(event)).await;
    }

    /// Report a connection status change.
    pub async fn connection_status(&self, status: ConnectionStatus) {
        self.emit(AdapterEvent::ConnectionStatus(status)).await;
    }

    /// Report a non-fatal adapter error.
    pub async fn error(&self, message: impl Into<String>) {
        self.emit(AdapterEvent::Error(message.into())).await;
    }

    async fn emit(&self, event: AdapterEvent) {
        if self.tx.send((self.platform, event)).await.is_err() {
            debug!(platform = %self.platform, "engine event channel closed, dropping event");
        }
    }
}

/// Credential bag handed to an adapter at `init`, sourced from the
/// settings store entry under the platform's `credential_ref`.
#[derive(Debug, Clone, Default)]
pub struct AdapterConfig {
    /// Credential key/value pairs (tokens, API ids, …).
    pub values: BTreeMap<String, String>,
}

impl AdapterConfig {
    /// Build a config from an iterator of key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        AdapterConfig {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up an optional credential.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Look up a required credential, failing with
    /// [`AdapterError::Config`] when absent or empty.
    pub fn require(&self, key: &str) -> Result<&str, AdapterError> {
        self.get(key)
            .ok_or_else(|| AdapterError::Config(format!("missing required credential '{key}'")))
    }
}

/// The polymorphic capability interface every platform integration
/// implements.
///
/// Lifecycle per adapter: uninitialized → initialized → {connecting →
/// connected → disconnected} | error, with error reachable from
/// connecting or connected. `disconnect` is valid from any state and
/// always lands on disconnected or is a no-op.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// The platform this adapter integrates.
    fn platform(&self) -> PlatformId;

    /// Store configuration and the event sink. Fails with
    /// [`AdapterError::Config`] if required credentials for this platform
    /// are absent.
    async fn init(&self, config: AdapterConfig, sink: EventSink) -> Result<(), AdapterError>;

    /// Establish a session. Reports `Connecting` through the sink before
    /// attempting and `Connected` or `Error` after. Failures are reported
    /// via the status callback and the returned error — never a panic
    /// across this boundary.
    async fn connect(&self) -> Result<(), AdapterError>;

    /// Tear down the session, reporting `Disconnected`. Idempotent:
    /// calling while not connected is a no-op success.
    async fn disconnect(&self) -> Result<(), AdapterError>;

    /// Send a message to a chat by its native id. All-or-nothing: either
    /// the platform accepts the full message plus attachments or the call
    /// fails with [`AdapterError::Send`].
    async fn send_message(
        &self,
        chat_native_id: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> Result<SendReceipt, AdapterError>;

    /// Mark a chat read on the platform.
    async fn mark_as_read(&self, chat_native_id: &str) -> Result<(), AdapterError>;

    /// Add a reaction to a message. Fails with
    /// [`AdapterError::Unsupported`] if the platform has no reaction
    /// model; the engine treats that as non-fatal.
    async fn add_reaction(
        &self,
        chat_native_id: &str,
        message_native_id: &str,
        emoji: &str,
    ) -> Result<(), AdapterError>;

    /// Remove a reaction from a message. Same `Unsupported` semantics as
    /// [`PlatformAdapter::add_reaction`].
    async fn remove_reaction(
        &self,
        chat_native_id: &str,
        message_native_id: &str,
        emoji: &str,
    ) -> Result<(), AdapterError>;
}

/// Registry mapping platform id → adapter instance, chosen at startup.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<PlatformId, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own platform id, replacing any
    /// previous registration.
    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    /// Look up the adapter for a platform.
    pub fn get(&self, platform: PlatformId) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    /// Platforms with a registered adapter.
    pub fn platforms(&self) -> Vec<PlatformId> {
        let mut ids: Vec<PlatformId> = self.adapters.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("platforms", &self.platforms())
            .finish()
    }
}
