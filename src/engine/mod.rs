//! Aggregation engine: consumes normalized adapter events, owns all
//! unified state, and exposes the command surface the rest of the
//! program drives.
//!
//! Concurrency model: adapters push events over one bounded mpsc channel
//! consumed by a single spawned task, and every state mutation (event or
//! command) happens while holding one state mutex. Subscribers observe
//! changes through a broadcast channel and never touch state directly.

mod state;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapter::{
    AdapterConfig, AdapterError, AdapterEvent, AdapterRegistry, EventSink, PlatformAdapter,
};
use crate::notify::Notifier;
use crate::settings::{SettingsError, SettingsStore, UserSettings};
use crate::types::{
    Attachment, Chat, ChatId, ConnectionStatus, Message, MessageId, PlatformDescriptor,
    PlatformId, StatusMap, SELF_USER_ID,
};

use state::EngineState;

/// Default capacity of the adapter event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Default capacity of the update broadcast channel.
pub const DEFAULT_UPDATE_BUFFER: usize = 512;

/// Errors surfaced by engine commands.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine has not been initialized from settings yet.
    #[error("engine not initialized")]
    NotInitialized,
    /// No chat with this internal id exists.
    #[error("chat not found: {0}")]
    ChatNotFound(ChatId),
    /// No message with this internal id exists.
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),
    /// No adapter is registered for the platform.
    #[error("no adapter registered for {0}")]
    AdapterMissing(PlatformId),
    /// An adapter rejected a command.
    #[error("{platform} adapter error")]
    Adapter {
        /// Platform whose adapter failed.
        platform: PlatformId,
        /// The underlying adapter error.
        #[source]
        source: AdapterError,
    },
    /// The settings store failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// A state-change notification broadcast to subscribers.
#[derive(Debug, Clone)]
pub enum EngineUpdate {
    /// A chat was created or changed.
    ChatUpdated(Chat),
    /// A message was inserted or changed.
    MessageUpdated(Message),
    /// A platform's connection status changed.
    ConnectionChanged {
        /// Platform whose status changed.
        platform: PlatformId,
        /// The new status.
        status: ConnectionStatus,
    },
    /// A non-fatal error to surface to the user.
    ErrorReported {
        /// Originating platform, when attributable.
        platform: Option<PlatformId>,
        /// Human-readable description.
        message: String,
    },
    /// All aggregated data was dropped (initialization or clear-all).
    StateReset,
}

/// The aggregation engine. Cheap to share via [`Arc`].
pub struct AggregationEngine {
    state: Arc<Mutex<EngineState>>,
    registry: AdapterRegistry,
    settings: Arc<dyn SettingsStore>,
    events_tx: mpsc::Sender<(PlatformId, AdapterEvent)>,
    updates_tx: broadcast::Sender<EngineUpdate>,
    send_locks: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl AggregationEngine {
    /// Create an engine over the given adapters and collaborators, and
    /// spawn its event loop.
    pub fn new(
        registry: AdapterRegistry,
        settings: Arc<dyn SettingsStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Self::with_event_buffer(registry, settings, notifier, DEFAULT_EVENT_BUFFER)
    }

    /// Like [`AggregationEngine::new`], with an explicit adapter event
    /// channel capacity. A zero capacity is clamped to one.
    pub fn with_event_buffer(
        registry: AdapterRegistry,
        settings: Arc<dyn SettingsStore>,
        notifier: Arc<dyn Notifier>,
        event_buffer: usize,
    ) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::channel(event_buffer.max(1));
        let (updates_tx, _) = broadcast::channel(DEFAULT_UPDATE_BUFFER);
        let state = Arc::new(Mutex::new(EngineState::default()));

        let handle = tokio::spawn(run_event_loop(
            events_rx,
            Arc::clone(&state),
            updates_tx.clone(),
            notifier,
        ));

        Arc::new(Self {
            state,
            registry,
            settings,
            events_tx,
            updates_tx,
            send_locks: Mutex::new(HashMap::new()),
            event_loop: Mutex::new(Some(handle)),
        })
    }

    /// Subscribe to state-change broadcasts.
    ///
    /// A slow subscriber that lags past the channel capacity misses
    /// updates rather than blocking the engine.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineUpdate> {
        self.updates_tx.subscribe()
    }

    /// Subscribe as a [`Stream`](tokio_stream::Stream), for consumers
    /// that compose updates with other streams.
    pub fn updates_stream(&self) -> tokio_stream::wrappers::BroadcastStream<EngineUpdate> {
        tokio_stream::wrappers::BroadcastStream::new(self.subscribe())
    }

    /// Build the platform roster from persisted settings and drop any
    /// previously aggregated data.
    pub async fn initialize(&self, settings: &UserSettings) {
        self.state.lock().await.reset_with(settings);
        self.send_locks.lock().await.clear();
        self.broadcast(EngineUpdate::StateReset);
        info!(user = %settings.user.name, "engine initialized");
    }

    /// Connect every enabled platform, sequentially and isolated: one
    /// platform's failure surfaces as its `Error` status plus an error
    /// report and never aborts the remaining platforms.
    pub async fn connect_all(&self) -> Result<(), EngineError> {
        let roster: Vec<PlatformDescriptor> = {
            let state = self.state.lock().await;
            if !state.initialized {
                return Err(EngineError::NotInitialized);
            }
            state.platforms.clone()
        };
        let user_settings = self.settings.get_user_settings()?;

        for descriptor in roster.iter().filter(|p| p.enabled) {
            let platform = descriptor.id;
            let Some(adapter) = self.registry.get(platform) else {
                warn!(%platform, "no adapter registered, skipping");
                self.set_status(platform, ConnectionStatus::Error).await;
                self.broadcast(EngineUpdate::ErrorReported {
                    platform: Some(platform),
                    message: format!("no adapter registered for {}", descriptor.display_name),
                });
                continue;
            };

            self.set_status(platform, ConnectionStatus::Connecting)
                .await;
            let config = match self.adapter_config(platform, &user_settings) {
                Ok(config) => config,
                Err(e) => {
                    warn!(%platform, error = %e, "stored credentials unreadable");
                    self.set_status(platform, ConnectionStatus::Error).await;
                    self.broadcast(EngineUpdate::ErrorReported {
                        platform: Some(platform),
                        message: format!(
                            "stored credentials for {} are unreadable: {e}",
                            descriptor.display_name
                        ),
                    });
                    continue;
                }
            };
            let sink = EventSink::new(platform, self.events_tx.clone());

            match connect_one(adapter.as_ref(), config, sink).await {
                Ok(()) => {
                    self.set_status(platform, ConnectionStatus::Connected)
                        .await;
                    info!(%platform, "connected");
                }
                Err(e) => {
                    warn!(%platform, error = %e, "connect failed");
                    self.set_status(platform, ConnectionStatus::Error).await;
                    self.broadcast(EngineUpdate::ErrorReported {
                        platform: Some(platform),
                        message: format!(
                            "failed to connect to {}: {e}",
                            descriptor.display_name
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Disconnect every connected platform. Adapter-side failures are
    /// logged, never surfaced.
    pub async fn disconnect_all(&self) {
        let roster: Vec<PlatformDescriptor> = self.state.lock().await.platforms.clone();
        for descriptor in roster.iter().filter(|p| p.enabled) {
            let platform = descriptor.id;
            if let Some(adapter) = self.registry.get(platform) {
                if let Err(e) = adapter.disconnect().await {
                    warn!(%platform, error = %e, "disconnect failed");
                }
            }
            self.set_status(platform, ConnectionStatus::Disconnected)
                .await;
        }
    }

    /// Send a message to a chat.
    ///
    /// Two-phase optimistic: a provisional message in `Sending` status
    /// appears immediately (and is broadcast), then the adapter receipt
    /// reconciles it in place under the same internal id. On dispatch
    /// failure the message is kept in `Error` status and the error is
    /// returned. Sends within one chat are serialized; different chats
    /// proceed concurrently.
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<Message, EngineError> {
        let chat_lock = self.send_lock(chat_id).await;
        let _guard = chat_lock.lock().await;

        let (platform, chat_native_id, provisional) = {
            let mut state = self.state.lock().await;
            let chat = state
                .chat(chat_id)
                .ok_or(EngineError::ChatNotFound(chat_id))?;
            let platform = chat.platform;
            let chat_native_id = chat.native_id.clone();
            if self.registry.get(platform).is_none() {
                return Err(EngineError::AdapterMissing(platform));
            }
            let provisional = state.begin_send(chat_id, text, attachments.clone())?;
            (platform, chat_native_id, provisional)
        };
        self.broadcast(EngineUpdate::MessageUpdated(provisional.clone()));

        let adapter = self
            .registry
            .get(platform)
            .ok_or(EngineError::AdapterMissing(platform))?;
        match adapter
            .send_message(&chat_native_id, text, &attachments)
            .await
        {
            Ok(receipt) => {
                let (message, chat) = {
                    let mut state = self.state.lock().await;
                    state.complete_send(chat_id, provisional.id, &receipt)?
                };
                self.broadcast(EngineUpdate::MessageUpdated(message.clone()));
                self.broadcast(EngineUpdate::ChatUpdated(chat));
                Ok(message)
            }
            Err(e) => {
                let failed = {
                    let mut state = self.state.lock().await;
                    state.fail_send(chat_id, provisional.id)?
                };
                self.broadcast(EngineUpdate::MessageUpdated(failed));
                Err(EngineError::Adapter {
                    platform,
                    source: e,
                })
            }
        }
    }

    /// Zero a chat's unread count, optimistically, then tell the
    /// platform. An adapter-side failure is logged and the optimistic
    /// zero stands.
    pub async fn mark_chat_as_read(&self, chat_id: ChatId) -> Result<(), EngineError> {
        let (platform, chat_native_id, chat) = {
            let mut state = self.state.lock().await;
            let chat = state.mark_read(chat_id)?;
            (chat.platform, chat.native_id.clone(), chat)
        };
        self.broadcast(EngineUpdate::ChatUpdated(chat));

        if let Some(adapter) = self.registry.get(platform) {
            if let Err(e) = adapter.mark_as_read(&chat_native_id).await {
                warn!(%platform, chat = %chat_native_id, error = %e, "mark-as-read failed on platform");
            }
        }
        Ok(())
    }

    /// Toggle the local user's reaction on a message: adds it when
    /// absent, removes it when already present.
    ///
    /// The local mutation is applied and broadcast first and is never
    /// reverted. [`AdapterError::Unsupported`] is swallowed; any other
    /// adapter error is surfaced in the returned error.
    pub async fn add_reaction(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<(), EngineError> {
        let (platform, chat_native_id, message, added) = {
            let mut state = self.state.lock().await;
            let chat = state
                .chat(chat_id)
                .ok_or(EngineError::ChatNotFound(chat_id))?;
            let platform = chat.platform;
            let chat_native_id = chat.native_id.clone();
            let (message, added) = state.toggle_self_reaction(chat_id, message_id, emoji)?;
            (platform, chat_native_id, message, added)
        };
        let native_id = message.native_id.clone();
        self.broadcast(EngineUpdate::MessageUpdated(message));

        let result = match self.registry.get(platform) {
            Some(adapter) if added => {
                adapter
                    .add_reaction(&chat_native_id, &native_id, emoji)
                    .await
            }
            Some(adapter) => {
                adapter
                    .remove_reaction(&chat_native_id, &native_id, emoji)
                    .await
            }
            None => Ok(()),
        };
        self.settle_reaction(platform, result)
    }

    /// Remove the local user's reaction from a message, if present.
    /// Same adapter error policy as [`AggregationEngine::add_reaction`].
    pub async fn remove_reaction(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<(), EngineError> {
        let (platform, chat_native_id, message) = {
            let mut state = self.state.lock().await;
            let chat = state
                .chat(chat_id)
                .ok_or(EngineError::ChatNotFound(chat_id))?;
            let platform = chat.platform;
            let chat_native_id = chat.native_id.clone();
            let message = state.remove_self_reaction(chat_id, message_id, emoji)?;
            (platform, chat_native_id, message)
        };
        let native_id = message.native_id.clone();
        self.broadcast(EngineUpdate::MessageUpdated(message));

        let result = match self.registry.get(platform) {
            Some(adapter) => {
                adapter
                    .remove_reaction(&chat_native_id, &native_id, emoji)
                    .await
            }
            None => Ok(()),
        };
        self.settle_reaction(platform, result)
    }

    /// Enable or disable a platform and persist the change.
    ///
    /// `credentials` of `Some` replaces the stored auth entry (an empty
    /// map clears it); `None` leaves stored auth untouched. Disabling a
    /// connected platform disconnects it.
    pub async fn update_platform_settings(
        &self,
        platform: PlatformId,
        enabled: bool,
        credentials: Option<BTreeMap<String, String>>,
    ) -> Result<(), EngineError> {
        let mut user_settings = self.settings.get_user_settings()?;
        user_settings
            .platforms
            .entry(platform.as_str().to_string())
            .or_default()
            .enabled = enabled;
        self.settings.save_user_settings(&user_settings)?;

        if let Some(auth) = credentials {
            if auth.is_empty() {
                self.settings.clear_platform_auth(platform)?;
            } else {
                self.settings.save_platform_auth(platform, &auth)?;
            }
        }

        if !enabled {
            if let Some(adapter) = self.registry.get(platform) {
                if let Err(e) = adapter.disconnect().await {
                    warn!(%platform, error = %e, "disconnect on disable failed");
                }
            }
        }

        let status = self.state.lock().await.set_enabled(platform, enabled);
        self.broadcast(EngineUpdate::ConnectionChanged { platform, status });
        Ok(())
    }

    /// Disconnect everything and drop all aggregated data. The roster
    /// and persisted settings survive.
    pub async fn clear_all_data(&self) {
        self.disconnect_all().await;
        self.state.lock().await.clear_data();
        self.send_locks.lock().await.clear();
        self.broadcast(EngineUpdate::StateReset);
        info!("all aggregated data cleared");
    }

    /// Snapshot of all chats, most recently touched first.
    pub async fn chats(&self) -> Vec<Chat> {
        self.state.lock().await.chats_snapshot()
    }

    /// Snapshot of one chat's messages, sorted ascending by timestamp.
    pub async fn messages(&self, chat_id: ChatId) -> Result<Vec<Message>, EngineError> {
        self.state.lock().await.messages_snapshot(chat_id)
    }

    /// Snapshot of per-platform connection statuses.
    pub async fn connection_statuses(&self) -> StatusMap {
        self.state.lock().await.connection.clone()
    }

    /// Snapshot of the platform roster.
    pub async fn platforms(&self) -> Vec<PlatformDescriptor> {
        self.state.lock().await.platforms.clone()
    }

    /// Stop the event loop. Used at shutdown after
    /// [`AggregationEngine::disconnect_all`].
    pub async fn shutdown(&self) {
        if let Some(handle) = self.event_loop.lock().await.take() {
            handle.abort();
        }
    }

    fn adapter_config(
        &self,
        platform: PlatformId,
        user_settings: &UserSettings,
    ) -> Result<AdapterConfig, EngineError> {
        // Inline setup credentials first, the dedicated auth entry wins.
        let mut values: BTreeMap<String, String> = user_settings
            .platform(platform)
            .map(|p| p.credentials.clone())
            .unwrap_or_default();
        values.extend(self.settings.get_platform_auth(platform)?);
        Ok(AdapterConfig { values })
    }

    fn settle_reaction(
        &self,
        platform: PlatformId,
        result: Result<(), AdapterError>,
    ) -> Result<(), EngineError> {
        match result {
            Ok(()) => Ok(()),
            Err(AdapterError::Unsupported(what)) => {
                debug!(%platform, what, "reaction not supported, local state kept");
                Ok(())
            }
            Err(e) => {
                warn!(%platform, error = %e, "reaction failed on platform, local state kept");
                self.broadcast(EngineUpdate::ErrorReported {
                    platform: Some(platform),
                    message: format!("reaction failed on {}: {e}", platform.display_name()),
                });
                Err(EngineError::Adapter {
                    platform,
                    source: e,
                })
            }
        }
    }

    async fn send_lock(&self, chat_id: ChatId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.send_locks
                .lock()
                .await
                .entry(chat_id)
                .or_default(),
        )
    }

    async fn set_status(&self, platform: PlatformId, status: ConnectionStatus) {
        self.state.lock().await.set_status(platform, status);
        self.broadcast(EngineUpdate::ConnectionChanged { platform, status });
    }

    fn broadcast(&self, update: EngineUpdate) {
        // Err means no subscribers, which is fine.
        let _ = self.updates_tx.send(update);
    }
}

impl std::fmt::Debug for AggregationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationEngine")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

async fn connect_one(
    adapter: &dyn PlatformAdapter,
    config: AdapterConfig,
    sink: EventSink,
) -> Result<(), AdapterError> {
    adapter.init(config, sink).await?;
    adapter.connect().await
}

/// The single consumer of the adapter event channel.
///
/// Ends when the engine (the last sender) is dropped or aborted at
/// shutdown.
async fn run_event_loop(
    mut events_rx: mpsc::Receiver<(PlatformId, AdapterEvent)>,
    state: Arc<Mutex<EngineState>>,
    updates_tx: broadcast::Sender<EngineUpdate>,
    notifier: Arc<dyn Notifier>,
) {
    while let Some((platform, event)) = events_rx.recv().await {
        let mut guard = state.lock().await;
        if !guard.platform_enabled(platform) {
            debug!(%platform, "dropping event from disabled platform");
            continue;
        }
        match event {
            AdapterEvent::Chat(chat_event) => {
                let chat = guard.apply_chat_event(platform, chat_event);
                drop(guard);
                let _ = updates_tx.send(EngineUpdate::ChatUpdated(chat));
            }
            AdapterEvent::Message(message_event) => {
                let applied = guard.apply_message_event(platform, message_event);
                drop(guard);
                if applied.inserted && applied.message.sender_id != SELF_USER_ID {
                    notifier.notify(&applied.chat.name, &applied.message.text);
                }
                let _ = updates_tx.send(EngineUpdate::MessageUpdated(applied.message));
                let _ = updates_tx.send(EngineUpdate::ChatUpdated(applied.chat));
            }
            AdapterEvent::ConnectionStatus(status) => {
                guard.set_status(platform, status);
                drop(guard);
                let _ = updates_tx.send(EngineUpdate::ConnectionChanged { platform, status });
            }
            AdapterEvent::Error(message) => {
                drop(guard);
                warn!(%platform, error = %message, "adapter reported an error");
                let _ = updates_tx.send(EngineUpdate::ErrorReported {
                    platform: Some(platform),
                    message,
                });
            }
        }
    }
    debug!("event loop finished");
}
