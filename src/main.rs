#![allow(missing_docs)]

//! Unichat — unified messaging aggregation engine.
//!
//! Single binary that connects the enabled platform adapters, consumes
//! their normalized events through the aggregation engine, and logs the
//! resulting unified state changes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use unichat::adapters::default_registry;
use unichat::config::UnichatConfig;
use unichat::engine::{AggregationEngine, EngineUpdate};
use unichat::notify::LogNotifier;
use unichat::settings::{JsonFileStore, SettingsStore};
use unichat::types::PlatformId;

#[derive(Parser)]
#[command(name = "unichat", version, about = "Unified messaging aggregation engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Connect enabled platforms and run the aggregation loop.
    Start,
    /// Inspect or change platform settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings and enabled platforms.
    Show,
    /// Enable a platform, optionally storing credentials.
    Enable {
        /// Platform id (whatsapp, telegram, discord, slack, messenger).
        platform: PlatformId,
        /// Credential as `key=value`, repeatable (e.g. `--cred token=abc`).
        #[arg(long = "cred", value_name = "KEY=VALUE")]
        credentials: Vec<String>,
    },
    /// Disable a platform.
    Disable {
        /// Platform id.
        platform: PlatformId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; ignore absence.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = UnichatConfig::load().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Start) {
        Command::Start => run_start(&config).await,
        Command::Settings { action } => {
            unichat::logging::init_cli(&config.engine.log_level);
            run_settings(&config, action).await
        }
    }
}

/// Run the aggregation loop until SIGINT, then shut down gracefully.
async fn run_start(config: &UnichatConfig) -> Result<()> {
    let _logging_guard = unichat::logging::init_production(
        &PathBuf::from(&config.paths.logs_dir),
        &config.engine.log_level,
    )?;

    info!(version = env!("CARGO_PKG_VERSION"), "unichat starting");

    let store: Arc<dyn SettingsStore> = Arc::new(JsonFileStore::new(config.settings_path()));
    let settings = store
        .get_user_settings()
        .context("failed to load user settings")?;
    let engine = AggregationEngine::with_event_buffer(
        default_registry(),
        Arc::clone(&store),
        Arc::new(LogNotifier),
        config.engine.channel_buffer_size,
    );

    let mut updates = engine.subscribe();
    engine.initialize(&settings).await;
    engine.connect_all().await?;

    info!("unichat ready -- aggregating events");

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(update) => log_update(&update),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "update subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("received shutdown signal, initiating graceful shutdown");
                break;
            }
        }
    }

    let timeout = Duration::from_secs(config.engine.shutdown_timeout_seconds);
    if tokio::time::timeout(timeout, engine.disconnect_all())
        .await
        .is_err()
    {
        warn!(timeout_secs = timeout.as_secs(), "disconnect timed out, aborting");
    }
    engine.shutdown().await;

    info!("unichat shut down cleanly");
    Ok(())
}

/// One-shot settings subcommands.
async fn run_settings(config: &UnichatConfig, action: SettingsAction) -> Result<()> {
    let store: Arc<dyn SettingsStore> = Arc::new(JsonFileStore::new(config.settings_path()));

    match action {
        SettingsAction::Show => {
            let settings = store
                .get_user_settings()
                .context("failed to load user settings")?;
            println!("user: {}", settings.user.name);
            for platform in PlatformId::ALL {
                let enabled = settings.is_enabled(platform);
                let auth = store.get_platform_auth(platform)?;
                println!(
                    "{:<12} enabled={enabled} credentials={}",
                    platform.as_str(),
                    auth.len()
                );
            }
            Ok(())
        }
        SettingsAction::Enable {
            platform,
            credentials,
        } => {
            let credentials = parse_credentials(&credentials)?;
            apply_platform_change(&store, platform, true, Some(credentials)).await?;
            println!("{} enabled", platform.display_name());
            Ok(())
        }
        SettingsAction::Disable { platform } => {
            apply_platform_change(&store, platform, false, None).await?;
            println!("{} disabled", platform.display_name());
            Ok(())
        }
    }
}

/// Route a settings change through the engine so persistence and roster
/// state stay in step.
async fn apply_platform_change(
    store: &Arc<dyn SettingsStore>,
    platform: PlatformId,
    enabled: bool,
    credentials: Option<BTreeMap<String, String>>,
) -> Result<()> {
    let settings = store
        .get_user_settings()
        .context("failed to load user settings")?;
    let engine = AggregationEngine::new(
        default_registry(),
        Arc::clone(store),
        Arc::new(unichat::notify::NullNotifier),
    );
    engine.initialize(&settings).await;
    engine
        .update_platform_settings(platform, enabled, credentials)
        .await
        .context("failed to update platform settings")?;
    engine.shutdown().await;
    Ok(())
}

fn parse_credentials(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| anyhow::anyhow!("invalid credential '{pair}', expected KEY=VALUE"))
        })
        .collect()
}

fn log_update(update: &EngineUpdate) {
    match update {
        EngineUpdate::ChatUpdated(chat) => {
            info!(
                platform = %chat.platform,
                chat = %chat.name,
                unread = chat.unread_count,
                "chat updated"
            );
        }
        EngineUpdate::MessageUpdated(message) => {
            info!(
                platform = %message.platform,
                sender = %message.sender_name,
                status = ?message.status,
                "message updated"
            );
        }
        EngineUpdate::ConnectionChanged { platform, status } => {
            info!(%platform, %status, "connection changed");
        }
        EngineUpdate::ErrorReported { platform, message } => {
            warn!(platform = ?platform, error = %message, "platform error");
        }
        EngineUpdate::StateReset => info!("state reset"),
    }
}
