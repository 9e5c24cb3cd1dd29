//! Adapter contract behavior of the simulation adapters: credential
//! validation, the connect/seed sequence, sends, and reaction support.
//!
//! Time-based tests run with a paused clock so the seed delays cost
//! nothing.

use std::time::Duration;

use tokio::sync::mpsc;

use unichat::adapter::{
    AdapterConfig, AdapterError, AdapterEvent, EventSink, PlatformAdapter,
};
use unichat::adapters::default_registry;
use unichat::adapters::{discord::DiscordAdapter, telegram::TelegramAdapter, whatsapp::WhatsAppAdapter};
use unichat::types::{ConnectionStatus, MessageStatus, PlatformId};

fn sink_pair(
    platform: PlatformId,
) -> (EventSink, mpsc::Receiver<(PlatformId, AdapterEvent)>) {
    let (tx, rx) = mpsc::channel(256);
    (EventSink::new(platform, tx), rx)
}

/// Drain events until the channel goes quiet for a paused-clock beat.
async fn drain(rx: &mut mpsc::Receiver<(PlatformId, AdapterEvent)>) -> Vec<AdapterEvent> {
    let mut events = Vec::new();
    while let Ok(Some((_, event))) =
        tokio::time::timeout(Duration::from_secs(10), rx.recv()).await
    {
        events.push(event);
        if events.len() > 200 {
            break;
        }
    }
    events
}

#[tokio::test]
async fn registry_covers_all_platforms() {
    let registry = default_registry();
    for platform in PlatformId::ALL {
        assert!(registry.get(platform).is_some(), "missing {platform}");
    }
}

#[tokio::test]
async fn telegram_rejects_missing_credentials() {
    let adapter = TelegramAdapter::new();
    let (sink, _rx) = sink_pair(PlatformId::Telegram);

    let result = adapter
        .init(AdapterConfig::from_pairs([("api_id", "12345")]), sink)
        .await;
    assert!(matches!(result, Err(AdapterError::Config(_))));
}

#[tokio::test]
async fn telegram_accepts_complete_credentials() {
    let adapter = TelegramAdapter::new();
    let (sink, _rx) = sink_pair(PlatformId::Telegram);

    adapter
        .init(
            AdapterConfig::from_pairs([("api_id", "12345"), ("api_hash", "abcdef")]),
            sink,
        )
        .await
        .expect("init should succeed");
}

#[tokio::test]
async fn discord_requires_a_token() {
    let adapter = DiscordAdapter::new();
    let (sink, _rx) = sink_pair(PlatformId::Discord);

    let result = adapter.init(AdapterConfig::default(), sink).await;
    assert!(matches!(result, Err(AdapterError::Config(_))));
}

#[tokio::test(start_paused = true)]
async fn whatsapp_connect_reports_status_and_seeds_chats() {
    let adapter = WhatsAppAdapter::new();
    let (sink, mut rx) = sink_pair(PlatformId::WhatsApp);

    // WhatsApp needs no credentials.
    adapter
        .init(AdapterConfig::default(), sink)
        .await
        .expect("init");
    adapter.connect().await.expect("connect");

    let events = drain(&mut rx).await;

    let statuses: Vec<ConnectionStatus> = events
        .iter()
        .filter_map(|e| match e {
            AdapterEvent::ConnectionStatus(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
    );

    let chats: Vec<&unichat::types::ChatEvent> = events
        .iter()
        .filter_map(|e| match e {
            AdapterEvent::Chat(c) => Some(c),
            _ => None,
        })
        .collect();
    assert_eq!(chats.len(), 5);
    assert!(chats.iter().any(|c| c.name.as_deref() == Some("John Doe")));

    let messages: Vec<&unichat::types::MessageEvent> = events
        .iter()
        .filter_map(|e| match e {
            AdapterEvent::Message(m) => Some(m),
            _ => None,
        })
        .collect();
    assert!(!messages.is_empty());
    // The scripted conversation lands in an announced chat.
    assert!(messages.iter().all(|m| m.chat_native_id == "wa-contact-1"));
}

#[tokio::test(start_paused = true)]
async fn disconnect_is_idempotent() {
    let adapter = WhatsAppAdapter::new();
    let (sink, mut rx) = sink_pair(PlatformId::WhatsApp);
    adapter
        .init(AdapterConfig::default(), sink)
        .await
        .expect("init");
    adapter.connect().await.expect("connect");

    adapter.disconnect().await.expect("first disconnect");
    adapter.disconnect().await.expect("second disconnect");

    let events = drain(&mut rx).await;
    let disconnects = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                AdapterEvent::ConnectionStatus(ConnectionStatus::Disconnected)
            )
        })
        .count();
    assert_eq!(disconnects, 1);
}

#[tokio::test(start_paused = true)]
async fn send_produces_a_platform_prefixed_receipt() {
    let adapter = WhatsAppAdapter::new();
    let (sink, _rx) = sink_pair(PlatformId::WhatsApp);
    adapter
        .init(AdapterConfig::default(), sink)
        .await
        .expect("init");

    let receipt = adapter
        .send_message("wa-contact-1", "hello", &[])
        .await
        .expect("send");
    assert!(receipt.native_id.starts_with("wa-msg-"));
    assert_eq!(receipt.status, MessageStatus::Sent);
}

#[tokio::test]
async fn send_before_init_is_rejected() {
    let adapter = WhatsAppAdapter::new();
    let result = adapter.send_message("wa-contact-1", "hello", &[]).await;
    assert!(matches!(result, Err(AdapterError::NotInitialized)));
}

#[tokio::test(start_paused = true)]
async fn whatsapp_has_no_reaction_model() {
    let adapter = WhatsAppAdapter::new();
    let (sink, _rx) = sink_pair(PlatformId::WhatsApp);
    adapter
        .init(AdapterConfig::default(), sink)
        .await
        .expect("init");

    let result = adapter.add_reaction("wa-contact-1", "wa-msg-1", "👍").await;
    assert!(matches!(result, Err(AdapterError::Unsupported(_))));
}

#[tokio::test(start_paused = true)]
async fn telegram_accepts_reactions() {
    let adapter = TelegramAdapter::new();
    let (sink, _rx) = sink_pair(PlatformId::Telegram);
    adapter
        .init(
            AdapterConfig::from_pairs([("api_id", "12345"), ("api_hash", "abcdef")]),
            sink,
        )
        .await
        .expect("init");

    adapter
        .add_reaction("tg-chat-3", "tg-msg-1", "👍")
        .await
        .expect("add reaction");
    adapter
        .remove_reaction("tg-chat-3", "tg-msg-1", "👍")
        .await
        .expect("remove reaction");
}
