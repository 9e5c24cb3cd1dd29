//! Mark-as-read, settings changes, and clear-all-data.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use unichat::engine::EngineUpdate;
use unichat::settings::SettingsStore;
use unichat::types::{ConnectionStatus, MessageEvent, PlatformId};

use super::support::{engine_with, wait_for, ScriptedAdapter};

#[tokio::test]
async fn mark_as_read_zeroes_unread_and_reaches_the_platform() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");

    let mut updates = engine.subscribe();
    let sink = telegram.sink();
    for native in ["m-1", "m-2", "m-3"] {
        sink.message(MessageEvent::text(
            "tg-1", native, "u-1", "Alex", "ping", Utc::now(),
        ))
        .await;
    }
    wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::MessageUpdated(m) if m.native_id == "m-3")
    })
    .await;

    let chat = engine.chats().await.remove(0);
    assert_eq!(chat.unread_count, 3);

    engine
        .mark_chat_as_read(chat.id)
        .await
        .expect("mark as read");

    assert_eq!(engine.chats().await[0].unread_count, 0);
    assert!(telegram.calls().contains(&"mark_read:tg-1".to_string()));
}

#[tokio::test]
async fn disabling_a_platform_disconnects_and_persists() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");

    engine
        .update_platform_settings(PlatformId::Telegram, false, None)
        .await
        .expect("settings update");

    assert_eq!(
        engine.connection_statuses().await.get(&PlatformId::Telegram),
        Some(&ConnectionStatus::Disabled)
    );
    assert!(telegram.calls().contains(&"disconnect".to_string()));

    let persisted = store.get_user_settings().expect("settings load");
    assert!(!persisted.is_enabled(PlatformId::Telegram));
}

#[tokio::test]
async fn enabling_with_credentials_writes_the_auth_entry() {
    let slack = ScriptedAdapter::well_behaved(PlatformId::Slack);
    let (engine, store) = engine_with(&[Arc::clone(&slack)]).await;

    let creds = BTreeMap::from([("token".to_string(), "xoxb-99".to_string())]);
    engine
        .update_platform_settings(PlatformId::Slack, true, Some(creds.clone()))
        .await
        .expect("settings update");

    assert_eq!(
        store.get_platform_auth(PlatformId::Slack).expect("auth load"),
        creds
    );

    // An empty credential map clears the entry.
    engine
        .update_platform_settings(PlatformId::Slack, true, Some(BTreeMap::new()))
        .await
        .expect("settings update");
    assert!(store
        .get_platform_auth(PlatformId::Slack)
        .expect("auth load")
        .is_empty());
}

#[tokio::test]
async fn clear_all_data_drops_state_but_keeps_settings() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");

    let mut updates = engine.subscribe();
    telegram
        .sink()
        .message(MessageEvent::text(
            "tg-1", "m-1", "u-1", "Alex", "ping", Utc::now(),
        ))
        .await;
    wait_for(&mut updates, |u| matches!(u, EngineUpdate::MessageUpdated(_))).await;
    assert_eq!(engine.chats().await.len(), 1);

    engine.clear_all_data().await;

    assert!(engine.chats().await.is_empty());
    assert_eq!(
        engine.connection_statuses().await.get(&PlatformId::Telegram),
        Some(&ConnectionStatus::Disconnected)
    );
    // Persisted settings are untouched.
    assert!(store
        .get_user_settings()
        .expect("settings load")
        .is_enabled(PlatformId::Telegram));

    // A fresh event after the wipe allocates a brand new chat identity.
    engine.connect_all().await.expect("reconnect");
    let mut updates = engine.subscribe();
    telegram
        .sink()
        .message(MessageEvent::text(
            "tg-1", "m-1", "u-1", "Alex", "again", Utc::now(),
        ))
        .await;
    wait_for(&mut updates, |u| matches!(u, EngineUpdate::MessageUpdated(_))).await;
    assert_eq!(engine.chats().await.len(), 1);
}
