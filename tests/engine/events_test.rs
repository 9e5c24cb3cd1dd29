//! Event loop behavior: dedup, merging, ordering, stub chats, unread
//! counts, and disabled-platform filtering.

use std::sync::Arc;

use chrono::{Duration, Utc};

use unichat::engine::EngineUpdate;
use unichat::types::{ChatEvent, ChatKind, MessageEvent, PlatformId, SELF_USER_ID};

use super::support::{engine_with, wait_for, ScriptedAdapter};

fn named_chat(native_id: &str, name: &str) -> ChatEvent {
    ChatEvent {
        native_id: native_id.to_string(),
        name: Some(name.to_string()),
        kind: Some(ChatKind::Group),
        ..ChatEvent::default()
    }
}

#[tokio::test]
async fn adapter_events_flow_into_the_unified_chat_list() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let mut updates = engine.subscribe();

    let sink = telegram.sink();
    sink.chat(named_chat("tg-1", "Morning Crew")).await;
    wait_for(&mut updates, |u| matches!(u, EngineUpdate::ChatUpdated(c) if c.name == "Morning Crew"))
        .await;

    let chats = engine.chats().await;
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].platform, PlatformId::Telegram);
    assert_eq!(chats[0].native_id, "tg-1");
    assert_eq!(chats[0].kind, ChatKind::Group);
}

#[tokio::test]
async fn repeated_chat_announcements_merge() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let mut updates = engine.subscribe();

    let sink = telegram.sink();
    sink.chat(named_chat("tg-1", "Old Name")).await;
    sink.chat(ChatEvent {
        native_id: "tg-1".to_string(),
        name: Some("New Name".to_string()),
        ..ChatEvent::default()
    })
    .await;
    wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::ChatUpdated(c) if c.name == "New Name")
    })
    .await;

    let chats = engine.chats().await;
    assert_eq!(chats.len(), 1);
    // The second event's absent fields left the first announcement intact.
    assert_eq!(chats[0].kind, ChatKind::Group);
}

#[tokio::test]
async fn message_for_unannounced_chat_creates_a_stub() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let mut updates = engine.subscribe();

    telegram
        .sink()
        .message(MessageEvent::text(
            "tg-ghost", "m-1", "u-1", "Ghost", "boo", Utc::now(),
        ))
        .await;
    wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::ChatUpdated(c) if c.native_id == "tg-ghost")
    })
    .await;

    let chats = engine.chats().await;
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].name, "tg-ghost");
    assert_eq!(chats[0].unread_count, 1);
    let messages = engine.messages(chats[0].id).await.expect("chat exists");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "boo");
}

#[tokio::test]
async fn duplicate_message_events_dedupe() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let mut updates = engine.subscribe();

    let sink = telegram.sink();
    sink.chat(named_chat("tg-1", "Chat")).await;
    let now = Utc::now();
    sink.message(MessageEvent::text("tg-1", "m-1", "u-1", "Alex", "hello", now))
        .await;
    sink.message(MessageEvent::text(
        "tg-1",
        "m-1",
        "u-1",
        "Alex",
        "hello (edited)",
        now,
    ))
    .await;
    wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::MessageUpdated(m) if m.text == "hello (edited)")
    })
    .await;

    let chats = engine.chats().await;
    let messages = engine.messages(chats[0].id).await.expect("chat exists");
    assert_eq!(messages.len(), 1);
    // The edit did not bump the unread count a second time.
    assert_eq!(chats[0].unread_count, 1);
}

#[tokio::test]
async fn messages_are_ordered_by_timestamp_not_arrival() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let mut updates = engine.subscribe();

    let sink = telegram.sink();
    sink.chat(named_chat("tg-1", "Chat")).await;
    let base = Utc::now();
    for (native, offset) in [("m-2", 20), ("m-1", 10), ("m-3", 30)] {
        sink.message(MessageEvent::text(
            "tg-1",
            native,
            "u-1",
            "Alex",
            native,
            base + Duration::seconds(offset),
        ))
        .await;
    }
    wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::MessageUpdated(m) if m.native_id == "m-3")
    })
    .await;

    let chats = engine.chats().await;
    let messages = engine.messages(chats[0].id).await.expect("chat exists");
    let order: Vec<&str> = messages.iter().map(|m| m.native_id.as_str()).collect();
    assert_eq!(order, vec!["m-1", "m-2", "m-3"]);
}

#[tokio::test]
async fn self_authored_messages_do_not_increment_unread() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let mut updates = engine.subscribe();

    let sink = telegram.sink();
    sink.chat(named_chat("tg-1", "Chat")).await;
    sink.message(MessageEvent::text(
        "tg-1",
        "m-1",
        SELF_USER_ID,
        "Me",
        "from my phone",
        Utc::now(),
    ))
    .await;
    wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::MessageUpdated(m) if m.native_id == "m-1")
    })
    .await;

    let chats = engine.chats().await;
    assert_eq!(chats[0].unread_count, 0);
}

#[tokio::test]
async fn updates_are_observable_as_a_stream() {
    use tokio_stream::StreamExt;

    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");

    let mut stream = engine.updates_stream();
    telegram.sink().chat(named_chat("tg-1", "Streamed")).await;

    let update = tokio::time::timeout(std::time::Duration::from_secs(5), stream.next())
        .await
        .expect("stream should yield")
        .expect("stream open")
        .expect("no lag");
    assert!(matches!(update, EngineUpdate::ChatUpdated(c) if c.name == "Streamed"));
}

#[tokio::test]
async fn events_from_a_disabled_platform_are_dropped() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let discord = ScriptedAdapter::well_behaved(PlatformId::Discord);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram), Arc::clone(&discord)]).await;
    engine.connect_all().await.expect("connect_all");
    let discord_sink = discord.sink();

    engine
        .update_platform_settings(PlatformId::Discord, false, None)
        .await
        .expect("settings update");

    // The stale sink still delivers, but the loop must drop the event.
    discord_sink
        .message(MessageEvent::text(
            "dc-1", "m-1", "u-1", "Late", "too late", Utc::now(),
        ))
        .await;

    // A telegram event after it proves the loop has drained the channel.
    let mut updates = engine.subscribe();
    telegram.sink().chat(named_chat("tg-1", "Canary")).await;
    wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::ChatUpdated(c) if c.name == "Canary")
    })
    .await;

    let chats = engine.chats().await;
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].platform, PlatformId::Telegram);
}
