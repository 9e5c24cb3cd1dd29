//! Optimistic two-phase send and its failure path.

use std::sync::Arc;

use chrono::Utc;

use unichat::engine::{EngineError, EngineUpdate};
use unichat::types::{
    ChatEvent, ChatId, MessageEvent, MessageStatus, PlatformId, SELF_USER_ID,
};

use super::support::{engine_with, wait_for, Script, ScriptedAdapter};

async fn announced_chat(
    adapter: &ScriptedAdapter,
    engine: &unichat::engine::AggregationEngine,
) -> ChatId {
    let mut updates = engine.subscribe();
    adapter
        .sink()
        .chat(ChatEvent {
            native_id: "tg-1".to_string(),
            name: Some("Chat".to_string()),
            ..ChatEvent::default()
        })
        .await;
    wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::ChatUpdated(c) if c.native_id == "tg-1")
    })
    .await;
    engine.chats().await[0].id
}

#[tokio::test]
async fn send_reconciles_the_provisional_message_in_place() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let chat_id = announced_chat(&telegram, &engine).await;

    let mut updates = engine.subscribe();
    let sent = engine
        .send_message(chat_id, "hello there", Vec::new())
        .await
        .expect("send should succeed");

    // Subscribers saw the provisional Sending message first.
    let provisional = wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::MessageUpdated(m) if m.status == MessageStatus::Sending)
    })
    .await;
    if let EngineUpdate::MessageUpdated(m) = provisional {
        assert!(m.native_id.starts_with("local-"));
        assert_eq!(m.id, sent.id);
        assert_eq!(m.sender_id, SELF_USER_ID);
    }

    assert_eq!(sent.status, MessageStatus::Sent);
    assert!(sent.native_id.starts_with("telegram-srv-"));

    let messages = engine.messages(chat_id).await.expect("chat exists");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, sent.id);

    let chats = engine.chats().await;
    assert_eq!(
        chats[0].last_message.as_ref().map(|m| m.text.as_str()),
        Some("hello there")
    );
    // Sending to yourself is not unread.
    assert_eq!(chats[0].unread_count, 0);
}

#[tokio::test]
async fn failed_send_keeps_the_message_in_error_status() {
    let telegram = ScriptedAdapter::new(
        PlatformId::Telegram,
        Script {
            fail_send: true,
            ..Script::default()
        },
    );
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let chat_id = announced_chat(&telegram, &engine).await;

    let result = engine.send_message(chat_id, "doomed", Vec::new()).await;
    assert!(matches!(
        result,
        Err(EngineError::Adapter {
            platform: PlatformId::Telegram,
            ..
        })
    ));

    // The optimistic message survives for retry, under its provisional id.
    let messages = engine.messages(chat_id).await.expect("chat exists");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].status, MessageStatus::Error);
    assert!(messages[0].native_id.starts_with("local-"));
}

#[tokio::test]
async fn send_to_unknown_chat_fails_fast() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");

    let result = engine.send_message(ChatId::new(), "to nowhere", Vec::new()).await;
    assert!(matches!(result, Err(EngineError::ChatNotFound(_))));
    assert!(!telegram.calls().iter().any(|c| c.starts_with("send:")));
}

#[tokio::test]
async fn platform_echo_of_a_sent_message_does_not_duplicate() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let chat_id = announced_chat(&telegram, &engine).await;

    let sent = engine
        .send_message(chat_id, "echoed", Vec::new())
        .await
        .expect("send should succeed");

    // The platform later pushes the same message back as an event.
    let mut updates = engine.subscribe();
    telegram
        .sink()
        .message(MessageEvent::text(
            "tg-1",
            &sent.native_id,
            SELF_USER_ID,
            "Me",
            "echoed",
            Utc::now(),
        ))
        .await;
    wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::MessageUpdated(m) if m.native_id == sent.native_id)
    })
    .await;

    let messages = engine.messages(chat_id).await.expect("chat exists");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, sent.id);
}

#[tokio::test]
async fn echo_arriving_before_the_receipt_is_absorbed() {
    let telegram = ScriptedAdapter::new(
        PlatformId::Telegram,
        Script {
            echo_before_receipt: true,
            ..Script::default()
        },
    );
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let chat_id = announced_chat(&telegram, &engine).await;

    let sent = engine
        .send_message(chat_id, "raced", Vec::new())
        .await
        .expect("send should succeed");

    // The echoed copy and the reconciled provisional collapse into one
    // message holding the provisional internal id.
    let messages = engine.messages(chat_id).await.expect("chat exists");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, sent.id);
    assert_eq!(messages[0].native_id, sent.native_id);
    assert_eq!(messages[0].status, MessageStatus::Sent);
}
