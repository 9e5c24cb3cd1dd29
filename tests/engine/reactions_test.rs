//! Reaction semantics: self-toggle, unsupported platforms, and adapter
//! failures that leave the local mutation standing.

use std::sync::Arc;

use chrono::Utc;

use unichat::engine::{AggregationEngine, EngineError, EngineUpdate};
use unichat::types::{ChatId, MessageEvent, MessageId, PlatformId, SELF_USER_ID};

use super::support::{engine_with, wait_for, Script, ScriptedAdapter};

async fn seeded_message(
    adapter: &ScriptedAdapter,
    engine: &AggregationEngine,
) -> (ChatId, MessageId) {
    let mut updates = engine.subscribe();
    adapter
        .sink()
        .message(MessageEvent::text(
            "chat-1", "m-1", "u-1", "Alex", "react to me", Utc::now(),
        ))
        .await;
    wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::MessageUpdated(m) if m.native_id == "m-1")
    })
    .await;
    let chat_id = engine.chats().await[0].id;
    let message_id = engine.messages(chat_id).await.expect("chat exists")[0].id;
    (chat_id, message_id)
}

#[tokio::test]
async fn adding_twice_toggles_the_reaction_off() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let (chat_id, message_id) = seeded_message(&telegram, &engine).await;

    engine
        .add_reaction(chat_id, message_id, "👍")
        .await
        .expect("first add");
    let messages = engine.messages(chat_id).await.expect("chat exists");
    assert_eq!(messages[0].reactions.len(), 1);
    assert_eq!(messages[0].reactions[0].user_id, SELF_USER_ID);
    assert_eq!(messages[0].reactions[0].username, "Tester");

    engine
        .add_reaction(chat_id, message_id, "👍")
        .await
        .expect("second add toggles off");
    let messages = engine.messages(chat_id).await.expect("chat exists");
    assert!(messages[0].reactions.is_empty());

    // The platform saw an add followed by a remove.
    let reaction_calls: Vec<String> = telegram
        .calls()
        .into_iter()
        .filter(|c| c.contains("reaction"))
        .collect();
    assert_eq!(
        reaction_calls,
        vec!["add_reaction:m-1:👍", "remove_reaction:m-1:👍"]
    );
}

#[tokio::test]
async fn unsupported_reactions_still_apply_locally() {
    let whatsapp = ScriptedAdapter::new(
        PlatformId::WhatsApp,
        Script {
            unsupported_reactions: true,
            ..Script::default()
        },
    );
    let (engine, _store) = engine_with(&[Arc::clone(&whatsapp)]).await;
    engine.connect_all().await.expect("connect_all");
    let (chat_id, message_id) = seeded_message(&whatsapp, &engine).await;

    // Unsupported is swallowed, not surfaced.
    engine
        .add_reaction(chat_id, message_id, "❤️")
        .await
        .expect("unsupported should not be an error");

    let messages = engine.messages(chat_id).await.expect("chat exists");
    assert_eq!(messages[0].reactions.len(), 1);
}

#[tokio::test]
async fn remove_reaction_only_touches_the_local_users_entry() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");

    let mut updates = engine.subscribe();
    let mut event = MessageEvent::text("chat-1", "m-1", "u-1", "Alex", "hi", Utc::now());
    event.reactions.push(unichat::types::Reaction {
        emoji: "👍".to_string(),
        user_id: "u-2".to_string(),
        username: "Sam".to_string(),
    });
    telegram.sink().message(event).await;
    wait_for(&mut updates, |u| {
        matches!(u, EngineUpdate::MessageUpdated(m) if m.native_id == "m-1")
    })
    .await;
    let chat_id = engine.chats().await[0].id;
    let message_id = engine.messages(chat_id).await.expect("chat exists")[0].id;

    engine
        .add_reaction(chat_id, message_id, "👍")
        .await
        .expect("add");
    engine
        .remove_reaction(chat_id, message_id, "👍")
        .await
        .expect("remove");

    let messages = engine.messages(chat_id).await.expect("chat exists");
    assert_eq!(messages[0].reactions.len(), 1);
    assert_eq!(messages[0].reactions[0].user_id, "u-2");
}

#[tokio::test]
async fn unknown_message_is_an_error() {
    let telegram = ScriptedAdapter::well_behaved(PlatformId::Telegram);
    let (engine, _store) = engine_with(&[Arc::clone(&telegram)]).await;
    engine.connect_all().await.expect("connect_all");
    let (chat_id, _) = seeded_message(&telegram, &engine).await;

    let result = engine.add_reaction(chat_id, MessageId::new(), "👍").await;
    assert!(matches!(result, Err(EngineError::MessageNotFound(_))));
}
