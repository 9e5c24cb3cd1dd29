//! Simulation adapters — one per supported platform.
//!
//! No real protocol logic lives here: each adapter simulates session
//! establishment and seeds a small demo conversation, exercising the full
//! adapter contract (credential validation, status callbacks, sends,
//! reads, reactions) without any wire format.

pub mod discord;
pub mod messenger;
pub mod sim;
pub mod slack;
pub mod telegram;
pub mod whatsapp;

use std::sync::Arc;

use crate::adapter::AdapterRegistry;

/// Build a registry holding all five simulation adapters.
pub fn default_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(whatsapp::WhatsAppAdapter::new()));
    registry.register(Arc::new(telegram::TelegramAdapter::new()));
    registry.register(Arc::new(discord::DiscordAdapter::new()));
    registry.register(Arc::new(slack::SlackAdapter::new()));
    registry.register(Arc::new(messenger::MessengerAdapter::new()));
    registry
}
