//! Notification collaborator.
//!
//! The engine raises a notification for every inbound message not
//! authored by the local user. Delivery is fire-and-forget: failures
//! never affect event processing.

use std::fmt;

/// Receives fire-and-forget message notifications.
pub trait Notifier: Send + Sync {
    /// Deliver one notification. Implementations must not block the
    /// caller for long and must swallow their own failures.
    fn notify(&self, title: &str, body: &str);
}

/// Emits notifications as structured log events.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        tracing::info!(title, body, "notification");
    }
}

/// Discards all notifications.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _body: &str) {}
}

impl fmt::Debug for dyn Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Notifier")
    }
}
