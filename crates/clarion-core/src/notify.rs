//! Notification delivery boundary.

use tracing::info;

/// Fire-and-forget user notifications. Delivery failures are the
/// implementation's problem; the engine never waits on or retries them.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Writes notifications to the log. Default for headless runs and tests.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        info!(title, message, "notification");
    }
}
