//! User-visible notification seam.
//!
//! The request layer and the session machine both surface outcomes through
//! a single [`Notifier`], so every unexpected failure gets the same UX
//! treatment. UI layers plug in a toast implementation; the default sink
//! writes to the log.

use std::sync::Arc;

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default sink: structured log lines instead of toasts.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(%message, "notification");
    }

    fn error(&self, message: &str) {
        tracing::warn!(%message, "error notification");
    }
}

/// Convenience for the common default wiring.
#[must_use]
pub fn tracing_notifier() -> Arc<dyn Notifier> {
    Arc::new(TracingNotifier)
}


#[cfg(test)]
#[path = "notify_test.rs"]
mod tests;
