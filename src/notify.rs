//! User-facing notifications.
//!
//! Code that needs to tell the user something (a submission went through, a
//! fetch failed) receives a [`Notifier`] instead of reaching for a global.

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let message = notification.message.as_str();
        match notification.severity {
            Severity::Success | Severity::Info => info!(severity = ?notification.severity, "{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Error => error!("{message}"),
        }
    }
}

/// Keeps every notification in memory, oldest first.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_keeps_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify(Notification::new(Severity::Info, "first"));
        notifier.notify(Notification::new(Severity::Error, "second"));

        let sent = notifier.notifications();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].message, "first");
        assert_eq!(sent[1].severity, Severity::Error);
    }

    #[test]
    fn test_tracing_notifier_does_not_panic() {
        TracingNotifier.notify(Notification::new(Severity::Warning, "heads up"));
    }
}
