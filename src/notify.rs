//! User-facing notification channel.
//!
//! Validation refusals, generation results, and save/load outcomes surface
//! to the user as toasts in the host UI. The core only knows this trait;
//! hosts bridge it to whatever toast system they run.

use serde::{Deserialize, Serialize};

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
}

/// Sink for user-visible messages.
pub trait Notifier {
    fn notify(&mut self, severity: Severity, summary: &str, detail: &str);
}

/// Discards all messages. For hosts that surface nothing.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&mut self, _severity: Severity, _summary: &str, _detail: &str) {}
}

/// One captured message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

/// Keeps every message in order. Used by the test suite and by hosts that
/// render their own toast queue.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub messages: Vec<Notification>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Severities of captured messages, in order.
    #[must_use]
    pub fn severities(&self) -> Vec<Severity> {
        self.messages.iter().map(|m| m.severity).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, severity: Severity, summary: &str, detail: &str) {
        self.messages.push(Notification {
            severity,
            summary: summary.to_owned(),
            detail: detail.to_owned(),
        });
    }
}
