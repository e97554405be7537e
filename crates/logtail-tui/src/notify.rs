//! Transient footer notifications.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Ok,
    Err,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: StatusKind,
    pub text: String,
    expires_at: Instant,
}

/// Holds the one notification on screen. A newer one takes its place at
/// once and is visible for `ttl`.
#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    current: Option<Notification>,
}

impl Notifier {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    /// Show `text`, replacing whatever is visible. Blank text is ignored.
    pub fn show(&mut self, kind: StatusKind, text: impl Into<String>, now: Instant) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        self.current = Some(Notification {
            kind,
            text,
            expires_at: now + self.ttl,
        });
    }

    #[must_use]
    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.current.as_ref().map(|n| n.expires_at)
    }

    /// Retire the notification once its time is up. Returns true when it
    /// was removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let expired = self.current.as_ref().is_some_and(|n| n.expires_at <= now);
        if expired {
            self.current = None;
        }
        expired
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
