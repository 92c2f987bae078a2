//! # Notifications
//!
//! Transient toasts raised by the sync engine (transport and protocol
//! problems, server-side notices). Persistent banners for domain errors live
//! in [`super::SyncState`] instead.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Maximum toasts kept before the oldest is dropped.
pub const MAX_PENDING_TOASTS: usize = 32;

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    /// Informational
    Info,
    /// Positive server notice ("Success - Verified Credential")
    Notice,
    /// Degraded but recoverable
    Warning,
    /// Failure the user should see
    Error,
}

impl fmt::Display for ToastLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Notice => write!(f, "notice"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Severity
    pub level: ToastLevel,
    /// User-visible text
    pub message: String,
}

impl Notification {
    /// Create an error toast.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }

    /// Create a notice toast.
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Notice,
            message: message.into(),
        }
    }
}

/// Bounded FIFO of toasts waiting to be shown.
#[derive(Debug, Clone, Default)]
pub struct NotificationQueue {
    pending: VecDeque<Notification>,
}

impl NotificationQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a toast, dropping the oldest once full.
    pub fn push(&mut self, notification: Notification) {
        if self.pending.len() == MAX_PENDING_TOASTS {
            self.pending.pop_front();
        }
        self.pending.push_back(notification);
    }

    /// Take every pending toast, oldest first.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.pending.drain(..).collect()
    }

    /// Pending toasts, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &Notification> {
        self.pending.iter()
    }

    /// Number of pending toasts.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
