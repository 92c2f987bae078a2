//! # Loading Barrier
//!
//! Tracks which initial fetches are still outstanding. The app is only ready
//! once every fetch it actually issued has answered; which fetches are issued
//! depends on the user's permissions, so readiness cannot be tied to any one
//! message.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Name of one fetch in the initial battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchName {
    /// Theme settings
    Theme,
    /// Contacts with demographics
    Contacts,
    /// Credential exchanges
    Credentials,
    /// Roles
    Roles,
    /// Organization name
    Organization,
    /// Logo image
    Logo,
    /// Users
    Users,
}

impl FetchName {
    /// Wire-style name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Theme => "THEME",
            Self::Contacts => "CONTACTS",
            Self::Credentials => "CREDENTIALS",
            Self::Roles => "ROLES",
            Self::Organization => "ORGANIZATION",
            Self::Logo => "LOGO",
            Self::Users => "USERS",
        }
    }
}

impl fmt::Display for FetchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a domain error answers its pending fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierPolicy {
    /// Errors are surfaced but never satisfy the barrier. A fetch that only
    /// ever fails keeps the app loading.
    #[default]
    ErrorsBlock,
    /// A domain error counts as the terminal answer for its fetch.
    ErrorsComplete,
}

/// Open set of pending fetch names.
#[derive(Debug, Clone, Default)]
pub struct LoadingBarrier {
    pending: BTreeSet<FetchName>,
    satisfied: bool,
}

impl LoadingBarrier {
    /// Create an empty barrier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pending fetch. Registering a name twice has no further effect.
    pub fn register(&mut self, name: FetchName) {
        if self.pending.insert(name) {
            tracing::debug!(fetch = %name, "fetch pending");
        }
        self.satisfied = false;
    }

    /// Mark a fetch answered. Returns `true` when this leaves nothing pending.
    ///
    /// Names that were never registered (duplicate server pushes) are ignored.
    pub fn deregister(&mut self, name: FetchName) -> bool {
        if self.pending.remove(&name) {
            tracing::debug!(fetch = %name, remaining = self.pending.len(), "fetch answered");
        }
        if self.pending.is_empty() {
            self.satisfied = true;
        }
        self.satisfied
    }

    /// True iff nothing is pending.
    pub fn is_ready(&self) -> bool {
        self.pending.is_empty()
    }

    /// Latched flag: set when a deregistration emptied the set, cleared by
    /// the next registration or reset.
    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// Check whether a fetch is still outstanding.
    pub fn is_pending(&self, name: FetchName) -> bool {
        self.pending.contains(&name)
    }

    /// Outstanding fetches in name order.
    pub fn pending(&self) -> impl Iterator<Item = FetchName> + '_ {
        self.pending.iter().copied()
    }

    /// Forget everything, e.g. when a new connection starts its battery.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.satisfied = false;
    }
}
