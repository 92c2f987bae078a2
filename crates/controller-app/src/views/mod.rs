//! # View State Module
//!
//! State types the UI renders from. Every synced domain is a
//! [`DomainCollection`]; scalar views are plain options on [`SyncState`].

mod state;

pub mod collection;
pub mod contacts;
pub mod credentials;
pub mod notifications;
pub mod roles;
pub mod theme;
pub mod users;

pub use state::SyncState;

// Re-export state types for convenience
pub use collection::{reconcile, sort_newest_first, CollectionOrder, DomainCollection, Record};
pub use contacts::{Contact, ContactsState};
pub use credentials::{Credential, CredentialsState};
pub use notifications::{Notification, NotificationQueue, ToastLevel, MAX_PENDING_TOASTS};
pub use roles::{Role, RolesState};
pub use theme::{load_or_default, MemoryThemeCache, Theme, ThemeCache, ThemeCacheError, THEME_CACHE_KEY};
pub use users::{User, UsersState};
