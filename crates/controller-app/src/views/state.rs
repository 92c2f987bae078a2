//! # Sync State
//!
//! Everything the synchronization engine keeps in memory for the UI: the
//! reconciled domain collections, the single-record views and the response
//! banners.

use super::contacts::ContactsState;
use super::credentials::CredentialsState;
use super::roles::RolesState;
use super::theme::Theme;
use super::users::{User, UsersState};
use serde::Serialize;
use serde_json::Value;

/// Synchronized application state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncState {
    // ─── Domain collections ──────────────────────────────────
    /// Contacts, newest first
    pub contacts: ContactsState,
    /// Credential exchanges, newest first
    pub credentials: CredentialsState,
    /// Users, newest first
    pub users: UsersState,
    /// Roles, snapshot order
    pub roles: RolesState,

    // ─── Single-record views ─────────────────────────────────
    /// User currently open for editing
    pub user: Option<User>,
    /// Connection a dependent view is waiting on after an invitation was used
    pub focused_connection_id: Option<String>,
    /// Invitation URL rendered as a QR code
    pub qr_code_url: Option<String>,
    /// Logo image payload as sent by the server
    pub logo: Option<Value>,
    /// Organization display name
    pub organization_name: Option<String>,

    // ─── Response banners ────────────────────────────────────
    /// Last domain error, cleared by the consuming view
    pub error_message: Option<String>,
    /// Last domain success payload, cleared by the consuming view
    pub success_message: Option<Value>,

    // ─── Theme ───────────────────────────────────────────────
    /// Active theme
    pub theme: Theme,
    /// Style keys edited locally since the last save
    pub changed_styles: Vec<String>,
}

impl SyncState {
    /// Create state with the given starting theme.
    pub fn with_theme(theme: Theme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    /// Discard everything learned from the server. The theme survives: it is
    /// UI state, not session state.
    pub fn clear_session_data(&mut self) {
        let theme = std::mem::take(&mut self.theme);
        *self = Self::with_theme(theme);
    }

    /// Clear both response banners.
    pub fn clear_response_state(&mut self) {
        self.error_message = None;
        self.success_message = None;
    }
}
