//! Categorized sync errors
//!
//! Provides one umbrella over the per-layer error enums so hosts can:
//! - Route a failure to the right toast severity
//! - Decide whether a failure is worth retrying
//! - Turn any failure into a user-visible [`Notification`]

use std::fmt;
use thiserror::Error;

use crate::connection::ConnectionError;
use crate::router::DispatchError;
use crate::session::SessionError;
use crate::views::notifications::Notification;

// Re-export ToastLevel from views/notifications (single source of truth)
pub use crate::views::notifications::ToastLevel;

/// Generic text shown for any client-side websocket failure.
pub const CLIENT_WEBSOCKET_ERROR: &str = "Client Error - Websockets";

// ============================================================================
// Error Categories
// ============================================================================

/// Where in the sync pipeline a failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Socket or HTTP failures (often transient)
    Transport,
    /// Frames that could not be framed, routed or decoded
    Protocol,
    /// Errors the server reported for a domain (`*_ERROR`)
    Domain,
    /// Local failures while applying a decoded message
    Handler,
    /// Invalid local configuration or session data
    Config,
}

impl ErrorCategory {
    /// Check if this error category may resolve on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport)
    }

    /// Get the appropriate toast severity for this category.
    #[must_use]
    pub fn toast_severity(&self) -> ToastLevel {
        match self {
            Self::Transport => ToastLevel::Warning,
            Self::Protocol | Self::Domain | Self::Handler => ToastLevel::Error,
            Self::Config => ToastLevel::Warning,
        }
    }

    /// Get a short label for this category.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Transport => "Transport",
            Self::Protocol => "Protocol",
            Self::Domain => "Domain",
            Self::Handler => "Handler",
            Self::Config => "Config",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Umbrella error
// ============================================================================

/// Any error the headless core can produce.
#[derive(Debug, Error)]
pub enum AppError {
    /// Connection lifecycle error
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// Routing or handler error
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Session bootstrap error
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Outbound envelope could not be encoded
    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl AppError {
    /// Classify this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection(ConnectionError::InvalidTransition { .. }) => ErrorCategory::Protocol,
            Self::Connection(_) => ErrorCategory::Config,
            Self::Dispatch(err) => err.category(),
            Self::Session(_) => ErrorCategory::Config,
            Self::Encode(_) => ErrorCategory::Protocol,
        }
    }

    /// Render this error as a toast.
    #[must_use]
    pub fn to_notification(&self) -> Notification {
        match self {
            Self::Dispatch(err) => err.to_notification(),
            other => Notification {
                level: other.category().toast_severity(),
                message: other.to_string(),
            },
        }
    }
}
