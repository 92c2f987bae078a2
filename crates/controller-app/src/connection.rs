//! # Connection State Machine
//!
//! ```text
//! Disconnected ─open()─▶ Connecting ─Ready─▶ Authenticating ─barrier─▶ Ready
//!       ▲                    │                     │                    │
//!       │                    └──────── logout ─────┴──────▶ Closing ◀───┘
//!       └───────────────────── Closed (from any state) ─────────┘
//! ```
//!
//! `Authenticating` covers the window where the socket is open but the fetch
//! battery is still in flight.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Path of the websocket endpoint, relative to the page origin.
pub const DEFAULT_WS_PATH: &str = "/api/ws";

/// Connection errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// Origin or path could not be parsed
    #[error("invalid websocket url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Origin scheme has no websocket counterpart
    #[error("unsupported origin scheme: {0}")]
    UnsupportedScheme(String),

    /// Transition not allowed from the current state
    #[error("invalid connection transition {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: ConnectionStatus,
        /// Requested state
        to: ConnectionStatus,
    },

    /// Tried to send with no open socket
    #[error("no open connection")]
    NotConnected,
}

/// Socket lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No socket
    #[default]
    Disconnected,
    /// Socket requested, not yet open
    Connecting,
    /// Open, initial fetches outstanding
    Authenticating,
    /// Open and loaded
    Ready,
    /// Local close requested
    Closing,
}

impl ConnectionStatus {
    /// True while a socket exists or is being opened.
    pub fn has_socket(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// True when outbound frames can be written.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Authenticating | Self::Ready)
    }

    fn can_transition_to(self, to: Self) -> bool {
        use ConnectionStatus::*;
        matches!(
            (self, to),
            (Disconnected, Connecting)
                | (Connecting, Authenticating)
                | (Authenticating, Ready)
                | (Connecting | Authenticating | Ready, Closing)
                | (_, Disconnected)
        )
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
            Self::Closing => "closing",
        };
        f.write_str(label)
    }
}

/// Guarded holder of the current [`ConnectionStatus`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionMachine {
    status: ConnectionStatus,
}

impl ConnectionMachine {
    /// Start disconnected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Move to `to`, or leave the state untouched and report why not.
    pub fn transition(&mut self, to: ConnectionStatus) -> Result<ConnectionStatus, ConnectionError> {
        let from = self.status;
        if !from.can_transition_to(to) {
            return Err(ConnectionError::InvalidTransition { from, to });
        }
        if from != to {
            tracing::info!(%from, %to, "connection state");
        }
        self.status = to;
        Ok(from)
    }
}

/// Derive the websocket URL from a page origin: `path` joined onto it, with
/// `http` upgraded to `ws` and `https` to `wss`.
pub fn socket_url(origin: &str, path: &str) -> Result<Url, ConnectionError> {
    let mut url = Url::parse(origin)?.join(path)?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(ConnectionError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|()| ConnectionError::UnsupportedScheme(url.scheme().to_string()))?;
    Ok(url)
}
