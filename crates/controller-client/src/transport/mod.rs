//! # Socket Transports
//!
//! One socket per session. Both transports report the same four events and
//! leave every decision to the engine.

use thiserror::Error;

#[cfg(target_arch = "wasm32")]
pub mod browser;
#[cfg(not(target_arch = "wasm32"))]
pub mod native;

/// What a transport reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Handshake completed, frames may be written
    Ready,
    /// One inbound text frame
    Message(String),
    /// Socket closed, locally or by the peer
    Closed {
        /// Close code, absent when the stream just ended
        code: Option<u16>,
        /// Close reason
        reason: String,
    },
    /// Socket-level error; a `Closed` usually follows
    TransportError(String),
}

/// Transport failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not open the socket
    #[error("websocket connect failed: {0}")]
    Connect(String),

    /// Connect did not finish in time
    #[error("websocket connect timed out")]
    Timeout,

    /// Handshake request could not be built
    #[error("invalid handshake request: {0}")]
    Request(String),

    /// Frame could not be written
    #[error("websocket send failed: {0}")]
    Send(String),

    /// No socket to write to
    #[error("websocket is not connected")]
    NotConnected,
}
