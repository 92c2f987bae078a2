//! # Controller Client
//!
//! Hosts for [`controller_app::SyncEngine`]. The engine itself performs no
//! I/O; a host owns the socket, the cookie jar and the theme cache and feeds
//! socket events into the engine.
//!
//! - **Native**: `tokio-tungstenite` socket, `reqwest` session check, TOML
//!   configuration and a file theme cache. See [`runtime::ClientRuntime`].
//! - **Browser** (`wasm32`): `web_sys::WebSocket`, `document.cookie` and
//!   `localStorage`, exported to JavaScript as `BrowserClient`.

pub mod error;
pub mod transport;

#[cfg(not(target_arch = "wasm32"))]
pub mod config;
#[cfg(not(target_arch = "wasm32"))]
pub mod runtime;
#[cfg(not(target_arch = "wasm32"))]
pub mod session_check;
#[cfg(not(target_arch = "wasm32"))]
pub mod theme_cache;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use error::{ClientError, ClientResult};
pub use transport::{ConnectionEvent, TransportError};
