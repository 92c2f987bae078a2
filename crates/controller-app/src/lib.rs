//! # Controller App - Headless Sync Core
//!
//! Keeps a live, authenticated view of server-side domain state (contacts,
//! credentials, users, roles, organization settings) that arrives over a
//! single websocket, and decides when the app has finished loading.
//!
//! ## Purpose
//!
//! - Correlation-free `{context, type, data}` wire protocol
//! - Two-level message routing into typed inbound messages
//! - Merge-by-id reconciliation of domain collections
//! - Loading barrier over the initial fetch battery
//! - Session, identity and role-based fetch filtering
//! - Explicit connection state machine
//!
//! ## Architecture Constraints
//!
//! - **MUST NOT**: open sockets, make HTTP calls or touch the filesystem
//!   (hosts own transport and persistence and drive [`SyncEngine`] with events)
//! - **MUST NOT**: panic on any inbound frame
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut engine = SyncEngine::new(config, Box::new(theme_cache), Box::new(cookies));
//! engine.bootstrap(session_ok);
//! if engine.should_open() {
//!     let url = engine.begin_connect(origin)?;
//!     // host opens `url`, then:
//!     engine.on_open()?;
//! }
//! for envelope in engine.take_outbox() { /* write frame */ }
//! engine.on_message(&frame);
//! ```

pub mod authorization;
pub mod barrier;
pub mod battery;
pub mod connection;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod protocol;
pub mod router;
pub mod routes;
pub mod session;
pub mod views;

pub use crate::core::{EngineConfig, SyncEngine};
pub use authorization::{check, Rules};
pub use barrier::{BarrierPolicy, FetchName, LoadingBarrier};
pub use connection::{socket_url, ConnectionError, ConnectionStatus};
pub use errors::{AppError, ErrorCategory};
pub use protocol::{Domain, Envelope, InboundMessage, Request};
pub use router::{DispatchError, DispatchOutcome};
pub use routes::{AppPhase, RouteDecision};
pub use session::{BootstrapOutcome, CookieStore, Identity, MemoryCookieStore};
pub use views::{Notification, SyncState, Theme, ThemeCache, ToastLevel};
