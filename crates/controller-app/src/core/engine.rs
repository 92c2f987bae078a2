//! # Sync Engine
//!
//! Single owner of every piece of synced state. Hosts feed it transport
//! events and drain what it produces:
//!
//! ```text
//!  host ──bootstrap / set_up_user──▶ ┌────────────┐ ──take_outbox()──▶ socket
//!  socket ──on_open / on_message──▶  │ SyncEngine │ ──drain_notifications()──▶ toasts
//!  socket ──on_closed / on_error──▶  └────────────┘ ──ready_signal()──▶ UI
//! ```
//!
//! The engine never performs I/O and is driven from one task, so it is a
//! plain `&mut self` state holder with no locking.

use std::collections::VecDeque;

use futures_signals::signal::{Mutable, Signal};
use serde_json::Value;
use url::Url;

use super::config::EngineConfig;
use crate::barrier::LoadingBarrier;
use crate::battery::fetch_battery;
use crate::connection::{socket_url, ConnectionError, ConnectionMachine, ConnectionStatus};
use crate::errors::{AppError, CLIENT_WEBSOCKET_ERROR};
use crate::handlers::HandlerContext;
use crate::protocol::{Domain, Envelope, Request};
use crate::router::{self, DispatchOutcome};
use crate::routes::{self, AppPhase, RouteDecision};
use crate::session::{bootstrap, BootstrapOutcome, CookieStore, Identity, SessionState};
use crate::views::notifications::{Notification, NotificationQueue};
use crate::views::theme::{load_or_default, Theme, ThemeCache};
use crate::views::SyncState;

/// Headless synchronization engine.
pub struct SyncEngine {
    config: EngineConfig,
    state: SyncState,
    barrier: LoadingBarrier,
    session: SessionState,
    connection: ConnectionMachine,
    notifications: NotificationQueue,
    outbox: VecDeque<Envelope>,
    theme_cache: Box<dyn ThemeCache>,
    cookies: Box<dyn CookieStore>,
    app_loaded: Mutable<bool>,
    status: Mutable<ConnectionStatus>,
    retry: bool,
}

impl SyncEngine {
    /// Create an engine. The starting theme comes from the cache.
    pub fn new(
        config: EngineConfig,
        theme_cache: Box<dyn ThemeCache>,
        cookies: Box<dyn CookieStore>,
    ) -> Self {
        let theme = load_or_default(theme_cache.as_ref());
        Self {
            session: SessionState::new(config.session_minutes),
            config,
            state: SyncState::with_theme(theme),
            barrier: LoadingBarrier::new(),
            connection: ConnectionMachine::new(),
            notifications: NotificationQueue::new(),
            outbox: VecDeque::new(),
            theme_cache,
            cookies,
            app_loaded: Mutable::new(false),
            status: Mutable::new(ConnectionStatus::Disconnected),
            retry: false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Synced state.
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Initial-fetch barrier.
    pub fn barrier(&self) -> &LoadingBarrier {
        &self.barrier
    }

    /// Session and identity.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Host cookie jar.
    pub fn cookies(&self) -> &dyn CookieStore {
        self.cookies.as_ref()
    }

    /// Mutable host cookie jar, for hosts that learn cookies out of band.
    pub fn cookies_mut(&mut self) -> &mut dyn CookieStore {
        self.cookies.as_mut()
    }

    /// Connection state.
    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Whether the app has finished loading.
    pub fn is_app_loaded(&self) -> bool {
        self.app_loaded.get()
    }

    /// Flips on every close; hosts re-run their session check when it changes.
    pub fn retry_flag(&self) -> bool {
        self.retry
    }

    /// Signal tracking [`Self::is_app_loaded`].
    pub fn ready_signal(&self) -> impl Signal<Item = bool> + Send + Sync + 'static {
        self.app_loaded.signal()
    }

    /// Signal tracking [`Self::status`].
    pub fn status_signal(&self) -> impl Signal<Item = ConnectionStatus> + Send + Sync + 'static {
        self.status.signal()
    }

    /// Coarse phase the UI gates on.
    pub fn app_phase(&self) -> AppPhase {
        if !self.is_app_loaded() {
            AppPhase::Loading
        } else if self.session.is_logged_in() {
            AppPhase::Ready
        } else {
            AppPhase::Unauthenticated
        }
    }

    /// Resolve a route for the current phase.
    pub fn resolve_route(&self, path: &str) -> RouteDecision {
        routes::resolve(self.app_phase(), path)
    }

    /// Take every pending toast, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }

    /// Take every queued outbound envelope, in send order.
    pub fn take_outbox(&mut self) -> Vec<Envelope> {
        self.outbox.drain(..).collect()
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Apply the startup session check.
    ///
    /// `session_ok` is whether the session endpoint answered successfully.
    pub fn bootstrap(&mut self, session_ok: bool) -> BootstrapOutcome {
        let outcome = match bootstrap(session_ok, self.cookies.as_ref()) {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(%error, "ignoring user cookie");
                BootstrapOutcome::Authenticated { identity: None }
            }
        };
        tracing::info!(?outcome, "session bootstrap");

        match &outcome {
            BootstrapOutcome::Unavailable => {}
            BootstrapOutcome::Anonymous => self.set_app_loaded(true),
            BootstrapOutcome::Authenticated { identity } => match identity {
                Some(identity) => self.session.set_up_user(identity.clone(), self.cookies.as_ref()),
                None => {
                    self.session.restore(self.cookies.as_ref());
                    self.set_app_loaded(true);
                }
            },
        }
        outcome
    }

    /// Install the identity after a successful login.
    pub fn set_up_user(&mut self, identity: Identity) {
        self.session.set_up_user(identity, self.cookies.as_ref());
    }

    /// End the session. Returns the route to navigate to.
    pub fn logout(&mut self) -> &'static str {
        tracing::info!("logout");
        self.session.logout(self.cookies.as_mut());
        self.state.clear_session_data();
        self.barrier.reset();
        self.outbox.clear();
        if self.connection.status().has_socket() && self.connection.status() != ConnectionStatus::Closing {
            self.transition(ConnectionStatus::Closing).ok();
        }
        self.set_app_loaded(true);
        routes::LOGIN
    }

    /// Count one idle minute; ends the session once the countdown runs out.
    /// Returns `true` when this tick logged the user out.
    pub fn tick_session(&mut self) -> bool {
        if !self.session.is_logged_in() {
            return false;
        }
        if self.session.countdown_mut().tick() {
            tracing::info!("session expired");
            self.logout();
            return true;
        }
        false
    }

    /// Restart the idle countdown after user activity.
    pub fn touch_session(&mut self) {
        self.session.countdown_mut().reset();
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// A socket should be opened: session present, logged in, none open.
    pub fn should_open(&self) -> bool {
        self.session.is_established() && self.connection.status() == ConnectionStatus::Disconnected
    }

    /// Whether the host should close its socket after a logout.
    pub fn wants_close(&self) -> bool {
        self.connection.status() == ConnectionStatus::Closing
    }

    /// Start opening a socket. Returns the URL to connect to.
    pub fn begin_connect(&mut self, origin: &str) -> Result<Url, AppError> {
        let url = socket_url(origin, &self.config.ws_path)?;
        if !self.session.is_established() {
            return Err(ConnectionError::InvalidTransition {
                from: self.connection.status(),
                to: ConnectionStatus::Connecting,
            }
            .into());
        }
        self.transition(ConnectionStatus::Connecting)?;
        tracing::info!(%url, "connecting");
        Ok(url)
    }

    /// The socket opened: reset the barrier and queue the fetch battery.
    pub fn on_open(&mut self) -> Result<(), AppError> {
        self.transition(ConnectionStatus::Authenticating)?;
        self.barrier.reset();
        self.set_app_loaded(false);

        for (name, request) in fetch_battery(&self.config.rules, self.session.identity()) {
            self.barrier.register(name);
            self.outbox.push_back(request.into_envelope());
        }
        tracing::info!(pending = self.outbox.len(), "fetch battery queued");
        Ok(())
    }

    /// Apply one inbound text frame. Frames are only applied while the
    /// socket is open; anything still in flight after logout is dropped.
    pub fn on_message(&mut self, raw: &str) -> DispatchOutcome {
        if !self.connection.status().is_open() {
            tracing::debug!(status = %self.connection.status(), "discarding frame");
            return DispatchOutcome::Discarded;
        }
        let mut ctx = HandlerContext {
            state: &mut self.state,
            barrier: &mut self.barrier,
            notifications: &mut self.notifications,
            theme_cache: self.theme_cache.as_mut(),
            policy: self.config.barrier_policy,
            workflow_marker: &self.config.workflow_marker,
        };
        let outcome = router::dispatch_frame(raw, &mut ctx);
        self.sync_readiness();
        outcome
    }

    /// The socket closed, locally or remotely.
    pub fn on_closed(&mut self, code: Option<u16>, reason: &str) {
        tracing::info!(?code, reason, "connection closed");
        self.transition(ConnectionStatus::Disconnected).ok();
        self.outbox.clear();
        self.barrier.reset();
        self.session.connection_lost();
        self.retry = !self.retry;
        self.state.clear_session_data();
        if self.session.token().is_some() {
            // Reconnect pending: show the spinner rather than the login page.
            self.set_app_loaded(false);
        }
    }

    /// The transport reported an error. Retry is driven by the close that
    /// follows, not from here.
    pub fn on_transport_error(&mut self, detail: &str) {
        tracing::warn!(detail, "websocket error");
        self.notifications.push(Notification::error(CLIENT_WEBSOCKET_ERROR));
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Queue an arbitrary message for an open socket.
    pub fn send(&mut self, domain: Domain, kind: &str, payload: Value) -> Result<(), AppError> {
        self.enqueue(Envelope::new(domain, kind, payload))
    }

    /// Queue a typed request for an open socket.
    pub fn request(&mut self, request: Request) -> Result<(), AppError> {
        self.enqueue(request.into_envelope())
    }

    fn enqueue(&mut self, envelope: Envelope) -> Result<(), AppError> {
        if !self.connection.status().is_open() {
            return Err(ConnectionError::NotConnected.into());
        }
        tracing::debug!(domain = %envelope.domain, kind = %envelope.kind, "outbound message");
        self.outbox.push_back(envelope);
        Ok(())
    }

    // =========================================================================
    // Theme editing and banners
    // =========================================================================

    /// Merge tokens into the local theme and remember which changed.
    pub fn update_theme(&mut self, update: &Theme) {
        self.state.theme = self.state.theme.merged(update);
        for (key, _) in update.iter() {
            if !self.state.changed_styles.iter().any(|k| k == key) {
                self.state.changed_styles.push(key.to_string());
            }
        }
    }

    /// Reset one token to its default and forget the local change.
    pub fn undo_style(&mut self, key: &str) {
        self.state.theme = self.state.theme.with_default_for(key);
        self.state.changed_styles.retain(|k| k != key);
    }

    /// Send the local theme to the server.
    pub fn save_theme(&mut self) -> Result<(), AppError> {
        self.request(Request::SetTheme(self.state.theme.clone()))?;
        self.state.changed_styles.clear();
        Ok(())
    }

    /// Clear the error and success banners.
    pub fn clear_response_state(&mut self) {
        self.state.clear_response_state();
    }

    /// Clear the focused connection once the dependent view is done with it.
    pub fn clear_focused_connection(&mut self) {
        self.state.focused_connection_id = None;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn transition(&mut self, to: ConnectionStatus) -> Result<(), ConnectionError> {
        self.connection.transition(to)?;
        self.status.set_neq(to);
        Ok(())
    }

    fn set_app_loaded(&mut self, loaded: bool) {
        self.app_loaded.set_neq(loaded);
    }

    fn sync_readiness(&mut self) {
        if self.connection.status() != ConnectionStatus::Authenticating {
            return;
        }
        if self.barrier.is_satisfied() {
            tracing::info!("initial fetches complete");
            self.transition(ConnectionStatus::Ready).ok();
            self.set_app_loaded(true);
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("status", &self.connection.status())
            .field("app_loaded", &self.is_app_loaded())
            .field("pending", &self.barrier.pending().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
