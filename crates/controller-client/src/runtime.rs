//! # Native Runtime
//!
//! Drives a [`SyncEngine`] against a real server: session check, bootstrap,
//! socket, fetch battery, then inbound frames until the socket closes. A
//! closed socket leads back to the session check after the reconnect delay.
//!
//! The engine is single-threaded and lives on the task that calls
//! [`ClientRuntime::run`]; only the socket halves run on spawned tasks.

use std::future::Future;
use std::time::Duration;

use controller_app::session::cookie_header;
use controller_app::{AppError, BootstrapOutcome, ConnectionStatus, SyncEngine, ToastLevel};
use tokio::time::{interval_at, sleep, timeout, Instant};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session_check::check_session;
use crate::theme_cache::FileThemeCache;
use crate::transport::native::{connect, NativeConnection};
use crate::transport::ConnectionEvent;

/// Idle countdown resolution. A native client has no user input, so each
/// inbound frame counts as activity and restarts the countdown.
pub const SESSION_TICK: Duration = Duration::from_secs(60);

/// How long a local close waits for the server's close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Why [`ClientRuntime::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Shutdown signal received
    Shutdown,
    /// Initial fetches completed and `exit_when_ready` was set
    Ready,
    /// No session cookie, or the session ended
    Anonymous,
}

enum Step {
    Continue,
    Closed,
    Exit(RunOutcome),
}

/// Native host around one engine.
#[derive(Debug)]
pub struct ClientRuntime {
    config: ClientConfig,
    engine: SyncEngine,
    http: reqwest::Client,
    session_url: Url,
}

impl ClientRuntime {
    /// Build the engine from configuration.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let session_url = config.session_url()?;
        let theme_cache = FileThemeCache::new(config.cache_dir());
        let engine = SyncEngine::new(
            config.engine.clone(),
            Box::new(theme_cache),
            Box::new(config.cookie_store()),
        );
        let http = reqwest::Client::builder()
            .timeout(config.connect_timeout())
            .build()
            .map_err(ClientError::Http)?;
        Ok(Self {
            config,
            engine,
            http,
            session_url,
        })
    }

    /// The engine being driven.
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Run until shutdown, the session ends, or (with `exit_when_ready`) the
    /// initial fetches complete.
    pub async fn run<F>(&mut self, shutdown: F) -> ClientResult<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let session_ok = tokio::select! {
                _ = &mut shutdown => return Ok(RunOutcome::Shutdown),
                ok = self.session_ok() => ok,
            };
            let outcome = self.engine.bootstrap(session_ok);
            self.report();

            match outcome {
                BootstrapOutcome::Anonymous => {
                    tracing::warn!("no session cookie; nothing to sync");
                    return Ok(RunOutcome::Anonymous);
                }
                BootstrapOutcome::Authenticated { .. } if self.engine.should_open() => {
                    if let Some(done) = self.connect_and_drive(&mut shutdown).await? {
                        return Ok(done);
                    }
                }
                _ => {}
            }

            tracing::debug!(delay = ?self.config.reconnect_delay(), "waiting before reconnect");
            tokio::select! {
                _ = &mut shutdown => return Ok(RunOutcome::Shutdown),
                _ = sleep(self.config.reconnect_delay()) => {}
            }
        }
    }

    async fn session_ok(&self) -> bool {
        let cookie = cookie_header(self.engine.cookies());
        match check_session(&self.http, &self.session_url, cookie.as_deref()).await {
            Ok(ok) => ok,
            Err(error) => {
                tracing::warn!(%error, "session check failed");
                false
            }
        }
    }

    async fn connect_and_drive<F>(&mut self, shutdown: &mut std::pin::Pin<&mut F>) -> ClientResult<Option<RunOutcome>>
    where
        F: Future<Output = ()>,
    {
        let url = self.engine.begin_connect(&self.config.origin)?;
        let cookie = cookie_header(self.engine.cookies());
        let mut connection = match connect(&url, cookie.as_deref(), self.config.connect_timeout()).await {
            Ok(connection) => connection,
            Err(error) => {
                self.engine.on_transport_error(&error.to_string());
                self.engine.on_closed(None, "connect failed");
                self.report();
                return Ok(None);
            }
        };

        let mut ticker = interval_at(Instant::now() + SESSION_TICK, SESSION_TICK);
        let mut close_sent = false;
        let mut exit = None;

        loop {
            let step = tokio::select! {
                _ = shutdown.as_mut() => {
                    self.close_gracefully(&mut connection).await;
                    return Ok(Some(RunOutcome::Shutdown));
                }
                _ = ticker.tick() => {
                    if self.engine.tick_session() {
                        exit = Some(RunOutcome::Anonymous);
                    }
                    Step::Continue
                }
                event = connection.next_event() => self.handle_event(event),
            };

            match step {
                Step::Closed => return Ok(exit),
                Step::Exit(outcome) => exit = Some(outcome),
                Step::Continue => {}
            }

            self.flush(&connection);
            if (self.engine.wants_close() || exit.is_some()) && !close_sent {
                connection.close();
                close_sent = true;
            }
            self.report();
        }
    }

    fn handle_event(&mut self, event: Option<ConnectionEvent>) -> Step {
        match event {
            Some(ConnectionEvent::Ready) => {
                if let Err(error) = self.engine.on_open() {
                    tracing::warn!(%error, "socket opened in unexpected state");
                }
                Step::Continue
            }
            Some(ConnectionEvent::Message(text)) => {
                self.engine.touch_session();
                let outcome = self.engine.on_message(&text);
                tracing::trace!(?outcome, "frame dispatched");
                if self.config.exit_when_ready
                    && self.engine.status() == ConnectionStatus::Ready
                    && self.engine.is_app_loaded()
                {
                    tracing::info!("initial fetches complete, exiting");
                    return Step::Exit(RunOutcome::Ready);
                }
                Step::Continue
            }
            Some(ConnectionEvent::TransportError(detail)) => {
                self.engine.on_transport_error(&detail);
                Step::Continue
            }
            Some(ConnectionEvent::Closed { code, reason }) => {
                self.engine.on_closed(code, &reason);
                Step::Closed
            }
            None => {
                self.engine.on_closed(None, "stream ended");
                Step::Closed
            }
        }
    }

    fn flush(&mut self, connection: &NativeConnection) {
        for envelope in self.engine.take_outbox() {
            let sent = envelope
                .to_json()
                .map_err(|e| ClientError::App(AppError::Encode(e)))
                .and_then(|text| connection.send_text(text).map_err(ClientError::from));
            if let Err(error) = sent {
                tracing::warn!(%error, domain = %envelope.domain, kind = %envelope.kind, "dropping outbound message");
            }
        }
    }

    async fn close_gracefully(&mut self, connection: &mut NativeConnection) {
        connection.close();
        let closed = timeout(CLOSE_GRACE, async {
            loop {
                match connection.next_event().await {
                    Some(ConnectionEvent::Closed { code, reason }) => break (code, reason),
                    None => break (None, String::new()),
                    Some(_) => {}
                }
            }
        })
        .await;
        let (code, reason) = closed.unwrap_or((None, "shutdown".to_string()));
        self.engine.on_closed(code, &reason);
    }

    fn report(&mut self) {
        for notification in self.engine.drain_notifications() {
            match notification.level {
                ToastLevel::Error => tracing::error!(message = %notification.message, "toast"),
                ToastLevel::Warning => tracing::warn!(message = %notification.message, "toast"),
                ToastLevel::Notice | ToastLevel::Info => {
                    tracing::info!(message = %notification.message, "toast");
                }
            }
        }
    }
}
