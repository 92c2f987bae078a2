//! # Session and Identity
//!
//! Who is logged in, with which roles, and whether the session cookie the
//! server handed out is still present. The cookie jar itself belongs to the
//! host and is reached through [`CookieStore`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Cookie holding the opaque session token.
pub const SESSION_COOKIE: &str = "sessionId";

/// Cookie holding the JSON-encoded [`Identity`].
pub const USER_COOKIE: &str = "user";

/// Default idle allowance before the session is ended locally.
pub const DEFAULT_SESSION_MINUTES: u32 = 60;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The `user` cookie did not hold a valid identity
    #[error("user cookie is malformed: {0}")]
    MalformedUserCookie(#[from] serde_json::Error),
}

/// The logged-in principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User id
    pub id: u64,
    /// Login name
    pub username: String,
    /// Role names, matched against the RBAC rules
    #[serde(default)]
    pub roles: Vec<String>,
}

// =============================================================================
// Cookies
// =============================================================================

/// Host cookie jar.
pub trait CookieStore {
    /// Read a cookie value.
    fn get(&self, name: &str) -> Option<String>;

    /// Remove a cookie.
    fn remove(&mut self, name: &str);
}

/// Cookie jar held in memory. Used by the native host, which receives its
/// cookies from configuration.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieStore {
    cookies: HashMap<String, String>,
}

impl MemoryCookieStore {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cookie.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn remove(&mut self, name: &str) {
        self.cookies.remove(name);
    }
}

/// Render the session cookies as a `Cookie` request header value, for hosts
/// without a browser cookie jar.
pub fn cookie_header(cookies: &dyn CookieStore) -> Option<String> {
    let pairs: Vec<String> = [SESSION_COOKIE, USER_COOKIE]
        .iter()
        .filter_map(|name| cookies.get(name).map(|value| format!("{name}={value}")))
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

// =============================================================================
// Bootstrap
// =============================================================================

/// Result of the startup session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The session endpoint did not answer; nothing is decided yet
    Unavailable,
    /// No session cookie: show the unauthenticated routes
    Anonymous,
    /// Session cookie present
    Authenticated {
        /// Identity from the `user` cookie, if any
        identity: Option<Identity>,
    },
}

/// Parse the `user` cookie. Servers that write JSON cookies prefix the
/// value with `j:`.
pub fn parse_identity(raw: &str) -> Result<Identity, SessionError> {
    let json = raw.strip_prefix("j:").unwrap_or(raw);
    Ok(serde_json::from_str(json)?)
}

/// Decide the startup state from the session check and the cookie jar.
pub fn bootstrap(session_ok: bool, cookies: &dyn CookieStore) -> Result<BootstrapOutcome, SessionError> {
    if !session_ok {
        return Ok(BootstrapOutcome::Unavailable);
    }
    if cookies.get(SESSION_COOKIE).is_none() {
        return Ok(BootstrapOutcome::Anonymous);
    }
    let identity = cookies
        .get(USER_COOKIE)
        .map(|raw| parse_identity(&raw))
        .transpose()?;
    Ok(BootstrapOutcome::Authenticated { identity })
}

// =============================================================================
// Session state
// =============================================================================

/// Idle countdown in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCountdown {
    allowance: u32,
    remaining: u32,
}

impl SessionCountdown {
    /// Start a countdown of `minutes`.
    pub fn new(minutes: u32) -> Self {
        Self {
            allowance: minutes,
            remaining: minutes,
        }
    }

    /// Count one idle minute. Returns `true` once the countdown has run out.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.is_expired()
    }

    /// Restart after user activity.
    pub fn reset(&mut self) {
        self.remaining = self.allowance;
    }

    /// Minutes left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Check whether the countdown has run out.
    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }
}

impl Default for SessionCountdown {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_MINUTES)
    }
}

/// Session token, identity and logged-in flag.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    token: Option<String>,
    identity: Option<Identity>,
    logged_in: bool,
    countdown: SessionCountdown,
}

impl SessionState {
    /// Create a logged-out session with the given idle allowance.
    pub fn new(session_minutes: u32) -> Self {
        Self {
            countdown: SessionCountdown::new(session_minutes),
            ..Self::default()
        }
    }

    /// Session token, if a session exists.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Logged-in identity.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Check the logged-in flag.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// True when a socket may be opened for this session.
    pub fn is_established(&self) -> bool {
        self.logged_in && self.token.is_some()
    }

    /// Idle countdown.
    pub fn countdown(&self) -> &SessionCountdown {
        &self.countdown
    }

    /// Mutable idle countdown.
    pub fn countdown_mut(&mut self) -> &mut SessionCountdown {
        &mut self.countdown
    }

    /// Adopt the session cookie and mark logged in.
    pub fn restore(&mut self, cookies: &dyn CookieStore) {
        self.token = cookies.get(SESSION_COOKIE);
        self.logged_in = self.token.is_some();
        self.countdown.reset();
    }

    /// Install the identity after a successful login or bootstrap.
    pub fn set_up_user(&mut self, identity: Identity, cookies: &dyn CookieStore) {
        tracing::info!(user_id = identity.id, username = %identity.username, "user set up");
        self.identity = Some(identity);
        self.restore(cookies);
    }

    /// The connection dropped; the session is re-validated before reopening.
    pub fn connection_lost(&mut self) {
        self.logged_in = false;
    }

    /// End the session and drop its cookies.
    pub fn logout(&mut self, cookies: &mut dyn CookieStore) {
        cookies.remove(SESSION_COOKIE);
        cookies.remove(USER_COOKIE);
        self.token = None;
        self.identity = None;
        self.logged_in = false;
        self.countdown.reset();
    }
}
