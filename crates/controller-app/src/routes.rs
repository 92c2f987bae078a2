//! # Routing Guard
//!
//! Decides what a host should render for a path given the app phase. The
//! core owns no router; hosts call [`resolve`] and follow the decision.

use serde::Serialize;

/// Landing route after login.
pub const HOME: &str = "/";

/// Login route.
pub const LOGIN: &str = "/login";

/// Routes reachable without a session.
pub const UNAUTHENTICATED_ROUTES: &[&str] = &[LOGIN, "/forgot-password", "/password-reset", "/account-setup"];

/// Routes behind login. Entries ending in `/:id` also match one extra segment.
const AUTHENTICATED_ROUTES: &[&str] = &[
    HOME,
    "/contacts",
    "/contacts/:id",
    "/credentials",
    "/credentials/:id",
    "/users",
    "/users/:id",
    "/settings",
    "/invitations",
    "/verification",
    "/messages",
];

/// Coarse app phase the UI gates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppPhase {
    /// Session check or initial fetches outstanding
    Loading,
    /// Loaded, nobody logged in
    Unauthenticated,
    /// Loaded and logged in
    Ready,
}

/// What to do for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Show the full-page spinner
    Spinner,
    /// Render the route
    Render,
    /// Navigate elsewhere
    Redirect(&'static str),
}

fn matches_pattern(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix("/:id") {
        Some(prefix) => path
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|id| !id.is_empty() && !id.contains('/')),
        None => pattern == path,
    }
}

fn is_unauthenticated(path: &str) -> bool {
    UNAUTHENTICATED_ROUTES.contains(&path)
}

fn is_authenticated(path: &str) -> bool {
    AUTHENTICATED_ROUTES
        .iter()
        .any(|pattern| matches_pattern(pattern, path))
}

/// Resolve `path` for `phase`.
pub fn resolve(phase: AppPhase, path: &str) -> RouteDecision {
    let path = match path.trim_end_matches('/') {
        "" => HOME,
        trimmed => trimmed,
    };

    match phase {
        AppPhase::Loading => RouteDecision::Spinner,
        AppPhase::Unauthenticated if is_unauthenticated(path) => RouteDecision::Render,
        AppPhase::Unauthenticated => RouteDecision::Redirect(LOGIN),
        AppPhase::Ready if is_authenticated(path) => RouteDecision::Render,
        AppPhase::Ready => RouteDecision::Redirect(HOME),
    }
}
