//! # Theme State
//!
//! The theme is a flat map of style tokens to CSS values. The last theme the
//! server sent is cached locally under [`THEME_CACHE_KEY`] so the next start
//! renders with it before the connection is up.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Fixed cache key for the most recently applied theme.
pub const THEME_CACHE_KEY: &str = "recentTheme";

/// Hard-coded palette used when nothing is cached.
const DEFAULT_PALETTE: &[(&str, &str)] = &[
    ("primary_color", "#0E6EC4"),
    ("secondary_color", "#FFA21A"),
    ("neutral_color", "#091C40"),
    ("negative_color", "#ed003c"),
    ("warning_color", "#e49b13"),
    ("positive_color", "#008a00"),
    ("text_color", "#555"),
    ("text_light", "#fff"),
    ("border", "#e3e3e3"),
    ("drop_shadow", "3px 3px 3px rgba(0, 0, 0, 0.3)"),
    ("background_primary", "#fff"),
    ("background_secondary", "#f5f5f5"),
];

/// Style token map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme {
    tokens: BTreeMap<String, String>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            tokens: DEFAULT_PALETTE
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }
}

impl Theme {
    /// Build a theme from explicit tokens.
    pub fn from_tokens(tokens: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Look up a token.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tokens.get(key).map(String::as_str)
    }

    /// Iterate tokens in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `update` on top of this theme.
    #[must_use]
    pub fn merged(&self, update: &Theme) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.extend(update.tokens.clone());
        Self { tokens }
    }

    /// Restore one token to its default palette value. Unknown keys are
    /// returned unchanged.
    #[must_use]
    pub fn with_default_for(&self, key: &str) -> Self {
        match DEFAULT_PALETTE.iter().find(|(k, _)| *k == key) {
            Some((k, v)) => {
                let mut tokens = self.tokens.clone();
                tokens.insert((*k).to_string(), (*v).to_string());
                Self { tokens }
            }
            None => self.clone(),
        }
    }
}

/// Errors from a theme cache backend.
#[derive(Debug, Error)]
pub enum ThemeCacheError {
    /// Backend could not be read or written
    #[error("theme cache I/O failed: {0}")]
    Io(String),
    /// Stored entry was not a theme
    #[error("theme cache entry is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Local persistence for the last applied theme.
///
/// Implemented by the hosts: a file on native, `localStorage` in the browser.
pub trait ThemeCache {
    /// Read the cached theme, `Ok(None)` when nothing is stored.
    fn load(&self) -> Result<Option<Theme>, ThemeCacheError>;

    /// Overwrite the cached theme.
    fn store(&mut self, theme: &Theme) -> Result<(), ThemeCacheError>;
}

/// Read the cached theme, falling back to the default palette when absent or
/// unreadable.
pub fn load_or_default(cache: &dyn ThemeCache) -> Theme {
    match cache.load() {
        Ok(Some(theme)) => theme,
        Ok(None) => Theme::default(),
        Err(error) => {
            tracing::warn!(%error, "ignoring unreadable theme cache");
            Theme::default()
        }
    }
}

/// In-memory cache holding the serialized entry, as a browser store would.
#[derive(Debug, Clone, Default)]
pub struct MemoryThemeCache {
    entry: Option<String>,
}

impl MemoryThemeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-populated with a raw entry.
    pub fn with_entry(entry: impl Into<String>) -> Self {
        Self {
            entry: Some(entry.into()),
        }
    }

    /// The raw stored entry.
    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }
}

impl ThemeCache for MemoryThemeCache {
    fn load(&self) -> Result<Option<Theme>, ThemeCacheError> {
        self.entry
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(ThemeCacheError::from)
    }

    fn store(&mut self, theme: &Theme) -> Result<(), ThemeCacheError> {
        self.entry = Some(serde_json::to_string(theme)?);
        Ok(())
    }
}
