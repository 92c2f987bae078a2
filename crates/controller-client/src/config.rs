//! Native host configuration.
//!
//! A TOML file supplies defaults; command-line flags override it. Every
//! field is optional in the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use controller_app::session::{SESSION_COOKIE, USER_COOKIE};
use controller_app::{EngineConfig, MemoryCookieStore, Rules};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Directory name under the platform config and cache dirs.
pub const APP_DIR: &str = "controller-client";

/// Default session check path, joined onto the origin.
pub const DEFAULT_SESSION_PATH: &str = "/api/session";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File exists but could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for its schema
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: toml::de::Error,
    },

    /// Origin is not an absolute http(s) URL
    #[error("invalid origin {origin:?}: {reason}")]
    InvalidOrigin {
        /// Configured origin
        origin: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Command-line flags.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "controller-client", version, about = "Headless controller sync client")]
pub struct Cli {
    /// Configuration file (defaults to the platform config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Server origin, e.g. http://localhost:3100
    #[arg(long)]
    pub origin: Option<String>,

    /// Value of the `sessionId` cookie
    #[arg(long)]
    pub session_cookie: Option<String>,

    /// Value of the `user` cookie (JSON identity)
    #[arg(long)]
    pub user_cookie: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Exit once the initial fetches have completed
    #[arg(long)]
    pub exit_when_ready: bool,
}

/// Cookies the native host presents in place of a browser jar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// `sessionId` cookie
    pub session_id: Option<String>,
    /// `user` cookie
    pub user: Option<String>,
}

/// Native host configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server origin
    pub origin: String,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Delay between reconnect attempts
    pub reconnect_delay_ms: u64,
    /// Session check path
    pub session_path: String,
    /// Websocket connect timeout
    pub connect_timeout_ms: u64,
    /// Theme cache directory (defaults to the platform cache dir)
    pub cache_dir: Option<PathBuf>,
    /// TOML file with role → permission rules, replacing `engine.rules`
    pub rules_file: Option<PathBuf>,
    /// Session cookies
    pub cookies: CookieConfig,
    /// Engine settings
    pub engine: EngineConfig,
    /// Exit once the initial fetches have completed
    pub exit_when_ready: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3100".to_string(),
            log_level: "info".to_string(),
            reconnect_delay_ms: 3_000,
            session_path: DEFAULT_SESSION_PATH.to_string(),
            connect_timeout_ms: 10_000,
            cache_dir: None,
            rules_file: None,
            cookies: CookieConfig::default(),
            engine: EngineConfig::default(),
            exit_when_ready: false,
        }
    }
}

impl ClientConfig {
    /// Platform default config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Load from the CLI's `--config` or the platform default, then apply
    /// the remaining flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match cli.config.clone().or_else(Self::default_path) {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.resolve_rules()?;
        config.validate()?;
        Ok(config)
    }

    /// Let flags override file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(origin) = &cli.origin {
            self.origin = origin.clone();
        }
        if let Some(session) = &cli.session_cookie {
            self.cookies.session_id = Some(session.clone());
        }
        if let Some(user) = &cli.user_cookie {
            self.cookies.user = Some(user.clone());
        }
        if cli.verbose {
            self.log_level = "debug".to_string();
        }
        self.exit_when_ready |= cli.exit_when_ready;
    }

    /// Replace the engine rules with the contents of `rules_file`, if set.
    pub fn resolve_rules(&mut self) -> Result<(), ConfigError> {
        let Some(path) = self.rules_file.clone() else {
            return Ok(());
        };
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let rules: Rules = toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;
        tracing::debug!(roles = rules.roles().count(), "loaded rules file");
        self.engine.rules = rules;
        Ok(())
    }

    /// Check that the origin is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url().map(|_| ())
    }

    fn origin_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidOrigin {
            origin: self.origin.clone(),
            reason,
        };
        let url = Url::parse(&self.origin).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("unsupported scheme {other}"))),
        }
    }

    /// Session check endpoint.
    pub fn session_url(&self) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(&self.session_path)
            .map_err(|e| ConfigError::InvalidOrigin {
                origin: self.origin.clone(),
                reason: e.to_string(),
            })
    }

    /// Theme cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR))
    }

    /// Delay between reconnect attempts.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Websocket connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Cookie jar seeded from the configured cookies.
    pub fn cookie_store(&self) -> MemoryCookieStore {
        let mut cookies = MemoryCookieStore::new();
        if let Some(session) = &self.cookies.session_id {
            cookies.set(SESSION_COOKIE, session.clone());
        }
        if let Some(user) = &self.cookies.user {
            cookies.set(USER_COOKIE, user.clone());
        }
        cookies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use controller_app::BarrierPolicy;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            origin = "https://controller.example"

            [engine]
            barrier_policy = "errors_complete"
            "#,
        )
        .unwrap();

        assert_eq!(config.origin, "https://controller.example");
        assert_eq!(config.engine.barrier_policy, BarrierPolicy::ErrorsComplete);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(config.engine.session_minutes, 60);
    }

    #[test]
    fn test_session_url() {
        let config = ClientConfig::default();
        assert_eq!(
            config.session_url().unwrap().as_str(),
            "http://localhost:3100/api/session"
        );
    }

    #[test]
    fn test_rejects_socket_origin() {
        let config = ClientConfig {
            origin: "ws://localhost:3100".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidOrigin { .. })));
    }
}
