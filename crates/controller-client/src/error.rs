//! Client error types.

use controller_app::AppError;
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
use crate::config::ConfigError;
use crate::transport::TransportError;

/// Any error that stops the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration could not be loaded
    #[cfg(not(target_arch = "wasm32"))]
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Socket failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Engine rejected an operation
    #[error(transparent)]
    App(#[from] AppError),

    /// HTTP client could not be built
    #[cfg(not(target_arch = "wasm32"))]
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
