//! # Core Engine Module
//!
//! - [`SyncEngine`]: owns synced state, barrier, session and connection state
//! - [`EngineConfig`]: engine configuration with serde defaults

mod config;
mod engine;

pub use config::{EngineConfig, DEFAULT_WORKFLOW_MARKER};
pub use engine::SyncEngine;
