//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::authorization::Rules;
use crate::barrier::BarrierPolicy;
use crate::connection::DEFAULT_WS_PATH;
use crate::session::DEFAULT_SESSION_MINUTES;

/// Invitation workflow whose use focuses the consuming connection.
pub const DEFAULT_WORKFLOW_MARKER: &str = "test_id";

/// Configuration for [`super::SyncEngine`].
///
/// Every field has a default, so a partial TOML table is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether domain errors release pending initial fetches
    pub barrier_policy: BarrierPolicy,
    /// Workflow marker matched by `INVITATIONS`/`SINGLE_USE_USED`
    pub workflow_marker: String,
    /// Idle minutes before the session is ended locally
    pub session_minutes: u32,
    /// Websocket path joined onto the origin
    pub ws_path: String,
    /// Role → permission rules
    pub rules: Rules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            barrier_policy: BarrierPolicy::default(),
            workflow_marker: DEFAULT_WORKFLOW_MARKER.to_string(),
            session_minutes: DEFAULT_SESSION_MINUTES,
            ws_path: DEFAULT_WS_PATH.to_string(),
            rules: Rules::default(),
        }
    }
}

impl EngineConfig {
    /// Builder: set the barrier policy.
    #[must_use]
    pub fn with_barrier_policy(mut self, policy: BarrierPolicy) -> Self {
        self.barrier_policy = policy;
        self
    }

    /// Builder: replace the RBAC rules.
    #[must_use]
    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }
}
