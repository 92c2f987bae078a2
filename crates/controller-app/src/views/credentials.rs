//! # Credentials View State

use super::collection::{CollectionOrder, DomainCollection, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A credential exchange record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Credential exchange identifier
    pub credential_exchange_id: String,
    /// Connection the credential was exchanged over
    #[serde(default)]
    pub connection_id: Option<String>,
    /// Exchange state as reported by the agent
    #[serde(default)]
    pub state: Option<String>,
    /// Creation time (ISO-8601)
    #[serde(default)]
    pub created_at: Option<String>,
    /// Remaining server fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Credential {
    type Id = String;
    const ORDER: CollectionOrder = CollectionOrder::NewestFirst;

    fn id(&self) -> String {
        self.credential_exchange_id.clone()
    }

    fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }
}

/// Credentials state, newest first.
pub type CredentialsState = DomainCollection<Credential>;
