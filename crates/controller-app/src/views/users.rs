//! # Users View State

use super::collection::{CollectionOrder, DomainCollection, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A controller user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User identifier
    pub user_id: u64,
    /// Login name
    #[serde(default)]
    pub username: Option<String>,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
    /// Creation time (ISO-8601)
    #[serde(default)]
    pub created_at: Option<String>,
    /// Remaining server fields (roles, flags, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for User {
    type Id = u64;
    const ORDER: CollectionOrder = CollectionOrder::NewestFirst;

    fn id(&self) -> u64 {
        self.user_id
    }

    fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }
}

/// Users state, newest first.
pub type UsersState = DomainCollection<User>;
