//! # Roles View State

use super::collection::{CollectionOrder, DomainCollection, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A role that can be assigned to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier
    pub role_id: u64,
    /// Role name, matched against RBAC rules
    #[serde(default)]
    pub role_name: Option<String>,
    /// Remaining server fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Role {
    type Id = u64;
    // Roles carry no creation time; keep snapshot order.
    const ORDER: CollectionOrder = CollectionOrder::Insertion;

    fn id(&self) -> u64 {
        self.role_id
    }
}

/// Roles state, insertion ordered.
pub type RolesState = DomainCollection<Role>;
