//! # Contacts View State

use super::collection::{CollectionOrder, DomainCollection, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A contact (connection peer) known to the controller.
///
/// Only the fields the sync engine reasons about are typed; everything else
/// the server sends (demographics, passport, ...) is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact identifier
    pub contact_id: u64,
    /// Display label
    #[serde(default)]
    pub label: Option<String>,
    /// Creation time (ISO-8601)
    #[serde(default)]
    pub created_at: Option<String>,
    /// Remaining server fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Contact {
    type Id = u64;
    const ORDER: CollectionOrder = CollectionOrder::NewestFirst;

    fn id(&self) -> u64 {
        self.contact_id
    }

    fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }
}

/// Contacts state, newest first.
pub type ContactsState = DomainCollection<Contact>;
