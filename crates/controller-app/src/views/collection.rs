//! # Domain Collection
//!
//! An ordered, id-unique collection for synced domain records, plus the pure
//! reconciliation step that folds a server snapshot into it.
//!
//! This module provides [`DomainCollection`], a generic container that:
//! - Keeps records in display order (newest-first or insertion order)
//! - Guarantees no two records share an id
//! - Never mutates in place: every change returns a new collection, and the
//!   owning state holder swaps it in
//!
//! ## Example
//!
//! ```rust,ignore
//! use controller_app::views::DomainCollection;
//!
//! let contacts: DomainCollection<Contact> = DomainCollection::new();
//! let contacts = contacts.reconciled(&snapshot);
//! let contact = contacts.get(&contact_id);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Display order a domain keeps after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionOrder {
    /// Sorted descending by creation timestamp
    NewestFirst,
    /// Incoming snapshot first, then surviving older records
    Insertion,
}

/// A record that lives in a [`DomainCollection`].
pub trait Record: Clone {
    /// Domain-specific unique key (`contact_id`, `user_id`, ...)
    type Id: Eq + Hash + Clone + fmt::Debug;

    /// Ordering applied after every reconciliation.
    const ORDER: CollectionOrder;

    /// The record's unique key.
    fn id(&self) -> Self::Id;

    /// Creation timestamp, ISO-8601 so that lexical order is chronological.
    fn created_at(&self) -> Option<&str> {
        None
    }
}

/// Fold `incoming` into `existing`, incoming wins per id.
///
/// Every existing element whose id appears in `incoming` is dropped, then the
/// result is `incoming` followed by the surviving existing elements, both in
/// their original order. An empty `incoming` returns `existing` unchanged:
/// deletions are never inferred from absence.
///
/// If `incoming` itself repeats an id, the last occurrence wins.
pub fn reconcile<T, K, F>(existing: &[T], incoming: &[T], id_of: F) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen: HashSet<K> = HashSet::with_capacity(incoming.len());
    let mut fresh: Vec<T> = Vec::with_capacity(incoming.len());
    for item in incoming.iter().rev() {
        if seen.insert(id_of(item)) {
            fresh.push(item.clone());
        }
    }
    fresh.reverse();

    let mut merged = Vec::with_capacity(fresh.len() + existing.len());
    merged.extend(fresh);
    merged.extend(
        existing
            .iter()
            .filter(|item| !seen.contains(&id_of(item)))
            .cloned(),
    );
    merged
}

/// Stable sort, newest `created_at` first. Records without a timestamp sink
/// to the end.
pub fn sort_newest_first<T: Record>(items: &mut [T]) {
    items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
}

/// An ordered domain collection with unique ids.
///
/// # Design Principles
///
/// 1. **No selection state**: focus and current-record views live elsewhere
/// 2. **Replace, don't alias**: mutations return a new collection
/// 3. **Explicit deletes**: records only leave via [`DomainCollection::without`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainCollection<T> {
    items: Vec<T>,
}

impl<T> Default for DomainCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Record> DomainCollection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from raw records, dropping duplicate ids and
    /// applying the domain ordering.
    pub fn from_records(records: impl IntoIterator<Item = T>) -> Self {
        let records: Vec<T> = records.into_iter().collect();
        Self::new().reconciled(&records)
    }

    // ─── Queries ─────────────────────────────────────────────

    /// Get a record by id.
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| &item.id() == id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &T::Id) -> bool {
        self.get(id).is_some()
    }

    /// Records in display order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterate records in display order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// All ids in display order.
    pub fn ids(&self) -> Vec<T::Id> {
        self.items.iter().map(T::id).collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // ─── Transitions ─────────────────────────────────────────

    /// Merge a snapshot in, then apply the domain ordering.
    #[must_use]
    pub fn reconciled(&self, incoming: &[T]) -> Self {
        let mut items = reconcile(&self.items, incoming, T::id);
        if T::ORDER == CollectionOrder::NewestFirst {
            sort_newest_first(&mut items);
        }
        Self { items }
    }

    /// Append a newly created record at the end, without re-sorting.
    ///
    /// A created record should not already be present; if the server repeats
    /// a create, the stale copy is dropped so ids stay unique.
    #[must_use]
    pub fn appended(&self, record: T) -> Self {
        let id = record.id();
        let mut items: Vec<T> = self
            .items
            .iter()
            .filter(|item| item.id() != id)
            .cloned()
            .collect();
        items.push(record);
        Self { items }
    }

    /// Replace the record with the same id in place. Order is unchanged and a
    /// record that is not present is ignored.
    #[must_use]
    pub fn replaced(&self, record: T) -> Self {
        let id = record.id();
        let items = self
            .items
            .iter()
            .map(|item| {
                if item.id() == id {
                    record.clone()
                } else {
                    item.clone()
                }
            })
            .collect();
        Self { items }
    }

    /// Drop the record with the given id, if present.
    #[must_use]
    pub fn without(&self, id: &T::Id) -> Self {
        let items = self
            .items
            .iter()
            .filter(|item| &item.id() != id)
            .cloned()
            .collect();
        Self { items }
    }
}

impl<'a, T> IntoIterator for &'a DomainCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ─── Tests ───────────────────────────────────────────────────
