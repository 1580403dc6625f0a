//! In-flight registry and the reservation guard

use crate::types::{InFlightEntry, ResourceKey};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct Slot {
    id: u64,
    entry: InFlightEntry,
}

#[derive(Debug, Default)]
struct Entries {
    next_id: u64,
    slots: HashMap<ResourceKey, Slot>,
}

/// Map of resource keys with a fetch in progress
///
/// The lock covers only map reads and writes; nothing blocks while holding it.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    entries: Arc<Mutex<Entries>>,
}

impl InFlightRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // every critical section leaves the map consistent, so a panic elsewhere
        // cannot leave it half-updated
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check for `key` and insert it in one critical section
    ///
    /// Returns `None` if a fetch for `key` is already registered.
    pub fn try_reserve(&self, key: &ResourceKey) -> Option<Reservation> {
        let mut entries = self.lock();
        if entries.slots.contains_key(key) {
            return None;
        }

        let id = entries.next_id;
        entries.next_id = entries.next_id.wrapping_add(1);
        entries.slots.insert(
            key.clone(),
            Slot {
                id,
                entry: InFlightEntry {
                    key: key.clone(),
                    started_at: Utc::now(),
                },
            },
        );
        drop(entries);

        tracing::debug!(url = %key, "Reserved resource key");
        Some(Reservation {
            registry: self.clone(),
            key: key.clone(),
            id,
        })
    }

    /// Remove the entry for `key`, whoever holds it; no-op if absent
    pub fn release(&self, key: &ResourceKey) {
        if self.lock().slots.remove(key).is_some() {
            tracing::debug!(url = %key, "Released resource key");
        }
    }

    /// Remove the entry for `key` only if it is still reservation `id`
    fn release_reservation(&self, key: &ResourceKey, id: u64) {
        let mut entries = self.lock();
        if entries.slots.get(key).is_some_and(|slot| slot.id == id) {
            entries.slots.remove(key);
            drop(entries);
            tracing::debug!(url = %key, "Released resource key");
        }
    }

    /// Whether `key` currently has a fetch registered
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.lock().slots.contains_key(key)
    }

    /// Number of registered fetches
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    /// Whether no fetch is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies of all entries, oldest admission first
    pub fn snapshot(&self) -> Vec<InFlightEntry> {
        let entries = self.lock();
        let mut slots: Vec<&Slot> = entries.slots.values().collect();
        slots.sort_by_key(|slot| slot.id);
        slots.into_iter().map(|slot| slot.entry.clone()).collect()
    }
}

/// Proof that a resource key is reserved
///
/// Dropping the reservation releases the key. A reservation only ever removes
/// its own entry, so a stale guard cannot release a newer fetch of the same key.
#[derive(Debug)]
#[must_use = "dropping a reservation releases the key immediately"]
pub struct Reservation {
    registry: InFlightRegistry,
    key: ResourceKey,
    id: u64,
}

impl Reservation {
    /// Reserved key
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.registry.release_reservation(&self.key, self.id);
    }
}
