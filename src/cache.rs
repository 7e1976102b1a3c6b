//!
//! The entry cache: at most one entry object per canonical path.
//!
//! Entries are shared as `Arc<Entry>`, so two lookups of one path hand out the
//! same object. Inserting is an atomic check-and-insert under the write lock:
//! when two producers race on a path, the first insert wins and the second gets
//! the existing entry back.

use crate::entry::Entry;
use crate::path::LdapPath;
use crate::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Debug, Default)]
struct Slots {
    entries: HashMap<String, Arc<Entry>>,
    /// Insertion order, oldest first; only kept when the cache is bounded.
    order: VecDeque<String>,
}

/// Thread-safe map from canonical path to entry.
///
/// Unbounded by default. With a capacity, the oldest inserted entry is evicted
/// once the capacity is exceeded.
#[derive(Debug, Default)]
pub struct EntryCache {
    slots: RwLock<Slots>,
    capacity: Option<usize>,
}

impl EntryCache {
    /// Creates an unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Returns the entry cached for `path`, if any.
    pub fn get(&self, path: &LdapPath) -> Result<Option<Arc<Entry>>> {
        let slots = self.slots.read().map_err(|_| Error::CacheLock)?;
        Ok(slots.entries.get(&path.to_string()).cloned())
    }

    /// Caches `entry` under `path` unless the slot is taken.
    ///
    /// # Returns
    /// The entry held by the slot afterwards: `entry` itself if the slot was
    /// free, the previously cached entry otherwise.
    pub fn insert_if_absent(&self, path: &LdapPath, entry: Arc<Entry>) -> Result<Arc<Entry>> {
        let key = path.to_string();
        let mut slots = self.slots.write().map_err(|_| Error::CacheLock)?;
        if let Some(existing) = slots.entries.get(&key) {
            debug!(path = %key, "Entry already cached, keeping the first insert");
            return Ok(Arc::clone(existing));
        }
        self.store(&mut slots, key, Arc::clone(&entry));
        Ok(entry)
    }

    /// Caches `entry` under `path`, replacing whatever the slot held.
    pub fn replace(&self, path: &LdapPath, entry: Arc<Entry>) -> Result<Option<Arc<Entry>>> {
        let key = path.to_string();
        let mut slots = self.slots.write().map_err(|_| Error::CacheLock)?;
        let previous = slots.entries.remove(&key);
        if previous.is_some() {
            debug!(path = %key, "Replacing cached entry");
            slots.order.retain(|queued| queued != &key);
        }
        self.store(&mut slots, key, entry);
        Ok(previous)
    }

    /// Removes the entry cached for `path`.
    pub fn remove(&self, path: &LdapPath) -> Result<Option<Arc<Entry>>> {
        let key = path.to_string();
        let mut slots = self.slots.write().map_err(|_| Error::CacheLock)?;
        let removed = slots.entries.remove(&key);
        if removed.is_some() {
            slots.order.retain(|queued| queued != &key);
        }
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.slots.read().map_err(|_| Error::CacheLock)?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drops every cached entry. Entries still held by callers stay valid.
    pub fn clear(&self) -> Result<()> {
        let mut slots = self.slots.write().map_err(|_| Error::CacheLock)?;
        slots.entries.clear();
        slots.order.clear();
        Ok(())
    }

    /// Inserts into a free slot, evicting the oldest entries beyond capacity.
    fn store(&self, slots: &mut Slots, key: String, entry: Arc<Entry>) {
        if let Some(capacity) = self.capacity {
            slots.order.push_back(key.clone());
            while slots.order.len() > capacity {
                if let Some(oldest) = slots.order.pop_front() {
                    debug!(path = %oldest, "Evicting cached entry");
                    slots.entries.remove(&oldest);
                }
            }
        }
        slots.entries.insert(key, entry);
    }
}
