//! Identity-map cache.

use std::collections::HashMap;
use trackwire_model::Record;
use trackwire_types::{Identity, Result};

/// Derives the cache key of `record`.
///
/// Depends only on the record type and primary-key values, and never
/// fetches.
pub fn key(record: &Record) -> Result<Identity> {
    record.identity()
}

/// One canonical [`Record`] instance per identity.
///
/// Entries are only ever added or refreshed through
/// [`Session::merge`](crate::Session::merge); the cache itself never replaces
/// an existing instance.
#[derive(Debug, Default)]
pub struct Cache {
    entries: HashMap<Identity, Record>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Identity) -> Option<Record> {
        self.entries.get(key).cloned()
    }

    /// Stores `record` under `key` unless an instance is already cached,
    /// returning the canonical instance.
    pub fn insert(&mut self, key: Identity, record: Record) -> Record {
        self.entries.entry(key).or_insert(record).clone()
    }

    pub fn remove(&mut self, key: &Identity) -> Option<Record> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &Identity) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Identity> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
