// src/watch/registry.rs

use std::collections::BTreeSet;

use tracing::trace;

use crate::state::Subscription;
use crate::types::FieldKey;

/// Every active observation owned by one orchestrator.
///
/// Besides the handles themselves this remembers which keys already have a
/// field watcher, so a key that is removed and added again never ends up
/// with two.
#[derive(Debug, Default)]
pub struct WatcherRegistry {
    handles: Vec<Subscription>,
    watched: BTreeSet<FieldKey>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle that is not tied to a field (the key-set watcher).
    pub fn register(&mut self, handle: Subscription) {
        trace!(label = handle.label(), "registered watcher");
        self.handles.push(handle);
    }

    /// Register the watcher for `key`. Returns false (and drops `handle`,
    /// which unsubscribes it) if the key is already watched.
    pub fn register_field(&mut self, key: &str, handle: Subscription) -> bool {
        if !self.watched.insert(key.to_string()) {
            return false;
        }
        self.register(handle);
        true
    }

    pub fn is_watching(&self, key: &str) -> bool {
        self.watched.contains(key)
    }

    pub fn watched_keys(&self) -> &BTreeSet<FieldKey> {
        &self.watched
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Remove every handle, leaving the registry empty.
    pub fn drain(&mut self) -> Vec<Subscription> {
        self.watched.clear();
        std::mem::take(&mut self.handles)
    }
}
