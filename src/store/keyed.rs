// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Two-tier keyed entity store.
//!
//! L1 is a bounded in-memory map; L2 is the injected [`PersistentStore`].
//! Writes go through both tiers; exceeding the L1 bound evicts the oldest
//! in-memory entry, which stays persisted in L2. Reads hit L1 first and
//! promote L2 hits back into L1. There is no expiry.
//!
//! Every operation is infallible from the caller's view: storage and codec
//! failures degrade to a miss.

use crate::store::PersistentStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

struct MemoryTier<V> {
    map: HashMap<String, V>,
    /// Insertion order, oldest first; drives eviction.
    order: VecDeque<String>,
}

/// A named two-tier cache mapping string keys to one entity type.
pub struct KeyedStore<V> {
    namespace: &'static str,
    capacity: usize,
    memory: Mutex<MemoryTier<V>>,
    persist: Arc<dyn PersistentStore>,
}

impl<V> KeyedStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send,
{
    /// Create a store over the given namespace with an L1 bound of
    /// `capacity` entries.
    pub fn new(namespace: &'static str, capacity: usize, persist: Arc<dyn PersistentStore>) -> Self {
        Self {
            namespace,
            capacity: capacity.max(1),
            memory: Mutex::new(MemoryTier {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            persist,
        }
    }

    /// Look up a value. Non-suspending when the entry is memory-resident.
    pub async fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.get_memory(key) {
            return Some(value);
        }

        let bytes = self.persist.get(self.namespace, key).await?;
        match serde_json::from_slice::<V>(&bytes) {
            Ok(value) => {
                self.insert_memory(key, value.clone());
                Some(value)
            }
            Err(err) => {
                tracing::debug!(namespace = self.namespace, key, error = %err, "Undecodable cache entry, treating as miss");
                None
            }
        }
    }

    /// L1-only lookup; never touches the persistent tier.
    pub fn get_memory(&self, key: &str) -> Option<V> {
        let memory = self.memory.lock().expect("store mutex poisoned");
        memory.map.get(key).cloned()
    }

    /// Store a value under `key` in both tiers.
    pub async fn set(&self, key: &str, value: V) {
        let bytes = match serde_json::to_vec(&value) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                tracing::debug!(namespace = self.namespace, key, error = %err, "Unencodable cache entry, memory tier only");
                None
            }
        };

        self.insert_memory(key, value);

        if let Some(bytes) = bytes {
            self.persist.set(self.namespace, key, bytes).await;
        }
    }

    /// Remove a value from both tiers. No-op if absent.
    pub async fn remove(&self, key: &str) {
        {
            let mut memory = self.memory.lock().expect("store mutex poisoned");
            if memory.map.remove(key).is_some() {
                memory.order.retain(|k| k != key);
            }
        }
        self.persist.remove(self.namespace, key).await;
    }

    /// Drop every entry in this store's namespace.
    pub async fn remove_all(&self) {
        {
            let mut memory = self.memory.lock().expect("store mutex poisoned");
            memory.map.clear();
            memory.order.clear();
        }
        self.persist.clear(self.namespace).await;
    }

    fn insert_memory(&self, key: &str, value: V) {
        let mut memory = self.memory.lock().expect("store mutex poisoned");
        if memory.map.insert(key.to_string(), value).is_none() {
            memory.order.push_back(key.to_string());
        }
        // Evict oldest entries to the persistent tier (they were written
        // through on set, so eviction only drops the memory copy).
        while memory.map.len() > self.capacity {
            match memory.order.pop_front() {
                Some(oldest) => {
                    memory.map.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPersist;

    fn store(capacity: usize) -> KeyedStore<String> {
        KeyedStore::new("test", capacity, Arc::new(MemoryPersist::new()))
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = store(10);
        store.set("a", "alpha".to_string()).await;
        assert_eq!(store.get("a").await.as_deref(), Some("alpha"));
    }

    #[tokio::test]
    async fn eviction_falls_back_to_persistent_tier() {
        let store = store(2);
        store.set("a", "alpha".to_string()).await;
        store.set("b", "beta".to_string()).await;
        store.set("c", "gamma".to_string()).await;

        // "a" was evicted from memory but survives in L2.
        assert!(store.get_memory("a").is_none());
        assert_eq!(store.get("a").await.as_deref(), Some("alpha"));
        // The L2 hit was promoted back into memory.
        assert!(store.get_memory("a").is_some());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = store(10);
        store.set("a", "alpha".to_string()).await;
        store.remove("a").await;
        store.remove("a").await;
        assert!(store.get("a").await.is_none());
    }

    #[tokio::test]
    async fn overwrite_does_not_grow_eviction_order() {
        let store = store(2);
        store.set("a", "one".to_string()).await;
        store.set("a", "two".to_string()).await;
        store.set("b", "three".to_string()).await;
        assert_eq!(store.get_memory("a").as_deref(), Some("two"));
        assert_eq!(store.get_memory("b").as_deref(), Some("three"));
    }
}
