// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistent storage tier.
//!
//! The backing store is a dependency, not something this crate implements:
//! anything that can hold bytes under a (namespace, key) pair qualifies.
//! Failures are best-effort by contract. A read that cannot be served
//! returns `None`, a write that cannot be persisted is dropped, and the
//! caller treats both as a cache miss. The remote service is the source of
//! truth, so a cold cache costs performance, never correctness.

use async_trait::async_trait;
use dashmap::DashMap;

/// Byte-oriented key-value tier with best-effort semantics.
///
/// No method returns an error. Implementations log their own failures.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Read a value, or `None` if absent or unreadable.
    async fn get(&self, namespace: &str, key: &str) -> Option<Vec<u8>>;

    /// Write a value. Dropped silently on failure.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>);

    /// Remove a value if present.
    async fn remove(&self, namespace: &str, key: &str);

    /// Remove every value in a namespace.
    async fn clear(&self, namespace: &str);
}

/// In-memory persistent tier.
///
/// The default backing store for tests and for hosts that wire no disk
/// tier; survives for the life of the process only.
#[derive(Debug, Default)]
pub struct MemoryPersist {
    entries: DashMap<(String, String), Vec<u8>>,
}

impl MemoryPersist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held in a namespace.
    pub fn len(&self, namespace: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.key().0 == namespace)
            .count()
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }
}

#[async_trait]
impl PersistentStore for MemoryPersist {
    async fn get(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.entries
            .get(&(namespace.to_string(), key.to_string()))
            .map(|e| e.value().clone())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) {
        self.entries
            .insert((namespace.to_string(), key.to_string()), value);
    }

    async fn remove(&self, namespace: &str, key: &str) {
        self.entries
            .remove(&(namespace.to_string(), key.to_string()));
    }

    async fn clear(&self, namespace: &str) {
        self.entries.retain(|k, _| k.0 != namespace);
    }
}
