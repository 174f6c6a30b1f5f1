//! Record store and cache abstractions
//!
//! The engine never touches a database directly: profiles live behind
//! [`ProfileStore`], a keyed record store with serialized per-key
//! read-modify-write, and derived snapshots sit in an explicit, injected
//! [`TtlCache`] rather than any ambient global cache layer.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;

use crate::engine::profile::{BehaviorProfile, ProfileKey};

// ============================================================================
// Profile store
// ============================================================================

/// Store-level errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An optimistic backend lost the write race too many times.
    #[error("write conflict after {attempts} attempts")]
    Conflict {
        /// Attempts made before giving up
        attempts: u32,
    },
}

/// Keyed profile store with serialized per-key mutation.
///
/// `update` runs the closure under whatever serialization discipline the
/// backend provides — an entry lock for the in-memory store, an optimistic
/// version check with bounded retries for a persistent one. Two concurrent
/// updates of the same key must both be reflected; losing one silently is a
/// correctness bug, not an acceptable race.
pub trait ProfileStore: Send + Sync {
    /// Returns a clone of the profile, if present.
    fn load(&self, key: &ProfileKey) -> Option<BehaviorProfile>;

    /// Inserts or replaces a profile.
    fn upsert(&self, profile: BehaviorProfile);

    /// Mutates the profile under the store's serialization discipline.
    ///
    /// Returns `Ok(false)` when the key is absent; the closure is not run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when an optimistic backend
    /// exhausts its retries. Callers skip the mutation and log — the chat
    /// reply still succeeds.
    fn update(
        &self,
        key: &ProfileKey,
        f: &mut dyn FnMut(&mut BehaviorProfile),
    ) -> Result<bool, StoreError>;

    /// Clones of all profiles belonging to an agent.
    fn agent_profiles(&self, agent_id: &str) -> Vec<BehaviorProfile>;
}

/// In-memory profile store on `DashMap`.
///
/// Per-key serialization comes from the map's entry guard: `update` holds
/// the shard write lock for the duration of the closure, so concurrent
/// updates of one key queue rather than race. Recomputation is pure math,
/// so hold times are sub-microsecond.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: DashMap<ProfileKey, BehaviorProfile>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileStore for MemoryStore {
    fn load(&self, key: &ProfileKey) -> Option<BehaviorProfile> {
        self.profiles.get(key).map(|p| p.clone())
    }

    fn upsert(&self, profile: BehaviorProfile) {
        self.profiles.insert(profile.key.clone(), profile);
    }

    fn update(
        &self,
        key: &ProfileKey,
        f: &mut dyn FnMut(&mut BehaviorProfile),
    ) -> Result<bool, StoreError> {
        match self.profiles.get_mut(key) {
            Some(mut guard) => {
                f(guard.value_mut());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn agent_profiles(&self, agent_id: &str) -> Vec<BehaviorProfile> {
        self.profiles
            .iter()
            .filter(|entry| entry.key().agent_id == agent_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

// ============================================================================
// TTL cache
// ============================================================================

/// Explicit cache with per-instance TTL: get/set/invalidate, nothing
/// ambient. A `None` TTL disables caching entirely, which is the default.
pub struct TtlCache<V> {
    entries: DashMap<String, (Instant, V)>,
    ttl: Option<Duration>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a cache with the given TTL; `None` disables it.
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Returns the cached value if present and fresh.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        let ttl = self.ttl?;
        let entry = self.entries.get(key)?;
        let (stored_at, value) = entry.value();
        if stored_at.elapsed() < ttl {
            Some(value.clone())
        } else {
            drop(entry);
            self.entries.remove(key);
            None
        }
    }

    /// Stores a value. No-op when caching is disabled.
    pub fn set(&self, key: &str, value: V) {
        if self.ttl.is_some() {
            self.entries.insert(key.to_string(), (Instant::now(), value));
        }
    }

    /// Drops the entry for a key.
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
