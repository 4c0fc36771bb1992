//! Bounded, insertion-ordered cache of resolved tracks.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::track::ResolvedTrack;

/// Maximum number of resolved tracks kept per resolver.
pub const CACHE_CAPACITY: usize = 10;

/// Track id → resolved track, evicting the oldest insertion first.
///
/// Eviction is FIFO: reads never refresh an entry, and overwriting an
/// existing id keeps its original position.
#[derive(Debug, Clone)]
pub struct ResolutionCache {
    capacity: usize,
    entries: HashMap<String, ResolvedTrack>,
    order: VecDeque<String>,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionCache {
    /// Creates an empty cache holding at most [`CACHE_CAPACITY`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(CACHE_CAPACITY)
    }

    /// Creates an empty cache with an explicit bound.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.saturating_add(1)),
            order: VecDeque::with_capacity(capacity.saturating_add(1)),
        }
    }

    /// Returns the cached track for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResolvedTrack> {
        self.entries.get(id)
    }

    /// Returns true when `id` is cached.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Inserts or overwrites `id`, returning the evicted id if the bound was exceeded.
    pub fn insert(&mut self, id: impl Into<String>, track: ResolvedTrack) -> Option<String> {
        let id = id.into();
        if self.entries.insert(id.clone(), track).is_none() {
            self.order.push_back(id);
        }

        if self.entries.len() > self.capacity {
            let oldest = self.order.pop_front()?;
            self.entries.remove(&oldest);
            debug!(evicted = %oldest, "resolution cache full; evicted oldest entry");
            return Some(oldest);
        }
        None
    }

    /// Removes `id`, returning its track if it was cached.
    pub fn remove(&mut self, id: &str) -> Option<ResolvedTrack> {
        let removed = self.entries.remove(id)?;
        self.order.retain(|key| key != id);
        Some(removed)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached ids, oldest insertion first.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}
