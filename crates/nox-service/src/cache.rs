//! # Venue Cache
//!
//! Per-venue cache of live session snapshots for read endpoints.
//!
//! ## Cache Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Venue Cache                                       │
//! │                                                                         │
//! │  Read path (floor overview, destination displays):                     │
//! │    get(venue) ── hit ──► cached snapshots                              │
//! │              └── miss ─► caller hydrates from db, store(venue, ..)     │
//! │                                                                         │
//! │  Write path (EVERY mutation):                                          │
//! │    invalidate(venue)  ← unconditional, before returning                │
//! │                                                                         │
//! │  BILLING NEVER READS THIS CACHE. Invoice generation always loads a     │
//! │  fresh session snapshot from the database; the cache only serves       │
//! │  list-style reads where a stale-by-one-poll view is acceptable.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! `Arc<Mutex<..>>`: lookups clone out and release the lock immediately.
//! Operations are quick and most of them write, so a RwLock would add
//! complexity with minimal benefit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use nox_core::SessionWithOrders;

/// Cache of live session snapshots, keyed by venue.
///
/// Cheap to clone; all clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct VenueCache {
    inner: Arc<Mutex<HashMap<String, Vec<SessionWithOrders>>>>,
}

impl VenueCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        VenueCache::default()
    }

    /// Returns the cached snapshots for a venue, if present.
    pub fn get(&self, venue_id: &str) -> Option<Vec<SessionWithOrders>> {
        let map = self.inner.lock().expect("Venue cache mutex poisoned");
        map.get(venue_id).cloned()
    }

    /// Stores hydrated snapshots for a venue.
    pub fn store(&self, venue_id: &str, sessions: Vec<SessionWithOrders>) {
        let mut map = self.inner.lock().expect("Venue cache mutex poisoned");
        map.insert(venue_id.to_string(), sessions);
    }

    /// Drops the cached snapshots for a venue.
    ///
    /// Called unconditionally after every mutation touching the venue,
    /// and on inbound feed events from other processes.
    pub fn invalidate(&self, venue_id: &str) {
        let mut map = self.inner.lock().expect("Venue cache mutex poisoned");
        if map.remove(venue_id).is_some() {
            debug!(venue_id = %venue_id, "Venue cache invalidated");
        }
    }

    /// Drops everything (startup, reconnect).
    pub fn clear(&self) {
        let mut map = self.inner.lock().expect("Venue cache mutex poisoned");
        map.clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_store_then_hit() {
        let cache = VenueCache::new();
        assert!(cache.get("venue-1").is_none());

        cache.store("venue-1", Vec::new());
        assert_eq!(cache.get("venue-1").unwrap().len(), 0);
    }

    #[test]
    fn test_invalidate_is_per_venue() {
        let cache = VenueCache::new();
        cache.store("venue-1", Vec::new());
        cache.store("venue-2", Vec::new());

        cache.invalidate("venue-1");
        assert!(cache.get("venue-1").is_none());
        assert!(cache.get("venue-2").is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let cache = VenueCache::new();
        let clone = cache.clone();

        cache.store("venue-1", Vec::new());
        assert!(clone.get("venue-1").is_some());

        clone.invalidate("venue-1");
        assert!(cache.get("venue-1").is_none());
    }
}
