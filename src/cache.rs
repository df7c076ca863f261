//! Time-bounded result cache.
//!
//! Each memoised operation owns one [`TtlCache`] keyed by its arguments.
//! Entries only ever leave the cache by expiring; there is no explicit
//! invalidation and no capacity bound.

use crate::models::{AuthorRef, Bill, PartyCounts};
use moka::sync::Cache;
use std::hash::Hash;
use std::time::Duration;
use tracing::debug;

/// Map from key to value with a fixed time-to-live per entry.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    inner: Cache<K, V>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Look up a live entry. Expired entries are never returned.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Store a value, replacing any previous entry and restarting its TTL.
    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.run_pending_tasks();
        self.inner.entry_count() as usize
    }
}

/// Arguments of a party-count query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartyCountKey {
    pub bill_ids: Vec<u64>,
    pub use_all: bool,
}

/// One cache per memoised data-layer operation.
#[derive(Clone)]
pub struct QueryCache {
    /// `collect(start_year, end_year)`
    pub bills: TtlCache<(i32, i32), Vec<Bill>>,
    /// `authors_of(bill_id)`
    pub authors: TtlCache<u64, Vec<AuthorRef>>,
    /// `party_of(legislator_id)`
    pub parties: TtlCache<u64, String>,
    /// `party_counts(bills, use_all)`
    pub party_counts: TtlCache<PartyCountKey, PartyCounts>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        debug!("Result cache TTL: {}s", ttl.as_secs());
        Self {
            bills: TtlCache::new(ttl),
            authors: TtlCache::new(ttl),
            parties: TtlCache::new(ttl),
            party_counts: TtlCache::new(ttl),
        }
    }
}
