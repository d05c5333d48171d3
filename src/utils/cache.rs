//! In-memory result cache
//!
//! Thread-safe caching layer for resolved analysis results, keyed by the
//! canonical query key. DashMap gives concurrent access without lock
//! contention. TTL is per entry: partial results expire fast so a healthy
//! re-resolution can replace them, complete ones live by query kind.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::models::query::QueryKey;
use crate::models::types::AnalysisResult;

/// Cache entry with its own TTL
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub result: AnalysisResult,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(result: AnalysisResult, ttl: Duration) -> Self {
        Self {
            result,
            created_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    /// Seconds left before expiry
    pub fn remaining_ttl(&self) -> u64 {
        self.ttl
            .saturating_sub(self.created_at.elapsed())
            .as_secs()
    }
}

/// Shared result cache with hit/miss accounting
#[derive(Clone, Default)]
pub struct ResultCache {
    store: Arc<DashMap<QueryKey, CacheEntry>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get with TTL validation. Expired entries are removed on read.
    pub fn get(&self, key: &QueryKey) -> Option<AnalysisResult> {
        if let Some(entry) = self.store.get(key) {
            if entry.is_expired() {
                drop(entry); // release read lock before removing
                self.store.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("CACHE MISS (expired): {}", key);
                None
            } else {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("CACHE HIT: {} ({}s remaining)", key, entry.remaining_ttl());
                Some(entry.result.clone())
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("CACHE MISS: {}", key);
            None
        }
    }

    pub fn set(&self, key: QueryKey, result: AnalysisResult, ttl: Duration) {
        debug!("CACHE SET: {} (TTL {}s)", key, ttl.as_secs());
        self.store.insert(key, CacheEntry::new(result, ttl));
    }

    /// Drop one entry; used by forced refresh
    pub fn invalidate(&self, key: &QueryKey) {
        self.store.remove(key);
        debug!("CACHE INVALIDATE: {}", key);
    }

    /// Sweep expired entries; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        let removed = before - self.store.len();
        if removed > 0 {
            info!("CACHE CLEANUP: {} expired entries removed", removed);
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries: self.store.len(),
            hits,
            misses,
            hit_rate,
        }
    }
}

/// Cache statistics for the stats endpoint
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}
