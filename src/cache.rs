//! Decision cache with per-user invalidation.
//!
//! The cache is an optimization layer, never the system of record: disabling
//! it (always-miss) changes latency only, never a decision. Entries are
//! TTL-bounded, invalidated eagerly per user on any grant/revoke/role change,
//! and swept lazily on expiry. Writes are last-write-wins per key; a stale
//! read racing a concurrent invalidation is acceptable only within the TTL.

use crate::{core::AccessDecision, metrics::AuthzMetrics, scope::Scope};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Cache key covering every evaluation input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecisionKey {
    /// The evaluated user.
    pub user_id: String,
    /// Resource tag.
    pub resource: String,
    /// Action tag.
    pub action: String,
    /// Required scope of the check.
    pub scope: Scope,
    /// Fingerprint of the tenant context and contextual resource.
    pub fingerprint: String,
}

/// Cached decision with its creation time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The memoized decision.
    pub decision: AccessDecision,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(decision: AccessDecision) -> Self {
        Self {
            decision,
            created_at: Utc::now(),
        }
    }

    /// Check if the entry has outlived the TTL.
    pub fn is_expired(&self, ttl_seconds: u64) -> bool {
        Utc::now() - self.created_at >= Duration::seconds(ttl_seconds as i64)
    }
}

/// Memoized authorization decisions keyed per user.
#[derive(Debug)]
pub struct DecisionCache {
    enabled: bool,
    ttl_seconds: u64,
    entries: DashMap<DecisionKey, CacheEntry>,
    // user_id -> keys, for eager per-user invalidation
    user_index: DashMap<String, HashSet<DecisionKey>>,
    metrics: Arc<AuthzMetrics>,
}

impl DecisionCache {
    /// Create a cache. A disabled cache never stores or returns entries.
    pub fn new(enabled: bool, ttl_seconds: u64, metrics: Arc<AuthzMetrics>) -> Self {
        Self {
            enabled,
            ttl_seconds,
            entries: DashMap::new(),
            user_index: DashMap::new(),
            metrics,
        }
    }

    /// Whether caching is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Look up a decision, dropping it if expired.
    pub fn get(&self, key: &DecisionKey) -> Option<AccessDecision> {
        if !self.enabled {
            self.metrics.record_cache_miss();
            return None;
        }

        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(self.ttl_seconds) {
                self.metrics.record_cache_hit();
                return Some(entry.decision.clone());
            }
            drop(entry);
            self.remove_entry(key);
        }

        self.metrics.record_cache_miss();
        None
    }

    /// Store a decision. Last write wins per key.
    pub fn insert(&self, key: DecisionKey, decision: AccessDecision) {
        if !self.enabled {
            return;
        }
        self.user_index
            .entry(key.user_id.clone())
            .or_default()
            .insert(key.clone());
        self.entries.insert(key, CacheEntry::new(decision));
    }

    /// Drop every entry for a user. Called on any grant/revoke/role change
    /// touching that user; invalidation is authoritative over concurrent reads.
    pub fn invalidate_user(&self, user_id: &str) {
        if let Some((_, keys)) = self.user_index.remove(user_id) {
            for key in keys {
                self.entries.remove(&key);
            }
        }
    }

    /// Remove entries past their TTL.
    pub fn cleanup_expired(&self) {
        let expired: Vec<DecisionKey> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired(self.ttl_seconds))
            .map(|entry| entry.key().clone())
            .collect();
        for key in expired {
            self.remove_entry(&key);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
        self.user_index.clear();
    }

    /// Cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            indexed_users: self.user_index.len(),
        }
    }

    fn remove_entry(&self, key: &DecisionKey) {
        if self.entries.remove(key).is_some() {
            if let Some(mut keys) = self.user_index.get_mut(&key.user_id) {
                keys.remove(key);
                if keys.is_empty() {
                    drop(keys);
                    self.user_index.remove(&key.user_id);
                }
            }
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cached decisions.
    pub total_entries: usize,
    /// Number of users with cached decisions.
    pub indexed_users: usize,
}
