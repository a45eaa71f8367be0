//! Metrics collection for authorization operations.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics collector for the authorization system.
#[derive(Debug, Clone, Default)]
pub struct AuthzMetrics {
    /// Number of authorization checks performed.
    pub authorize_checks: Arc<AtomicU64>,
    /// Number of checks answered from the decision cache.
    pub cache_hits: Arc<AtomicU64>,
    /// Number of checks that recomputed a decision.
    pub cache_misses: Arc<AtomicU64>,
    /// Number of grant operations.
    pub grants: Arc<AtomicU64>,
    /// Number of revoke operations.
    pub revokes: Arc<AtomicU64>,
    /// Number of records dropped by post-filter validation.
    pub security_violations: Arc<AtomicU64>,
    /// Denial counts keyed by reason.
    pub denials: Arc<DashMap<String, AtomicU64>>,
}

impl AuthzMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an authorization check.
    pub fn record_check(&self) {
        self.authorize_checks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss.
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a grant operation.
    pub fn record_grant(&self) {
        self.grants.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a revoke operation.
    pub fn record_revoke(&self) {
        self.revokes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a post-filter security violation.
    pub fn record_security_violation(&self) {
        self.security_violations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a denial by reason tag.
    pub fn record_denial(&self, reason: &str) {
        self.denials
            .entry(reason.to_string())
            .and_modify(|count| {
                count.fetch_add(1, Ordering::Relaxed);
            })
            .or_insert_with(|| AtomicU64::new(1));
    }

    /// Cache hit ratio over all checks so far.
    pub fn cache_hit_ratio(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Snapshot of the current counters.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            authorize_checks: self.authorize_checks.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_hit_ratio: self.cache_hit_ratio(),
            grants: self.grants.load(Ordering::Relaxed),
            revokes: self.revokes.load(Ordering::Relaxed),
            security_violations: self.security_violations.load(Ordering::Relaxed),
            denials: self
                .denials
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.authorize_checks.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.grants.store(0, Ordering::Relaxed);
        self.revokes.store(0, Ordering::Relaxed);
        self.security_violations.store(0, Ordering::Relaxed);
        self.denials.clear();
    }
}

/// Summary of metrics.
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub authorize_checks: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_ratio: f64,
    pub grants: u64,
    pub revokes: u64,
    pub security_violations: u64,
    pub denials: HashMap<String, u64>,
}
