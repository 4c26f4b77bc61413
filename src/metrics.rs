//! Metrics collection for the access system.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for access system operations.
///
/// Cheap to share behind an `Arc`; every counter is a relaxed atomic.
#[derive(Debug, Default)]
pub struct AccessMetrics {
    permission_checks: AtomicU64,
    grants: AtomicU64,
    denials: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    rule_loads: AtomicU64,
    principal_refreshes: AtomicU64,
    skipped_records: AtomicU64,
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Permission checks evaluated.
    pub permission_checks: u64,
    /// Checks that granted access.
    pub grants: u64,
    /// Checks that denied access.
    pub denials: u64,
    /// Rule snapshot cache hits.
    pub cache_hits: u64,
    /// Rule snapshot cache misses.
    pub cache_misses: u64,
    /// Successful rule snapshot loads.
    pub rule_loads: u64,
    /// Successful principal refreshes.
    pub principal_refreshes: u64,
    /// Malformed rule records skipped at the repository boundary.
    pub skipped_records: u64,
}

impl AccessMetrics {
    /// Create a zeroed metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one permission check and its outcome.
    pub fn record_check(&self, granted: bool) {
        self.permission_checks.fetch_add(1, Ordering::Relaxed);
        if granted {
            self.grants.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denials.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a rule snapshot cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rule snapshot cache miss.
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful rule snapshot load.
    pub fn record_rule_load(&self) {
        self.rule_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful principal refresh.
    pub fn record_principal_refresh(&self) {
        self.principal_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a malformed rule record skipped at the boundary.
    pub fn record_skipped_record(&self) {
        self.skipped_records.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            permission_checks: self.permission_checks.load(Ordering::Relaxed),
            grants: self.grants.load(Ordering::Relaxed),
            denials: self.denials.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            rule_loads: self.rule_loads.load(Ordering::Relaxed),
            principal_refreshes: self.principal_refreshes.load(Ordering::Relaxed),
            skipped_records: self.skipped_records.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_counters() {
        let metrics = AccessMetrics::new();
        metrics.record_check(true);
        metrics.record_check(true);
        metrics.record_check(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.permission_checks, 3);
        assert_eq!(snapshot.grants, 2);
        assert_eq!(snapshot.denials, 1);
    }

    #[test]
    fn test_cache_counters() {
        let metrics = AccessMetrics::new();
        metrics.record_cache_miss();
        metrics.record_rule_load();
        metrics.record_cache_hit();
        metrics.record_cache_hit();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits, 2);
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.rule_loads, 1);
    }
}
