//! Rule repository: fetches and caches the permission rules relevant to a
//! principal.
//!
//! The repository owns the cached rule lists and is the only component that
//! mutates them. A load replaces the whole snapshot atomically or not at
//! all; a failed fetch falls back to the last good snapshot, or to empty
//! lists when there has never been one (fail closed: fewer permissions,
//! not more).

#[cfg(feature = "audit")]
use log::{debug, warn};

use crate::{
    error::{Error, Result},
    metrics::AccessMetrics,
    principal::Principal,
    rule::{FeatureRule, PageRule, RuleRecord},
};
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock};

/// The rule-storage collaborator boundary.
///
/// Implementations must return the union of (a) records whose user target is
/// the principal and (b) records whose role-tag target is one of the
/// principal's tags. A principal with no tags gets only clause (a): an
/// unset tag target never matches, and "no tag" is never a wildcard.
#[async_trait::async_trait]
pub trait RuleSource: Send + Sync {
    /// Fetch the feature-rule records relevant to the principal.
    async fn fetch_feature_rules(&self, principal: &Principal) -> Result<Vec<RuleRecord>>;

    /// Fetch the page-rule records relevant to the principal.
    async fn fetch_page_rules(&self, principal: &Principal) -> Result<Vec<RuleRecord>>;
}

#[async_trait::async_trait]
impl<S: RuleSource + ?Sized> RuleSource for Arc<S> {
    async fn fetch_feature_rules(&self, principal: &Principal) -> Result<Vec<RuleRecord>> {
        (**self).fetch_feature_rules(principal).await
    }

    async fn fetch_page_rules(&self, principal: &Principal) -> Result<Vec<RuleRecord>> {
        (**self).fetch_page_rules(principal).await
    }
}

/// An immutable snapshot of the rules loaded for one principal.
///
/// The resolver evaluates against a snapshot; concurrent checks share it
/// read-only.
#[derive(Debug, Clone, Default)]
pub struct RuleSnapshot {
    features: Vec<FeatureRule>,
    pages: Vec<PageRule>,
    fetched_at: Option<DateTime<Utc>>,
}

impl RuleSnapshot {
    /// The empty snapshot used when nothing has ever loaded successfully.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Feature rules in the snapshot.
    pub fn feature_rules(&self) -> &[FeatureRule] {
        &self.features
    }

    /// Page rules in the snapshot.
    pub fn page_rules(&self) -> &[PageRule] {
        &self.pages
    }

    /// When the snapshot was fetched; `None` for the empty snapshot.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}

/// Session cache of the rule lists relevant to the current principal.
pub struct RuleRepository<S> {
    source: S,
    fetch_timeout: Option<Duration>,
    cache: RwLock<Option<Arc<RuleSnapshot>>>,
    load_gate: Mutex<()>,
    metrics: Arc<AccessMetrics>,
}

impl<S> RuleRepository<S>
where
    S: RuleSource,
{
    /// Create a repository over the given rule source with an empty cache.
    pub fn new(source: S) -> Self {
        Self {
            source,
            fetch_timeout: None,
            cache: RwLock::new(None),
            load_gate: Mutex::new(()),
            metrics: Arc::new(AccessMetrics::new()),
        }
    }

    /// Configure a timeout applied to each rule fetch.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Share a metrics collector with the rest of the system.
    pub fn with_metrics(mut self, metrics: Arc<AccessMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get the cached snapshot, loading it on first use.
    ///
    /// On fetch failure this returns the last good snapshot if one exists,
    /// otherwise the empty snapshot; the failure itself is only logged. The
    /// cache is never poisoned with partial data.
    pub async fn snapshot(&self, principal: &Principal) -> Arc<RuleSnapshot> {
        if let Some(snapshot) = self.cache.read().await.clone() {
            self.metrics.record_cache_hit();
            return snapshot;
        }
        self.metrics.record_cache_miss();

        match self.load_if_missing(principal).await {
            Ok(snapshot) => snapshot,
            Err(_e) => {
                #[cfg(feature = "audit")]
                warn!("Rule fetch failed with no prior cache, resolving against empty rules: {_e}");
                // Last-known-good may have appeared while we were failing.
                match self.cache.read().await.clone() {
                    Some(snapshot) => snapshot,
                    None => Arc::new(RuleSnapshot::empty()),
                }
            }
        }
    }

    /// Feature rules for the principal, from the cached snapshot.
    pub async fn get_feature_rules(&self, principal: &Principal) -> Vec<FeatureRule> {
        self.snapshot(principal).await.feature_rules().to_vec()
    }

    /// Page rules for the principal, from the cached snapshot.
    pub async fn get_page_rules(&self, principal: &Principal) -> Vec<PageRule> {
        self.snapshot(principal).await.page_rules().to_vec()
    }

    /// Invalidate the cache and re-query the source.
    ///
    /// On failure the previous snapshot stays in place and the error is
    /// surfaced to the caller.
    pub async fn refetch(&self, principal: &Principal) -> Result<()> {
        let _gate = self.load_gate.lock().await;
        self.load_locked(principal).await.map(|_| ())
    }

    /// Drop the cached snapshot without re-querying (teardown/logout).
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Whether a snapshot is currently cached.
    pub async fn is_loaded(&self) -> bool {
        self.cache.read().await.is_some()
    }

    /// First-use load with stampede protection: callers that queued behind an
    /// in-flight load reuse its snapshot instead of fetching again.
    async fn load_if_missing(&self, principal: &Principal) -> Result<Arc<RuleSnapshot>> {
        let _gate = self.load_gate.lock().await;
        if let Some(snapshot) = self.cache.read().await.clone() {
            return Ok(snapshot);
        }
        self.load_locked(principal).await
    }

    /// Fetch both rule lists, convert them, and atomically replace the cache.
    /// Caller holds the load gate.
    async fn load_locked(&self, principal: &Principal) -> Result<Arc<RuleSnapshot>> {
        // The feature and page fetches are independent; run them together.
        let (feature_records, page_records) = tokio::join!(
            self.fetch_with_timeout(self.source.fetch_feature_rules(principal)),
            self.fetch_with_timeout(self.source.fetch_page_rules(principal)),
        );
        let (feature_records, page_records) = (feature_records?, page_records?);

        let snapshot = Arc::new(RuleSnapshot {
            features: self.convert_records(feature_records),
            pages: self.convert_records(page_records),
            fetched_at: Some(Utc::now()),
        });

        *self.cache.write().await = Some(Arc::clone(&snapshot));
        self.metrics.record_rule_load();

        #[cfg(feature = "audit")]
        debug!(
            "Rule snapshot loaded for '{}': {} feature rules, {} page rules",
            principal.id(),
            snapshot.feature_rules().len(),
            snapshot.page_rules().len()
        );

        Ok(snapshot)
    }

    async fn fetch_with_timeout(
        &self,
        fetch: impl std::future::Future<Output = Result<Vec<RuleRecord>>>,
    ) -> Result<Vec<RuleRecord>> {
        match self.fetch_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fetch)
                .await
                .map_err(|_| Error::FetchTimeout("rule storage".to_string()))?,
            None => fetch.await,
        }
    }

    /// Convert raw records to typed rules, skipping malformed rows.
    ///
    /// One bad row must not take resolution down; it is dropped with a
    /// warning and counted, and the rest of the list stands.
    fn convert_records<K: From<String>>(
        &self,
        records: Vec<RuleRecord>,
    ) -> Vec<crate::rule::PermissionRule<K>> {
        let mut rules = Vec::with_capacity(records.len());
        for record in records {
            match record.into_rule() {
                Ok(rule) => rules.push(rule),
                Err(_e) => {
                    self.metrics.record_skipped_record();
                    #[cfg(feature = "audit")]
                    warn!("Skipping malformed rule record: {_e}");
                }
            }
        }
        rules
    }
}

/// In-memory rule source for tests and embedding.
///
/// Enforces the exactly-one-target invariant at write time, the way the
/// admin tooling does against real rule storage.
#[derive(Debug, Default)]
pub struct MemoryRuleSource {
    feature_records: dashmap::DashMap<String, RuleRecord>,
    page_records: dashmap::DashMap<String, RuleRecord>,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryRuleSource {
    /// Create an empty in-memory rule source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature-rule record, enforcing the target invariant.
    pub fn insert_feature_record(&self, record: RuleRecord) -> Result<()> {
        record.validate()?;
        self.feature_records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Insert a page-rule record, enforcing the target invariant.
    pub fn insert_page_record(&self, record: RuleRecord) -> Result<()> {
        record.validate()?;
        self.page_records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Insert a feature-rule record without validation.
    ///
    /// Exists so tests can plant the malformed rows a buggy writer could
    /// leave behind and prove the repository skips them.
    pub fn insert_feature_record_unchecked(&self, record: RuleRecord) {
        self.feature_records.insert(record.id.clone(), record);
    }

    /// Remove a record from both tables by id.
    pub fn remove_record(&self, id: &str) {
        self.feature_records.remove(id);
        self.page_records.remove(id);
    }

    /// Make subsequent fetches fail (or succeed again).
    pub fn set_fail(&self, fail: bool) {
        self.fail
            .store(fail, std::sync::atomic::Ordering::Release);
    }

    fn query(
        table: &dashmap::DashMap<String, RuleRecord>,
        principal: &Principal,
    ) -> Vec<RuleRecord> {
        table
            .iter()
            .filter(|entry| {
                let record = entry.value();
                let user_match = record
                    .target_user
                    .as_deref()
                    .is_some_and(|user| user == principal.id().as_str());
                let tag_match = record
                    .target_role_tag
                    .as_deref()
                    .is_some_and(|tag| principal.role_tags().contains_str(tag));
                user_match || tag_match
            })
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl RuleSource for MemoryRuleSource {
    async fn fetch_feature_rules(&self, principal: &Principal) -> Result<Vec<RuleRecord>> {
        if self.fail.load(std::sync::atomic::Ordering::Acquire) {
            return Err(Error::rule_fetch("simulated rule storage outage"));
        }
        Ok(Self::query(&self.feature_records, principal))
    }

    async fn fetch_page_rules(&self, principal: &Principal) -> Result<Vec<RuleRecord>> {
        if self.fail.load(std::sync::atomic::Ordering::Acquire) {
            return Err(Error::rule_fetch("simulated rule storage outage"));
        }
        Ok(Self::query(&self.page_records, principal))
    }
}
