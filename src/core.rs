//! Core access system implementation.
//!
//! This module wires the principal store, the rule repository, the pure
//! resolver, and the legacy fallback into one facade the application embeds.
//! The facade owns the session caches; evaluation itself stays pure and
//! synchronous in [`crate::resolver`].
//!
//! # Thread safety
//!
//! All operations take `&self`; the store and repository guard their caches
//! internally, and checks only read snapshots. Share the system behind an
//! `Arc` across tasks.
//!
//! # Failure policy
//!
//! Check operations never fail open: an unreachable identity or rule
//! collaborator degrades to denial, and infrastructure errors surface only
//! through the explicit `refresh`/`refetch` operations.

#[cfg(feature = "audit")]
use log::{info, warn};

use crate::{
    catalog::{self, FeatureInfo, PageInfo},
    error::Result,
    legacy::{LegacyPermissionCheck, StaticLegacyPermissions},
    metrics::{AccessMetrics, MetricsSnapshot},
    principal::Principal,
    repository::{RuleRepository, RuleSource},
    resolver::{self, Decision},
    rule::{FeatureKey, PagePath},
    store::{IdentityProvider, PrincipalStore},
};
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;

/// Configuration for the access system.
#[derive(Debug, Clone, Default)]
pub struct AccessConfig {
    /// Well-known bootstrap super-admin email. A principal fetched with this
    /// email gets the super-admin flag; this is a recovery mechanism, not a
    /// general authorization primitive.
    pub super_admin_email: Option<String>,
    /// Timeout applied to identity and rule fetches.
    pub fetch_timeout: Option<Duration>,
}

impl AccessConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bootstrap super-admin email.
    pub fn super_admin_email(mut self, email: impl Into<String>) -> Self {
        self.super_admin_email = Some(email.into());
        self
    }

    /// Set the collaborator fetch timeout.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }
}

/// The layered permission system: principal store + rule repository +
/// resolver + legacy fallback.
pub struct AccessSystem<I, S>
where
    I: IdentityProvider,
    S: RuleSource,
{
    store: PrincipalStore<I>,
    repository: RuleRepository<S>,
    legacy: Box<dyn LegacyPermissionCheck>,
    metrics: Arc<AccessMetrics>,
}

impl<I, S> AccessSystem<I, S>
where
    I: IdentityProvider,
    S: RuleSource,
{
    /// Create an access system with default configuration and the built-in
    /// legacy permission table.
    pub fn new(identity: I, rules: S) -> Self {
        AccessSystemBuilder::new(identity, rules).build()
    }

    /// Create an access system with custom configuration.
    pub fn with_config(identity: I, rules: S, config: AccessConfig) -> Self {
        AccessSystemBuilder::new(identity, rules).config(config).build()
    }

    /// Load the session: refresh the principal, then the rule snapshot if
    /// authenticated.
    pub async fn init(&self) -> Result<()> {
        self.refresh_principal().await?;
        if let Some(principal) = self.store.principal().await {
            self.repository.refetch(&principal).await?;
        }
        Ok(())
    }

    /// Re-fetch the principal from the identity collaborator.
    ///
    /// Concurrent calls are coalesced. A successful refresh invalidates the
    /// rule cache, since the relevant rule set follows the principal; a
    /// failed one leaves both caches untouched.
    pub async fn refresh_principal(&self) -> Result<()> {
        self.store.refresh().await?;
        self.metrics.record_principal_refresh();
        self.repository.invalidate().await;
        Ok(())
    }

    /// Invalidate the rule cache and re-query rule storage.
    ///
    /// Call after the admin tooling edits rules. A no-op when no principal
    /// is loaded.
    pub async fn refetch_rules(&self) -> Result<()> {
        match self.store.principal().await {
            Some(principal) => self.repository.refetch(&principal).await,
            None => {
                self.repository.invalidate().await;
                Ok(())
            }
        }
    }

    /// Tear down the session caches (logout).
    pub async fn clear_session(&self) {
        self.store.clear().await;
        self.repository.invalidate().await;
    }

    /// Snapshot the current principal.
    pub async fn principal(&self) -> Option<Principal> {
        self.store.principal().await
    }

    /// Subscribe to principal changes; fires on every successful refresh or
    /// session teardown. Route guards refetch their gates when it fires.
    pub fn subscribe_principal_changes(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    /// Decide whether the current principal may use a feature.
    pub async fn decide_feature(&self, key: &FeatureKey) -> Decision {
        let principal = self.store.principal().await;
        let decision = match &principal {
            None => resolver::decide_feature(None, key, &[], self.legacy.as_ref()),
            Some(principal) => {
                let snapshot = self.repository.snapshot(principal).await;
                resolver::decide_feature(
                    Some(principal),
                    key,
                    snapshot.feature_rules(),
                    self.legacy.as_ref(),
                )
            }
        };
        self.record_decision("feature", key.as_str(), &decision);
        decision
    }

    /// Decide whether the current principal may open a page.
    pub async fn decide_page(&self, path: &PagePath) -> Decision {
        let principal = self.store.principal().await;
        let decision = match &principal {
            None => resolver::decide_page(None, path, &[]),
            Some(principal) => {
                let snapshot = self.repository.snapshot(principal).await;
                resolver::decide_page(Some(principal), path, snapshot.page_rules())
            }
        };
        self.record_decision("page", path.as_str(), &decision);
        decision
    }

    /// Check whether the current principal may use a feature.
    pub async fn has_feature_permission(&self, key: &FeatureKey) -> bool {
        self.decide_feature(key).await.is_granted()
    }

    /// Check whether the current principal may open a page.
    pub async fn has_page_permission(&self, path: &PagePath) -> bool {
        self.decide_page(path).await.is_granted()
    }

    /// Decide a batch of feature keys against one rule snapshot.
    pub async fn decide_features(&self, keys: &[FeatureKey]) -> Vec<(FeatureKey, Decision)> {
        let principal = self.store.principal().await;
        let snapshot = match &principal {
            Some(principal) => self.repository.snapshot(principal).await,
            None => Arc::new(crate::repository::RuleSnapshot::empty()),
        };

        keys.iter()
            .map(|key| {
                let decision = resolver::decide_feature(
                    principal.as_ref(),
                    key,
                    snapshot.feature_rules(),
                    self.legacy.as_ref(),
                );
                self.record_decision("feature", key.as_str(), &decision);
                (key.clone(), decision)
            })
            .collect()
    }

    /// Decide every cataloged feature for the current principal.
    ///
    /// Powers the admin permission matrix.
    pub async fn effective_feature_permissions(&self) -> Vec<(&'static FeatureInfo, Decision)> {
        let keys: Vec<FeatureKey> = catalog::AVAILABLE_FEATURES
            .iter()
            .map(|info| FeatureKey::from(info.key))
            .collect();

        catalog::AVAILABLE_FEATURES
            .iter()
            .zip(self.decide_features(&keys).await)
            .map(|(info, (_, decision))| (info, decision))
            .collect()
    }

    /// Decide every cataloged page for the current principal.
    pub async fn effective_page_permissions(&self) -> Vec<(&'static PageInfo, Decision)> {
        let principal = self.store.principal().await;
        let snapshot = match &principal {
            Some(principal) => self.repository.snapshot(principal).await,
            None => Arc::new(crate::repository::RuleSnapshot::empty()),
        };

        catalog::AVAILABLE_PAGES
            .iter()
            .map(|info| {
                let path = PagePath::from(info.path);
                let decision =
                    resolver::decide_page(principal.as_ref(), &path, snapshot.page_rules());
                self.record_decision("page", info.path, &decision);
                (info, decision)
            })
            .collect()
    }

    /// The shared metrics collector.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn record_decision(&self, kind: &str, subject: &str, decision: &Decision) {
        self.metrics.record_check(decision.is_granted());

        #[cfg(feature = "audit")]
        if decision.is_granted() {
            info!("Access GRANTED: {kind} '{subject}' via {:?}", decision.grant_tier());
        } else {
            warn!("Access DENIED: {kind} '{subject}' ({:?})", decision.deny_cause());
        }
        #[cfg(not(feature = "audit"))]
        let _ = (kind, subject);
    }
}

/// Builder for wiring an access system.
pub struct AccessSystemBuilder<I, S>
where
    I: IdentityProvider,
    S: RuleSource,
{
    identity: I,
    rules: S,
    config: AccessConfig,
    legacy: Box<dyn LegacyPermissionCheck>,
    metrics: Arc<AccessMetrics>,
}

impl<I, S> AccessSystemBuilder<I, S>
where
    I: IdentityProvider,
    S: RuleSource,
{
    /// Start a builder over the two collaborator boundaries.
    pub fn new(identity: I, rules: S) -> Self {
        Self {
            identity,
            rules,
            config: AccessConfig::default(),
            legacy: Box::new(StaticLegacyPermissions::new()),
            metrics: Arc::new(AccessMetrics::new()),
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: AccessConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bootstrap super-admin email.
    pub fn super_admin_email(mut self, email: impl Into<String>) -> Self {
        self.config.super_admin_email = Some(email.into());
        self
    }

    /// Set the collaborator fetch timeout.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = Some(timeout);
        self
    }

    /// Replace the legacy permission check implementation.
    pub fn legacy_check(mut self, legacy: Box<dyn LegacyPermissionCheck>) -> Self {
        self.legacy = legacy;
        self
    }

    /// Share an externally owned metrics collector.
    pub fn metrics(mut self, metrics: Arc<AccessMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Build the access system.
    pub fn build(self) -> AccessSystem<I, S> {
        let mut store = PrincipalStore::new(self.identity);
        if let Some(email) = &self.config.super_admin_email {
            store = store.with_super_admin_email(email.clone());
        }
        if let Some(timeout) = self.config.fetch_timeout {
            store = store.with_fetch_timeout(timeout);
        }

        let mut repository =
            RuleRepository::new(self.rules).with_metrics(Arc::clone(&self.metrics));
        if let Some(timeout) = self.config.fetch_timeout {
            repository = repository.with_fetch_timeout(timeout);
        }

        AccessSystem {
            store,
            repository,
            legacy: self.legacy,
            metrics: self.metrics,
        }
    }
}
