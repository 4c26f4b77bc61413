//! Principal store: session-scoped cache of the authenticated principal.
//!
//! The store owns the cached principal and is the only component that
//! mutates it. Concurrent `refresh()` calls are coalesced so at most one
//! fetch per principal is in flight, and a failed fetch leaves the previous
//! cache untouched: stale data beats silently elevated (or dropped) access.

#[cfg(feature = "audit")]
use log::{info, warn};

use crate::{
    error::{Error, Result},
    principal::Principal,
};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::sync::{watch, Mutex, RwLock};

/// The identity/profile collaborator boundary.
///
/// Supplies the current session's principal. `Ok(None)` means the session is
/// unauthenticated; an `Err` means the collaborator could not be reached and
/// the store must keep its previous state.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fetch the current principal from the identity collaborator.
    async fn fetch_principal(&self) -> Result<Option<Principal>>;
}

#[async_trait::async_trait]
impl<I: IdentityProvider + ?Sized> IdentityProvider for std::sync::Arc<I> {
    async fn fetch_principal(&self) -> Result<Option<Principal>> {
        (**self).fetch_principal().await
    }
}

/// Session cache of the authenticated principal, with coalesced refresh and
/// change notification.
pub struct PrincipalStore<I> {
    provider: I,
    super_admin_email: Option<String>,
    fetch_timeout: Option<Duration>,
    cached: RwLock<Option<Principal>>,
    /// Bumped on every successful cache replacement; used both to coalesce
    /// concurrent refreshes and as the change-notification payload.
    generation: AtomicU64,
    refresh_gate: Mutex<()>,
    notifier: watch::Sender<u64>,
}

impl<I> PrincipalStore<I>
where
    I: IdentityProvider,
{
    /// Create a store over the given identity provider. The cache starts
    /// empty; call [`refresh`](Self::refresh) to load the session principal.
    pub fn new(provider: I) -> Self {
        let (notifier, _) = watch::channel(0);
        Self {
            provider,
            super_admin_email: None,
            fetch_timeout: None,
            cached: RwLock::new(None),
            generation: AtomicU64::new(0),
            refresh_gate: Mutex::new(()),
            notifier,
        }
    }

    /// Configure the well-known bootstrap super-admin email. A fetched
    /// principal with this email gets the super-admin flag regardless of
    /// what the identity payload carried.
    pub fn with_super_admin_email(mut self, email: impl Into<String>) -> Self {
        self.super_admin_email = Some(email.into());
        self
    }

    /// Configure a timeout for identity fetches.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Snapshot the cached principal. `None` when unauthenticated or not yet
    /// loaded.
    pub async fn principal(&self) -> Option<Principal> {
        self.cached.read().await.clone()
    }

    /// Whether a principal is currently cached.
    pub async fn is_authenticated(&self) -> bool {
        self.cached.read().await.is_some()
    }

    /// Re-fetch the principal from the identity collaborator.
    ///
    /// Safe to call concurrently: callers that arrive while a refresh is in
    /// flight wait for it and return without issuing a second fetch. On
    /// failure the previous cached principal stays in place and the error is
    /// surfaced; the cache is only ever replaced whole.
    pub async fn refresh(&self) -> Result<()> {
        let entry_generation = self.generation.load(Ordering::Acquire);
        let _gate = self.refresh_gate.lock().await;

        // Someone else completed a refresh while we waited for the gate;
        // their result is as fresh as ours would be.
        if self.generation.load(Ordering::Acquire) != entry_generation {
            return Ok(());
        }

        let fetched = match self.fetch_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.provider.fetch_principal())
                .await
                .map_err(|_| Error::FetchTimeout("identity".to_string()))?,
            None => self.provider.fetch_principal().await,
        };

        let principal = match fetched {
            Ok(principal) => principal,
            Err(e) => {
                #[cfg(feature = "audit")]
                warn!("Identity refresh failed, keeping previous principal: {e}");
                return Err(e);
            }
        };

        let principal = principal.map(|mut p| {
            if let Some(seed) = &self.super_admin_email {
                if p.email().eq_ignore_ascii_case(seed) {
                    p.grant_super_admin();
                }
            }
            p
        });

        #[cfg(feature = "audit")]
        match &principal {
            Some(p) => info!("Principal refreshed: {p}"),
            None => info!("Principal refreshed: unauthenticated session"),
        }

        *self.cached.write().await = principal;
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let _ = self.notifier.send(generation);
        Ok(())
    }

    /// Drop the cached principal (logout/teardown). Subscribers are notified.
    pub async fn clear(&self) {
        let _gate = self.refresh_gate.lock().await;
        *self.cached.write().await = None;
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let _ = self.notifier.send(generation);
    }

    /// Subscribe to principal changes. The receiver yields the new cache
    /// generation after every successful refresh or clear; callers typically
    /// refetch their rule lists when it fires.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }

    /// The current cache generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// In-memory identity provider for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryIdentity {
    principal: std::sync::RwLock<Option<Principal>>,
    fail: std::sync::atomic::AtomicBool,
    delay: std::sync::RwLock<Option<Duration>>,
    fetch_count: AtomicU64,
}

impl MemoryIdentity {
    /// Create an unauthenticated in-memory identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an identity that reports the given principal.
    pub fn with_principal(principal: Principal) -> Self {
        let identity = Self::new();
        identity.set_principal(Some(principal));
        identity
    }

    /// Replace the reported principal.
    pub fn set_principal(&self, principal: Option<Principal>) {
        *self.principal.write().expect("identity lock poisoned") = principal;
    }

    /// Make subsequent fetches fail (or succeed again).
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Release);
    }

    /// Add artificial latency to each fetch.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write().expect("identity lock poisoned") = Some(delay);
        self
    }

    /// How many fetches have been issued against this provider.
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Acquire)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn fetch_principal(&self) -> Result<Option<Principal>> {
        self.fetch_count.fetch_add(1, Ordering::AcqRel);
        let delay = *self.delay.read().expect("identity lock poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::Acquire) {
            return Err(Error::identity_fetch("simulated identity outage"));
        }
        Ok(self.principal.read().expect("identity lock poisoned").clone())
    }
}
