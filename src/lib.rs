//! # Troupe Access
//!
//! This crate provides the layered permission system for a membership
//! application: per-user rule overrides, role-tag grants, a super-admin
//! override, and a legacy permission-name fallback, resolved under a fixed
//! precedence order.
//!
//! ## Features
//!
//! - Fixed four-tier resolution: super-admin short-circuit, authoritative
//!   per-user rules, disjunctive role-tag grants, legacy name fallback
//! - Pure, synchronous evaluation over cached snapshots
//! - Session-scoped principal store with coalesced refresh and change
//!   notification
//! - Rule repository with atomic snapshot replacement and fail-closed
//!   fallback
//! - Decision provenance for admin tooling
//! - Static feature/page catalogs
//! - Batch and effective-permission evaluation
//! - Metrics counters and audit logging
//!
//! ## Quick Start
//!
//! ```rust
//! use troupe_access::{
//!     AccessSystem, MemoryIdentity, MemoryRuleSource, Principal, Role, RoleTag, RuleRecord,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), troupe_access::Error> {
//! // The identity and rule-storage collaborators (in-memory here).
//! let identity = MemoryIdentity::with_principal(
//!     Principal::new("user-1", "treasurer@example.org", Role::Member)
//!         .with_tag(RoleTag::new("Treasurer")?),
//! );
//! let rules = MemoryRuleSource::new();
//! rules.insert_feature_record(RuleRecord::tag_scoped(
//!     "financial_management",
//!     "Treasurer",
//!     true,
//! ))?;
//!
//! // Wire the system and load the session.
//! let access = AccessSystem::new(identity, rules);
//! access.init().await?;
//!
//! assert!(access.has_feature_permission(&"financial_management".into()).await);
//! assert!(!access.has_page_permission(&"/admin".into()).await);
//! # Ok(())
//! # }
//! ```
//!
//! ## Audit Logging
//!
//! When the `audit` feature is enabled, permission decisions and cache
//! events are logged through the standard Rust logging framework:
//!
//! ```rust
//! use troupe_access::init_audit_logger;
//!
//! // Initialize logging (must be called early in program execution)
//! init_audit_logger();
//!
//! // Configure log level through RUST_LOG environment variable:
//! // RUST_LOG=info,troupe_access=debug
//! ```

#[cfg(feature = "audit")]
pub fn init_audit_logger() {
    env_logger::init();
}

pub mod catalog;
pub mod core;
pub mod error;
pub mod legacy;
pub mod macros;
pub mod metrics;
pub mod principal;


pub mod repository;
pub mod resolver;
pub mod rule;
pub mod store;

// Re-export main types for convenience
pub use crate::{
    core::{AccessConfig, AccessSystem, AccessSystemBuilder},
    error::Error,
    legacy::{DenyAllLegacy, LegacyPermissionCheck, StaticLegacyPermissions},
    metrics::{AccessMetrics, MetricsSnapshot},
    principal::{Principal, PrincipalBuilder, PrincipalId, Role, RoleTag, TagSet},
    repository::{MemoryRuleSource, RuleRepository, RuleSnapshot, RuleSource},
    resolver::{Decision, DenyCause, GrantTier},
    rule::{FeatureKey, FeatureRule, PagePath, PageRule, PermissionRule, RuleRecord, RuleTarget},
    store::{IdentityProvider, MemoryIdentity, PrincipalStore},
};
