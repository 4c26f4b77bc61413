//! Permission rule definitions and record validation.
//!
//! Rules come in two parallel flavors sharing one shape: feature rules
//! (keyed by an abstract feature identifier) and page rules (keyed by a UI
//! route path). Each rule grants or explicitly denies its subject key to
//! either one principal or one role-tag, never both and never neither. The
//! typed [`RuleTarget`] makes that invariant unrepresentable; raw records
//! arriving from rule storage are checked at conversion time.

use crate::{
    error::{Error, Result},
    principal::{Principal, PrincipalId, RoleTag},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Opaque identifier for a permission rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(transparent))]
pub struct RuleId(String);

impl RuleId {
    /// Create a rule id from an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random rule id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Abstract identifier for a gated capability (e.g. "media_upload").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(transparent))]
pub struct FeatureKey(String);

impl FeatureKey {
    /// Create a feature key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FeatureKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for FeatureKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Abstract identifier for a gated UI route (e.g. "/admin/finances").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(transparent))]
pub struct PagePath(String);

impl PagePath {
    /// Create a page path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PagePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PagePath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl From<String> for PagePath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// Who a rule applies to: exactly one specific principal, or every holder of
/// one role-tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(rename_all = "snake_case"))]
pub enum RuleTarget {
    /// The rule applies only to this principal.
    User(PrincipalId),
    /// The rule applies to every principal holding this tag.
    Tag(RoleTag),
}

impl RuleTarget {
    /// True if this target names the given principal directly.
    pub fn is_user(&self, id: &PrincipalId) -> bool {
        matches!(self, RuleTarget::User(target) if target == id)
    }

    /// True if this target is a tag held by the given principal.
    ///
    /// A principal with no tags never matches a tag target, and a tag target
    /// is never treated as a wildcard.
    pub fn matches_tags(&self, principal: &Principal) -> bool {
        matches!(self, RuleTarget::Tag(tag) if principal.role_tags().contains(tag))
    }
}

/// A permission rule over subject keys of type `K` (feature keys or page paths).
///
/// `enabled == true` grants the subject key; `enabled == false` is an
/// explicit deny. How denies interact across tiers is the resolver's
/// business ([`crate::resolver`]).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct PermissionRule<K> {
    id: RuleId,
    subject_key: K,
    target: RuleTarget,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A rule gating an abstract feature.
pub type FeatureRule = PermissionRule<FeatureKey>;

/// A rule gating a UI route.
pub type PageRule = PermissionRule<PagePath>;

impl<K> PermissionRule<K> {
    /// Create a rule targeting one specific principal.
    pub fn for_user(
        subject_key: impl Into<K>,
        user: impl Into<PrincipalId>,
        enabled: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RuleId::generate(),
            subject_key: subject_key.into(),
            target: RuleTarget::User(user.into()),
            enabled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a rule targeting every holder of a role-tag.
    pub fn for_tag(subject_key: impl Into<K>, tag: RoleTag, enabled: bool) -> Self {
        let now = Utc::now();
        Self {
            id: RuleId::generate(),
            subject_key: subject_key.into(),
            target: RuleTarget::Tag(tag),
            enabled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get the rule id.
    pub fn id(&self) -> &RuleId {
        &self.id
    }

    /// Get the subject key this rule governs.
    pub fn subject_key(&self) -> &K {
        &self.subject_key
    }

    /// Get the rule target.
    pub fn target(&self) -> &RuleTarget {
        &self.target
    }

    /// Whether the rule grants (true) or explicitly denies (false).
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// When the rule was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the rule was last updated.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Flip the grant/deny bit, bumping the update timestamp.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.updated_at = Utc::now();
    }
}

/// A raw rule row as stored by the rule-storage collaborator.
///
/// Both target columns are nullable in storage; the admin tooling enforces
/// the exactly-one invariant at write time, and [`RuleRecord::into_rule`]
/// re-checks it at read time so one bad row can be skipped instead of
/// taking resolution down.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleRecord {
    /// Row identifier.
    pub id: String,
    /// Feature key or page path the rule governs.
    pub subject_key: String,
    /// Principal the rule targets, if user-scoped.
    pub target_user: Option<String>,
    /// Role-tag the rule targets, if tag-scoped.
    pub target_role_tag: Option<String>,
    /// Grant (true) or explicit deny (false).
    pub enabled: bool,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row update time.
    pub updated_at: DateTime<Utc>,
}

impl RuleRecord {
    /// Build a user-scoped record.
    pub fn user_scoped(
        subject_key: impl Into<String>,
        user: impl Into<String>,
        enabled: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            subject_key: subject_key.into(),
            target_user: Some(user.into()),
            target_role_tag: None,
            enabled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a tag-scoped record.
    pub fn tag_scoped(
        subject_key: impl Into<String>,
        tag: impl Into<String>,
        enabled: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            subject_key: subject_key.into(),
            target_user: None,
            target_role_tag: Some(tag.into()),
            enabled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the exactly-one-target invariant without converting.
    pub fn validate(&self) -> Result<()> {
        match (&self.target_user, &self.target_role_tag) {
            (Some(_), Some(_)) => Err(Error::InvalidRule {
                id: self.id.clone(),
                reason: "both user and role-tag targets are set".to_string(),
            }),
            (None, None) => Err(Error::InvalidRule {
                id: self.id.clone(),
                reason: "neither user nor role-tag target is set".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Convert the raw row into a typed rule, enforcing the target invariant
    /// and tag validity.
    pub fn into_rule<K: From<String>>(self) -> Result<PermissionRule<K>> {
        self.validate()?;

        let target = match (self.target_user, self.target_role_tag) {
            (Some(user), None) => RuleTarget::User(PrincipalId::new(user)),
            (None, Some(tag)) => {
                let tag = RoleTag::new(tag).map_err(|e| Error::InvalidRule {
                    id: self.id.clone(),
                    reason: e.to_string(),
                })?;
                RuleTarget::Tag(tag)
            }
            // validate() above rejects the other arms.
            _ => unreachable!("validated record has exactly one target"),
        };

        Ok(PermissionRule {
            id: RuleId::new(self.id),
            subject_key: K::from(self.subject_key),
            target,
            enabled: self.enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
