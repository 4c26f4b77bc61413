//! Legacy permission-name mapping and the legacy check contract.
//!
//! The tag-based rule system replaced an older scheme of flat permission
//! names ("edit_budget", "manage_store"). Features that predate the rule
//! tables keep a mapping to their old name, and resolution falls back to the
//! legacy check when no rule matched. The mapping table is immutable at
//! runtime; the legacy check itself is a black box behind
//! [`LegacyPermissionCheck`].

use crate::{
    principal::{Principal, Role},
    rule::FeatureKey,
};

/// Static mapping from abstract feature keys to legacy permission names.
///
/// Only features that existed under the old scheme appear here; anything
/// absent has no legacy fallback and resolves to deny when no rule matches.
pub const LEGACY_FEATURE_MAP: &[(&str, &str)] = &[
    ("financial_management", "edit_budget"),
    ("store_management", "manage_store"),
    ("event_management", "edit_calendar"),
    ("media_upload", "upload_media"),
    ("announcements", "post_announcements"),
    ("newsletter", "send_newsletter"),
];

/// Look up the legacy permission name for a feature key, if one exists.
pub fn legacy_permission_for(key: &FeatureKey) -> Option<&'static str> {
    LEGACY_FEATURE_MAP
        .iter()
        .find(|(feature, _)| *feature == key.as_str())
        .map(|(_, legacy)| *legacy)
}

/// Contract for the pre-tag permission check.
///
/// Implementations must be deterministic and side-effect-free: the same
/// principal and name always produce the same answer, and evaluating one
/// must not mutate anything.
pub trait LegacyPermissionCheck: Send + Sync {
    /// Evaluate a legacy permission name against a principal's role and tags.
    fn check(&self, principal: &Principal, legacy_name: &str) -> bool;
}

/// One row of the legacy grant table: which roles and tag names carry a
/// legacy permission.
#[derive(Debug, Clone, Copy)]
struct LegacyGrant {
    name: &'static str,
    roles: &'static [Role],
    tags: &'static [&'static str],
}

const LEGACY_GRANTS: &[LegacyGrant] = &[
    LegacyGrant {
        name: "edit_budget",
        roles: &[Role::Admin],
        tags: &["Treasurer"],
    },
    LegacyGrant {
        name: "manage_store",
        roles: &[Role::Admin],
        tags: &["Quartermaster"],
    },
    LegacyGrant {
        name: "edit_calendar",
        roles: &[Role::Admin],
        tags: &["President", "Secretary"],
    },
    LegacyGrant {
        name: "upload_media",
        roles: &[Role::Admin, Role::Member],
        tags: &[],
    },
    LegacyGrant {
        name: "post_announcements",
        roles: &[Role::Admin],
        tags: &["President", "Secretary"],
    },
    LegacyGrant {
        name: "send_newsletter",
        roles: &[Role::Admin],
        tags: &["Secretary"],
    },
];

/// The built-in legacy rule table, kept for backward compatibility with
/// accounts that predate per-user and per-tag rules.
///
/// A name is granted when the principal's role appears in the row's role
/// list or the principal holds any of the row's tag names. Unknown names
/// are denied.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLegacyPermissions;

impl StaticLegacyPermissions {
    /// Create the static legacy table.
    pub fn new() -> Self {
        Self
    }
}

impl LegacyPermissionCheck for StaticLegacyPermissions {
    fn check(&self, principal: &Principal, legacy_name: &str) -> bool {
        let Some(grant) = LEGACY_GRANTS.iter().find(|g| g.name == legacy_name) else {
            return false;
        };

        if grant.roles.contains(&principal.role()) {
            return true;
        }
        grant
            .tags
            .iter()
            .any(|tag| principal.role_tags().contains_str(tag))
    }
}

/// Legacy check that denies every name.
///
/// Stands in when the legacy system is unavailable: the fallback tier then
/// resolves to deny, per fail-closed policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllLegacy;

impl LegacyPermissionCheck for DenyAllLegacy {
    fn check(&self, _principal: &Principal, _legacy_name: &str) -> bool {
        false
    }
}
