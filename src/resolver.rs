//! Layered permission resolution.
//!
//! This is the evaluation core: a pure function over a principal, the
//! already-loaded rule lists, and the legacy mapping. No I/O happens here
//! (loading and caching are the repository's job), so concurrent checks
//! against the same snapshot are safe and repeated checks are idempotent.
//!
//! Precedence, first match wins:
//!
//! 1. Super-admin short-circuit: the super-admin flag or the admin role
//!    grants immediately, even over an explicit per-user deny.
//! 2. User-specific rule: authoritative verbatim, grant or deny.
//! 3. Role-tag rules: one granting rule from any held tag suffices. A
//!    disabled tag rule does not veto a grant from a different held tag;
//!    this mirrors the shipped behavior and is flagged in DESIGN.md rather
//!    than silently changed.
//! 4. Legacy mapping fallback (features only): the mapped legacy name is
//!    evaluated by the legacy check; no mapping means deny.
//! 5. Deny. Pages have no legacy tier and fall straight through.
//!
//! An unauthenticated caller (no principal) is denied before any tier runs.

#[cfg(feature = "audit")]
use log::{debug, warn};

use crate::{
    catalog,
    legacy::{self, LegacyPermissionCheck},
    principal::{Principal, RoleTag},
    rule::{FeatureKey, FeatureRule, PagePath, PageRule, PermissionRule},
};

/// Which tier granted access.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub enum GrantTier {
    /// Super-admin flag or admin role short-circuit.
    SuperAdmin,
    /// A rule targeting this principal directly.
    UserRule,
    /// A granting rule on a role-tag the principal holds.
    TagRule(RoleTag),
    /// The legacy name-mapped permission check.
    Legacy,
}

/// Why access was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub enum DenyCause {
    /// No authenticated principal.
    Unauthenticated,
    /// An explicit per-user deny rule.
    UserRule,
    /// The legacy check rejected the mapped permission name.
    Legacy,
    /// No tier produced a grant.
    NoMatch,
}

/// The outcome of a permission check, with the tier that decided it.
///
/// Route guards only need [`Decision::is_granted`]; admin tooling uses the
/// provenance to explain effective permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub enum Decision {
    /// Access is granted.
    Granted(GrantTier),
    /// Access is denied.
    Denied(DenyCause),
}

impl Decision {
    /// Returns true if access was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted(_))
    }

    /// Returns true if access was denied.
    pub fn is_denied(&self) -> bool {
        !self.is_granted()
    }

    /// The granting tier, if granted.
    pub fn grant_tier(&self) -> Option<&GrantTier> {
        match self {
            Decision::Granted(tier) => Some(tier),
            Decision::Denied(_) => None,
        }
    }

    /// The denial cause, if denied.
    pub fn deny_cause(&self) -> Option<&DenyCause> {
        match self {
            Decision::Denied(cause) => Some(cause),
            Decision::Granted(_) => None,
        }
    }
}

impl From<Decision> for bool {
    fn from(decision: Decision) -> bool {
        decision.is_granted()
    }
}

/// Outcome of walking the user and tag tiers for one subject key.
enum RuleMatch {
    /// A user-scoped rule matched; carries its verbatim enabled bit.
    User(bool),
    /// A granting tag rule matched; carries the granting tag.
    Tag(RoleTag),
    /// Neither tier matched.
    None,
}

/// Walk tiers 2 and 3 over one rule list.
fn match_rules<K: PartialEq>(
    principal: &Principal,
    key: &K,
    rules: &[PermissionRule<K>],
) -> RuleMatch {
    // Tier 2: a rule targeting this principal is authoritative, grant or deny.
    if let Some(rule) = rules
        .iter()
        .find(|r| r.subject_key() == key && r.target().is_user(principal.id()))
    {
        return RuleMatch::User(rule.enabled());
    }

    // Tier 3: any granting rule on a held tag. An empty tag set matches
    // nothing, and a disabled tag rule does not veto other tags.
    for rule in rules {
        if rule.subject_key() == key && rule.enabled() && rule.target().matches_tags(principal) {
            if let crate::rule::RuleTarget::Tag(tag) = rule.target() {
                return RuleMatch::Tag(tag.clone());
            }
        }
    }

    RuleMatch::None
}

/// Decide whether a principal may use a feature.
///
/// Pure over its inputs; `rules` is the snapshot the repository loaded for
/// this principal.
pub fn decide_feature(
    principal: Option<&Principal>,
    key: &FeatureKey,
    rules: &[FeatureRule],
    legacy_check: &dyn LegacyPermissionCheck,
) -> Decision {
    let Some(principal) = principal else {
        return Decision::Denied(DenyCause::Unauthenticated);
    };

    if !catalog::is_known_feature(key) {
        #[cfg(feature = "audit")]
        warn!("Permission check for feature '{key}' not present in the catalog");
    }

    if principal.is_super_admin() || principal.role().is_admin() {
        return Decision::Granted(GrantTier::SuperAdmin);
    }

    match match_rules(principal, key, rules) {
        RuleMatch::User(true) => return Decision::Granted(GrantTier::UserRule),
        RuleMatch::User(false) => return Decision::Denied(DenyCause::UserRule),
        RuleMatch::Tag(tag) => return Decision::Granted(GrantTier::TagRule(tag)),
        RuleMatch::None => {}
    }

    // Tier 4: legacy mapping, features only.
    match legacy::legacy_permission_for(key) {
        Some(legacy_name) => {
            if legacy_check.check(principal, legacy_name) {
                #[cfg(feature = "audit")]
                debug!(
                    "Feature '{key}' granted to '{}' via legacy permission '{legacy_name}'",
                    principal.id()
                );
                Decision::Granted(GrantTier::Legacy)
            } else {
                Decision::Denied(DenyCause::Legacy)
            }
        }
        None => Decision::Denied(DenyCause::NoMatch),
    }
}

/// Decide whether a principal may open a page.
///
/// Same tiers as [`decide_feature`] minus the legacy fallback: page checks
/// that fall through the tag tier are denied.
pub fn decide_page(
    principal: Option<&Principal>,
    path: &PagePath,
    rules: &[PageRule],
) -> Decision {
    let Some(principal) = principal else {
        return Decision::Denied(DenyCause::Unauthenticated);
    };

    if !catalog::is_known_page(path) {
        #[cfg(feature = "audit")]
        warn!("Permission check for page '{path}' not present in the catalog");
    }

    if principal.is_super_admin() || principal.role().is_admin() {
        return Decision::Granted(GrantTier::SuperAdmin);
    }

    match match_rules(principal, path, rules) {
        RuleMatch::User(true) => Decision::Granted(GrantTier::UserRule),
        RuleMatch::User(false) => Decision::Denied(DenyCause::UserRule),
        RuleMatch::Tag(tag) => Decision::Granted(GrantTier::TagRule(tag)),
        RuleMatch::None => Decision::Denied(DenyCause::NoMatch),
    }
}

/// Boolean convenience over [`decide_feature`].
pub fn has_feature_permission(
    principal: Option<&Principal>,
    key: &FeatureKey,
    rules: &[FeatureRule],
    legacy_check: &dyn LegacyPermissionCheck,
) -> bool {
    decide_feature(principal, key, rules, legacy_check).is_granted()
}

/// Boolean convenience over [`decide_page`].
pub fn has_page_permission(
    principal: Option<&Principal>,
    path: &PagePath,
    rules: &[PageRule],
) -> bool {
    decide_page(principal, path, rules).is_granted()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        legacy::{DenyAllLegacy, StaticLegacyPermissions},
        principal::{Principal, Role, RoleTag},
        rule::FeatureRule,
    };

    fn tag(name: &str) -> RoleTag {
        RoleTag::new(name).unwrap()
    }

    fn member(id: &str) -> Principal {
        Principal::new(id, format!("{id}@example.org"), Role::Member)
    }

    #[test]
    fn test_unauthenticated_denied_everywhere() {
        let legacy = StaticLegacyPermissions::new();
        let decision = decide_feature(None, &"media_upload".into(), &[], &legacy);
        assert_eq!(decision, Decision::Denied(DenyCause::Unauthenticated));

        let decision = decide_page(None, &"/admin".into(), &[]);
        assert_eq!(decision, Decision::Denied(DenyCause::Unauthenticated));
    }

    #[test]
    fn test_super_admin_beats_explicit_user_deny() {
        let legacy = DenyAllLegacy;
        let p = member("u1").with_super_admin(true);
        let rules = vec![FeatureRule::for_user("store_management", "u1", false)];

        let decision = decide_feature(Some(&p), &"store_management".into(), &rules, &legacy);
        assert_eq!(decision, Decision::Granted(GrantTier::SuperAdmin));
    }

    #[test]
    fn test_admin_role_short_circuits_like_super_admin() {
        let legacy = DenyAllLegacy;
        let p = Principal::new("a1", "a@example.org", Role::Admin);
        let decision = decide_feature(Some(&p), &"anything_at_all".into(), &[], &legacy);
        assert!(decision.is_granted());
    }

    #[test]
    fn test_user_rule_overrides_tag_grant() {
        let legacy = DenyAllLegacy;
        let p = member("u1").with_tag(tag("Treasurer"));
        let rules = vec![
            FeatureRule::for_tag("financial_management", tag("Treasurer"), true),
            FeatureRule::for_user("financial_management", "u1", false),
        ];

        let decision = decide_feature(Some(&p), &"financial_management".into(), &rules, &legacy);
        assert_eq!(decision, Decision::Denied(DenyCause::UserRule));
    }

    #[test]
    fn test_tag_disjunction_one_grant_suffices() {
        let legacy = DenyAllLegacy;
        let p = member("u1").with_tag(tag("Historian")).with_tag(tag("Secretary"));
        let rules = vec![FeatureRule::for_tag("announcements", tag("Secretary"), true)];

        let decision = decide_feature(Some(&p), &"announcements".into(), &rules, &legacy);
        assert_eq!(decision, Decision::Granted(GrantTier::TagRule(tag("Secretary"))));
    }

    #[test]
    fn test_disabled_tag_rule_does_not_veto_other_tag() {
        let legacy = DenyAllLegacy;
        let p = member("u1").with_tag(tag("Historian")).with_tag(tag("Secretary"));
        let rules = vec![
            FeatureRule::for_tag("announcements", tag("Historian"), false),
            FeatureRule::for_tag("announcements", tag("Secretary"), true),
        ];

        let decision = decide_feature(Some(&p), &"announcements".into(), &rules, &legacy);
        assert!(decision.is_granted());
    }

    #[test]
    fn test_empty_tag_set_never_matches_tag_rules() {
        let legacy = DenyAllLegacy;
        let p = member("u1");
        let rules = vec![FeatureRule::for_tag("announcements", tag("Secretary"), true)];

        let decision = decide_feature(Some(&p), &"announcements".into(), &rules, &legacy);
        assert_eq!(decision, Decision::Denied(DenyCause::NoMatch));
    }

    #[test]
    fn test_legacy_fallback_for_features() {
        let legacy = StaticLegacyPermissions::new();
        let p = member("u1").with_tag(tag("Treasurer"));

        // No rules at all: falls through to legacy, Treasurer carries edit_budget.
        let decision = decide_feature(Some(&p), &"financial_management".into(), &[], &legacy);
        assert_eq!(decision, Decision::Granted(GrantTier::Legacy));

        // Unmapped feature: no legacy tier, denied.
        let decision = decide_feature(Some(&p), &"archive_access".into(), &[], &legacy);
        assert_eq!(decision, Decision::Denied(DenyCause::NoMatch));
    }

    #[test]
    fn test_pages_have_no_legacy_fallback() {
        let p = member("u1").with_tag(tag("Treasurer"));
        let decision = decide_page(Some(&p), &"/admin/finances".into(), &[]);
        assert_eq!(decision, Decision::Denied(DenyCause::NoMatch));
    }

    #[test]
    fn test_idempotence() {
        let legacy = StaticLegacyPermissions::new();
        let p = member("u1").with_tag(tag("Secretary"));
        let rules = vec![FeatureRule::for_tag("announcements", tag("Secretary"), true)];
        let key: FeatureKey = "announcements".into();

        let first = decide_feature(Some(&p), &key, &rules, &legacy);
        let second = decide_feature(Some(&p), &key, &rules, &legacy);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_key_still_resolves() {
        let legacy = DenyAllLegacy;
        let p = member("u1").with_tag(tag("Stagehand"));
        let rules = vec![FeatureRule::for_tag("prop_inventory", tag("Stagehand"), true)];

        // Not in the catalog, but rules still apply.
        let decision = decide_feature(Some(&p), &"prop_inventory".into(), &rules, &legacy);
        assert!(decision.is_granted());
    }
}
