//! Edge case tests for the resolution precedence order.

use troupe_access::{
    legacy::{DenyAllLegacy, StaticLegacyPermissions},
    principal::{Principal, Role, RoleTag},
    resolver::{decide_feature, decide_page, Decision, DenyCause, GrantTier},
    rule::{FeatureRule, PageRule},
};

fn tag(name: &str) -> RoleTag {
    RoleTag::new(name).unwrap()
}

fn member(id: &str) -> Principal {
    Principal::new(id, format!("{id}@example.org"), Role::Member)
}

#[test]
fn test_super_admin_wins_over_user_deny() {
    let principal = member("u1").with_super_admin(true);
    let rules = vec![FeatureRule::for_user("store_management", "u1", false)];

    let decision = decide_feature(
        Some(&principal),
        &"store_management".into(),
        &rules,
        &DenyAllLegacy,
    );
    assert_eq!(decision, Decision::Granted(GrantTier::SuperAdmin));
}

#[test]
fn test_admin_role_wins_over_user_deny() {
    let principal = Principal::new("a1", "a@example.org", Role::Admin);
    let rules = vec![
        FeatureRule::for_user("store_management", "a1", false),
        FeatureRule::for_tag("store_management", tag("Treasurer"), false),
    ];

    let decision = decide_feature(
        Some(&principal),
        &"store_management".into(),
        &rules,
        &DenyAllLegacy,
    );
    assert!(decision.is_granted());
}

#[test]
fn test_user_grant_beats_tag_deny() {
    let principal = member("u1").with_tag(tag("Historian"));
    let rules = vec![
        FeatureRule::for_tag("archive_access", tag("Historian"), false),
        FeatureRule::for_user("archive_access", "u1", true),
    ];

    let decision = decide_feature(
        Some(&principal),
        &"archive_access".into(),
        &rules,
        &DenyAllLegacy,
    );
    assert_eq!(decision, Decision::Granted(GrantTier::UserRule));
}

#[test]
fn test_user_rule_for_other_principal_is_ignored() {
    let principal = member("u1");
    let rules = vec![FeatureRule::for_user("media_upload", "u2", true)];

    let decision = decide_feature(
        Some(&principal),
        &"media_upload".into(),
        &rules,
        &DenyAllLegacy,
    );
    assert!(decision.is_denied());
}

#[test]
fn test_rule_for_other_key_is_ignored() {
    let principal = member("u1").with_tag(tag("Secretary"));
    let rules = vec![FeatureRule::for_tag("announcements", tag("Secretary"), true)];

    let decision = decide_feature(
        Some(&principal),
        &"newsletter".into(),
        &rules,
        &DenyAllLegacy,
    );
    assert!(decision.is_denied());
}

#[test]
fn test_tag_grant_with_mixed_unrelated_rules() {
    let principal = member("u1").with_tag(tag("Historian")).with_tag(tag("Secretary"));
    let rules = vec![
        FeatureRule::for_tag("announcements", tag("President"), true),
        FeatureRule::for_user("announcements", "u9", false),
        FeatureRule::for_tag("announcements", tag("Secretary"), true),
    ];

    let decision = decide_feature(
        Some(&principal),
        &"announcements".into(),
        &rules,
        &DenyAllLegacy,
    );
    assert_eq!(
        decision,
        Decision::Granted(GrantTier::TagRule(tag("Secretary")))
    );
}

#[test]
fn test_all_held_tags_denied_falls_through_to_legacy() {
    // Every matching tag rule is a deny; with no grant the tag tier yields
    // nothing and the legacy tier decides.
    let principal = member("u1").with_tag(tag("Treasurer"));
    let rules = vec![FeatureRule::for_tag(
        "financial_management",
        tag("Treasurer"),
        false,
    )];

    let decision = decide_feature(
        Some(&principal),
        &"financial_management".into(),
        &rules,
        &StaticLegacyPermissions::new(),
    );
    // The legacy table still grants edit_budget to Treasurers. This mirrors
    // the shipped precedence: tag-tier denies are not authoritative.
    assert_eq!(decision, Decision::Granted(GrantTier::Legacy));
}

#[test]
fn test_legacy_denial_is_reported_as_legacy() {
    let principal = member("u1");
    let decision = decide_feature(
        Some(&principal),
        &"financial_management".into(),
        &[],
        &StaticLegacyPermissions::new(),
    );
    assert_eq!(decision, Decision::Denied(DenyCause::Legacy));
}

#[test]
fn test_unmapped_feature_denied_as_no_match() {
    let principal = member("u1");
    let decision = decide_feature(
        Some(&principal),
        &"attendance_tracking".into(),
        &[],
        &StaticLegacyPermissions::new(),
    );
    assert_eq!(decision, Decision::Denied(DenyCause::NoMatch));
}

#[test]
fn test_page_checks_never_reach_legacy() {
    // financial pages and the financial feature share a steward tag; the
    // page check must not borrow the feature's legacy fallback.
    let principal = member("u1").with_tag(tag("Treasurer"));
    let decision = decide_page(Some(&principal), &"/admin/finances".into(), &[]);
    assert_eq!(decision, Decision::Denied(DenyCause::NoMatch));
}

#[test]
fn test_page_user_rule_is_authoritative() {
    let principal = member("u1").with_tag(tag("Treasurer"));
    let rules = vec![
        PageRule::for_tag("/admin/finances", tag("Treasurer"), true),
        PageRule::for_user("/admin/finances", "u1", false),
    ];

    let decision = decide_page(Some(&principal), &"/admin/finances".into(), &rules);
    assert_eq!(decision, Decision::Denied(DenyCause::UserRule));
}

#[test]
fn test_empty_tag_set_skips_tag_tier() {
    let principal = member("u1");
    let rules = vec![
        PageRule::for_tag("/members/documents", tag("Secretary"), true),
        PageRule::for_tag("/members/documents", tag("President"), true),
    ];

    let decision = decide_page(Some(&principal), &"/members/documents".into(), &rules);
    assert_eq!(decision, Decision::Denied(DenyCause::NoMatch));
}

#[test]
fn test_unauthenticated_short_circuits_before_rules() {
    let rules = vec![FeatureRule::for_user("media_upload", "u1", true)];
    let decision = decide_feature(None, &"media_upload".into(), &rules, &DenyAllLegacy);
    assert_eq!(decision, Decision::Denied(DenyCause::Unauthenticated));
}

#[test]
fn test_decision_conversions() {
    let granted = Decision::Granted(GrantTier::Legacy);
    let denied = Decision::Denied(DenyCause::NoMatch);

    assert!(bool::from(granted.clone()));
    assert!(!bool::from(denied.clone()));
    assert_eq!(granted.grant_tier(), Some(&GrantTier::Legacy));
    assert_eq!(granted.deny_cause(), None);
    assert_eq!(denied.deny_cause(), Some(&DenyCause::NoMatch));
}
