//! Convenience macros for the access system.

/// Macro for building a validated tag set from string literals.
///
/// Panics on an invalid tag, so this is for fixtures and wiring code where
/// the tags are compile-time constants; parse untrusted input with
/// [`TagSet::from_strings`](crate::principal::TagSet::from_strings) instead.
///
/// # Examples
///
/// ```rust
/// use troupe_access::role_tags;
///
/// let tags = role_tags!["Treasurer", "Historian"];
/// assert_eq!(tags.len(), 2);
/// ```
#[macro_export]
macro_rules! role_tags {
    ($($tag:expr),* $(,)?) => {{
        let mut set = $crate::principal::TagSet::new();
        $(
            set.insert(
                $crate::principal::RoleTag::new($tag)
                    .expect("invalid role tag literal"),
            );
        )*
        set
    }};
}

/// Macro for declaring feature rules with a compact grant table syntax.
///
/// Each row is `allow` or `deny`, a subject key, and `user <id>` or
/// `tag <name>`.
///
/// # Examples
///
/// ```rust
/// use troupe_access::feature_rules;
///
/// let rules = feature_rules![
///     allow "financial_management" => tag "Treasurer",
///     allow "media_upload" => user "user-1",
///     deny "store_management" => user "user-1",
/// ];
/// assert_eq!(rules.len(), 3);
/// assert!(!rules[2].enabled());
/// ```
#[macro_export]
macro_rules! feature_rules {
    (@enabled allow) => { true };
    (@enabled deny) => { false };
    (@rule $verb:ident $key:expr => user $id:expr) => {
        $crate::rule::FeatureRule::for_user($key, $id, $crate::feature_rules!(@enabled $verb))
    };
    (@rule $verb:ident $key:expr => tag $tag:expr) => {
        $crate::rule::FeatureRule::for_tag(
            $key,
            $crate::principal::RoleTag::new($tag).expect("invalid role tag literal"),
            $crate::feature_rules!(@enabled $verb),
        )
    };
    ($($verb:ident $key:expr => $kind:ident $target:expr),* $(,)?) => {
        vec![$( $crate::feature_rules!(@rule $verb $key => $kind $target) ),*]
    };
}

#[cfg(test)]
mod tests {
    use crate::rule::RuleTarget;

    #[test]
    fn test_role_tags_macro() {
        let tags = role_tags!["Treasurer", "Historian", "Treasurer"];
        assert_eq!(tags.len(), 2);
        assert!(tags.contains_str("Historian"));
    }

    #[test]
    fn test_feature_rules_macro() {
        let rules = feature_rules![
            allow "financial_management" => tag "Treasurer",
            deny "store_management" => user "u1",
        ];

        assert_eq!(rules.len(), 2);
        assert!(rules[0].enabled());
        assert!(matches!(rules[0].target(), RuleTarget::Tag(t) if t.as_str() == "Treasurer"));
        assert!(!rules[1].enabled());
        assert!(matches!(rules[1].target(), RuleTarget::User(_)));
    }

    #[test]
    fn test_empty_rule_list() {
        let rules: Vec<crate::rule::FeatureRule> = feature_rules![];
        assert!(rules.is_empty());
    }
}
