//! Example demonstrating the access system API as shown in the documentation.

use troupe_access::{
    AccessSystemBuilder, MemoryIdentity, MemoryRuleSource, Principal, Role, RoleTag, RuleRecord,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize audit logging
    #[cfg(feature = "audit")]
    troupe_access::init_audit_logger();

    // The identity collaborator reports the session's principal. Here the
    // logged-in member holds the Treasurer tag.
    let identity = MemoryIdentity::with_principal(
        Principal::new("member-17", "treasurer@example.org", Role::Member)
            .with_tag(RoleTag::new("Treasurer")?),
    );

    // The rule storage collaborator holds the admin-edited permission rules.
    let rules = MemoryRuleSource::new();
    rules.insert_feature_record(RuleRecord::tag_scoped(
        "store_management",
        "Treasurer",
        true,
    ))?;
    rules.insert_page_record(RuleRecord::tag_scoped("/admin/store", "Treasurer", true))?;
    // An explicit per-user deny outranks any tag grant.
    rules.insert_feature_record(RuleRecord::user_scoped("media_upload", "member-17", false))?;

    let access = AccessSystemBuilder::new(identity, rules)
        .super_admin_email("founder@example.org")
        .build();

    // Load the session: principal first, then the rule snapshot.
    access.init().await?;

    println!(
        "store_management: {}",
        access.has_feature_permission(&"store_management".into()).await
    );
    println!(
        "/admin/store:     {}",
        access.has_page_permission(&"/admin/store".into()).await
    );
    println!(
        "media_upload:     {}",
        access.has_feature_permission(&"media_upload".into()).await
    );
    // No rule mentions financial_management, but the Treasurer tag carries
    // the legacy edit_budget permission.
    println!(
        "financial_mgmt:   {}",
        access.has_feature_permission(&"financial_management".into()).await
    );

    // The admin permission matrix: every cataloged feature with provenance.
    println!("\nEffective feature permissions:");
    for (info, decision) in access.effective_feature_permissions().await {
        println!("  {:<24} {:?}", info.key, decision);
    }

    Ok(())
}
