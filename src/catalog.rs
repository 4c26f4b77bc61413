//! Static catalogs of gateable features and pages.
//!
//! The catalogs are descriptive, not a gate: resolution proceeds for keys
//! that are absent here, so new capabilities can be wired up before the
//! catalog ships. Admin tooling renders its permission matrix from these
//! tables.

use crate::rule::{FeatureKey, PagePath};

/// A catalog entry describing one gateable feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureInfo {
    /// Stable feature key, as referenced by rules.
    pub key: &'static str,
    /// Human-readable label for admin UIs.
    pub label: &'static str,
    /// What the feature gates.
    pub description: &'static str,
}

/// A catalog entry describing one gateable page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// Route path, as referenced by rules.
    pub path: &'static str,
    /// Human-readable label for admin UIs.
    pub label: &'static str,
    /// What the page contains.
    pub description: &'static str,
}

/// All features the application can gate.
pub const AVAILABLE_FEATURES: &[FeatureInfo] = &[
    FeatureInfo {
        key: "event_management",
        label: "Event Management",
        description: "Create, edit, and cancel calendar events and rehearsals",
    },
    FeatureInfo {
        key: "media_upload",
        label: "Media Upload",
        description: "Upload photos, audio, and video to the media library",
    },
    FeatureInfo {
        key: "media_management",
        label: "Media Management",
        description: "Organize, retag, and remove media library items",
    },
    FeatureInfo {
        key: "store_management",
        label: "Store Management",
        description: "Manage store products, pricing, and order fulfillment",
    },
    FeatureInfo {
        key: "financial_management",
        label: "Financial Management",
        description: "View and edit budgets, dues, and financial reports",
    },
    FeatureInfo {
        key: "member_management",
        label: "Member Management",
        description: "Edit member profiles, roles, and role-tags",
    },
    FeatureInfo {
        key: "announcements",
        label: "Announcements",
        description: "Publish announcements to the membership",
    },
    FeatureInfo {
        key: "newsletter",
        label: "Newsletter",
        description: "Compose and send the organization newsletter",
    },
    FeatureInfo {
        key: "attendance_tracking",
        label: "Attendance Tracking",
        description: "Record and report rehearsal and event attendance",
    },
    FeatureInfo {
        key: "archive_access",
        label: "Archive Access",
        description: "Browse the historical program and recording archive",
    },
];

/// All pages the application can gate.
pub const AVAILABLE_PAGES: &[PageInfo] = &[
    PageInfo {
        path: "/admin",
        label: "Admin Dashboard",
        description: "Administrative overview and shortcuts",
    },
    PageInfo {
        path: "/admin/members",
        label: "Member Admin",
        description: "Member roster and profile administration",
    },
    PageInfo {
        path: "/admin/events",
        label: "Event Admin",
        description: "Event calendar administration",
    },
    PageInfo {
        path: "/admin/media",
        label: "Media Admin",
        description: "Media library administration",
    },
    PageInfo {
        path: "/admin/store",
        label: "Store Admin",
        description: "Store and order administration",
    },
    PageInfo {
        path: "/admin/finances",
        label: "Finance Admin",
        description: "Budgets, dues, and financial reporting",
    },
    PageInfo {
        path: "/admin/permissions",
        label: "Permission Admin",
        description: "Permission rule editing",
    },
    PageInfo {
        path: "/members/directory",
        label: "Member Directory",
        description: "Searchable member contact directory",
    },
    PageInfo {
        path: "/members/documents",
        label: "Member Documents",
        description: "Meeting minutes, bylaws, and internal documents",
    },
];

/// Look up a feature catalog entry by key.
pub fn feature_info(key: &FeatureKey) -> Option<&'static FeatureInfo> {
    AVAILABLE_FEATURES.iter().find(|f| f.key == key.as_str())
}

/// Look up a page catalog entry by path.
pub fn page_info(path: &PagePath) -> Option<&'static PageInfo> {
    AVAILABLE_PAGES.iter().find(|p| p.path == path.as_str())
}

/// Whether the feature key appears in the catalog.
pub fn is_known_feature(key: &FeatureKey) -> bool {
    feature_info(key).is_some()
}

/// Whether the page path appears in the catalog.
pub fn is_known_page(path: &PagePath) -> bool {
    page_info(path).is_some()
}
