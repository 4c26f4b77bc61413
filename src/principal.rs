//! Principal definitions (the authenticated actor whose permissions are evaluated).

use crate::error::{Error, Result};

/// Opaque unique identifier for a principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(transparent))]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Create a principal id from an opaque identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PrincipalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The base role of a principal.
///
/// This is a closed set: an unrecognized role string from the identity
/// collaborator is rejected at the store boundary rather than mapped to a
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(rename_all = "lowercase"))]
pub enum Role {
    /// Organization administrator; grants everything at the top tier.
    Admin,
    /// A regular member of the organization.
    Member,
    /// A fan/visitor account with no member privileges.
    Fan,
}

impl Role {
    /// Get the string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Fan => "fan",
        }
    }

    /// Check if this is the admin role.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "fan" => Ok(Role::Fan),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}

/// A supplementary, multi-valued label granting cross-cutting permissions
/// independent of the coarse role (e.g. "Treasurer", "Historian").
///
/// Tags are validated on construction: empty, whitespace-only, and
/// control-character tags are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(try_from = "String", into = "String"))]
pub struct RoleTag(String);

impl RoleTag {
    /// Maximum accepted tag length in bytes.
    pub const MAX_LEN: usize = 64;

    /// Create a validated role tag.
    pub fn new(tag: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        let trimmed = tag.trim();

        if trimmed.is_empty() {
            return Err(Error::InvalidRoleTag("tag is empty".to_string()));
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(Error::InvalidRoleTag(format!(
                "tag exceeds {} bytes: '{trimmed}'",
                Self::MAX_LEN
            )));
        }
        if trimmed.chars().any(|c| c.is_control()) {
            return Err(Error::InvalidRoleTag(format!(
                "tag contains control characters: '{}'",
                trimmed.escape_debug()
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoleTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RoleTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for RoleTag {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<RoleTag> for String {
    fn from(tag: RoleTag) -> String {
        tag.0
    }
}

/// An ordered, de-duplicated set of role tags.
///
/// Insertion order is preserved for display purposes; membership checks are
/// what resolution cares about, and those are order-independent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(transparent))]
pub struct TagSet {
    tags: Vec<RoleTag>,
}

impl TagSet {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tag set from raw strings, validating each tag.
    pub fn from_strings<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for tag in tags {
            set.insert(RoleTag::new(tag)?);
        }
        Ok(set)
    }

    /// Insert a tag, preserving insertion order and ignoring duplicates.
    /// Returns true if the tag was newly added.
    pub fn insert(&mut self, tag: RoleTag) -> bool {
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Check whether the set holds the given tag.
    pub fn contains(&self, tag: &RoleTag) -> bool {
        self.tags.contains(tag)
    }

    /// Check whether the set holds a tag with the given name.
    pub fn contains_str(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.as_str() == tag)
    }

    /// Number of tags held.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// True if the principal holds no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate over the tags in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RoleTag> {
        self.tags.iter()
    }
}

impl FromIterator<RoleTag> for TagSet {
    fn from_iter<I: IntoIterator<Item = RoleTag>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a RoleTag;
    type IntoIter = std::slice::Iter<'a, RoleTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

/// The authenticated actor whose permissions are being evaluated.
///
/// Loaded from the identity collaborator once per session and refreshed on
/// demand through [`PrincipalStore`](crate::store::PrincipalStore); never
/// mutated locally except by refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct Principal {
    id: PrincipalId,
    email: String,
    role: Role,
    is_super_admin: bool,
    role_tags: TagSet,
}

impl Principal {
    /// Create a principal with the given id, email, and role, no super-admin
    /// flag, and no role tags.
    pub fn new(id: impl Into<PrincipalId>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
            is_super_admin: false,
            role_tags: TagSet::new(),
        }
    }

    /// Get the principal's unique identifier.
    pub fn id(&self) -> &PrincipalId {
        &self.id
    }

    /// Get the principal's email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Get the principal's base role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the principal carries the super-admin override flag.
    pub fn is_super_admin(&self) -> bool {
        self.is_super_admin
    }

    /// Get the principal's role tags.
    pub fn role_tags(&self) -> &TagSet {
        &self.role_tags
    }

    /// Set the super-admin flag (builder style).
    pub fn with_super_admin(mut self, is_super_admin: bool) -> Self {
        self.is_super_admin = is_super_admin;
        self
    }

    /// Add a role tag (builder style).
    pub fn with_tag(mut self, tag: RoleTag) -> Self {
        self.role_tags.insert(tag);
        self
    }

    /// Replace the tag set (builder style).
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.role_tags = tags;
        self
    }

    pub(crate) fn grant_super_admin(&mut self) {
        self.is_super_admin = true;
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}:{})", self.email, self.role, self.id)
    }
}

/// Builder for assembling principals from raw identity payloads.
#[derive(Debug, Default)]
pub struct PrincipalBuilder {
    id: Option<PrincipalId>,
    email: Option<String>,
    role: Option<Role>,
    is_super_admin: bool,
    role_tags: TagSet,
}

impl PrincipalBuilder {
    /// Create a new principal builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the principal id.
    pub fn id(mut self, id: impl Into<PrincipalId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the email address.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the base role.
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Parse and set the base role from an identity payload string.
    pub fn role_str(mut self, role: &str) -> Result<Self> {
        self.role = Some(role.parse()?);
        Ok(self)
    }

    /// Set the super-admin flag.
    pub fn super_admin(mut self, is_super_admin: bool) -> Self {
        self.is_super_admin = is_super_admin;
        self
    }

    /// Add a single validated tag.
    pub fn tag(mut self, tag: RoleTag) -> Self {
        self.role_tags.insert(tag);
        self
    }

    /// Parse and add tags from raw identity payload strings.
    pub fn tags_from_strings<I, S>(mut self, tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.role_tags.insert(RoleTag::new(tag)?);
        }
        Ok(self)
    }

    /// Build the principal.
    pub fn build(self) -> Result<Principal> {
        let id = self
            .id
            .ok_or_else(|| Error::InvalidConfiguration("principal id is required".to_string()))?;
        let email = self.email.unwrap_or_default();
        let role = self.role.unwrap_or(Role::Fan);

        Ok(Principal {
            id,
            email,
            role,
            is_super_admin: self.is_super_admin,
            role_tags: self.role_tags,
        })
    }
}
