//! Permission vocabulary and the evaluator over it.
//!
//! A permission is `resource:action` or `resource:action:self`. Either segment
//! may be the wildcard `*`. Strings are parsed once into [`Permission`]; the
//! evaluator then works on values, never on raw string splitting.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use warden_core::{DomainError, UserId};

use crate::Principal;

const WILDCARD: &str = "*";
const SELF_SUFFIX: &str = "self";

/// One segment of a permission: a concrete name or the wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Any,
    Named(String),
}

impl Segment {
    fn parse(raw: &str, what: &str) -> Result<Self, DomainError> {
        if raw == WILDCARD {
            return Ok(Segment::Any);
        }
        if raw.is_empty() {
            return Err(DomainError::validation(format!("{what} segment is empty")));
        }
        let valid = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(DomainError::validation(format!(
                "{what} segment '{raw}' contains invalid characters"
            )));
        }
        Ok(Segment::Named(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Segment::Any => WILDCARD,
            Segment::Named(name) => name,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Segment::Any)
    }
}

/// Parsed `resource:action[:self]` permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission {
    resource: Segment,
    action: Segment,
    self_scoped: bool,
}

impl Permission {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let mut parts = raw.split(':');
        let (Some(resource), Some(action)) = (parts.next(), parts.next()) else {
            return Err(DomainError::validation(format!(
                "permission '{raw}' must look like resource:action"
            )));
        };
        let self_scoped = match parts.next() {
            None => false,
            Some(SELF_SUFFIX) => true,
            Some(other) => {
                return Err(DomainError::validation(format!(
                    "permission '{raw}' has unknown scope '{other}'"
                )));
            }
        };
        if parts.next().is_some() {
            return Err(DomainError::validation(format!(
                "permission '{raw}' has too many segments"
            )));
        }

        Ok(Self {
            resource: Segment::parse(resource, "resource")?,
            action: Segment::parse(action, "action")?,
            self_scoped,
        })
    }

    /// The universal grant `*:*`.
    pub fn universal() -> Self {
        Self {
            resource: Segment::Any,
            action: Segment::Any,
            self_scoped: false,
        }
    }

    pub fn resource(&self) -> &Segment {
        &self.resource
    }

    pub fn action(&self) -> &Segment {
        &self.action
    }

    pub fn is_self_scoped(&self) -> bool {
        self.self_scoped
    }

    pub fn is_universal(&self) -> bool {
        *self == Self::universal()
    }

    /// `resource:*` for this permission's resource.
    pub fn resource_wildcard(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            action: Segment::Any,
            self_scoped: false,
        }
    }

    /// Same permission with the `:self` restriction removed.
    pub fn unscoped(&self) -> Self {
        Self {
            self_scoped: false,
            ..self.clone()
        }
    }

    /// Same permission restricted to the resource owner.
    pub fn owned(&self) -> Self {
        Self {
            self_scoped: true,
            ..self.clone()
        }
    }
}

impl FromStr for Permission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Permission {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.to_string()
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.resource.as_str(), self.action.as_str())?;
        if self.self_scoped {
            write!(f, ":{SELF_SUFFIX}")?;
        }
        Ok(())
    }
}

/// Unordered set of granted permissions (serialized as a sorted string list).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every entry, failing on the first malformed one.
    pub fn parse_all<I, S>(raw: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw.into_iter()
            .map(|s| Permission::parse(s.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    /// Parse leniently: malformed entries are dropped (they can never match).
    pub fn parse_lenient<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            raw.into_iter()
                .filter_map(|s| Permission::parse(s.as_ref()).ok())
                .collect(),
        )
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains(permission)
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_universal(&self) -> bool {
        self.0.contains(&Permission::universal())
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|p| p.to_string()).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Does `granted` satisfy `required`?
///
/// Checked in order, first hit wins:
/// 1. `*:*` is granted
/// 2. exact match
/// 3. `resource:*` is granted
/// 4. `required` is self-scoped and its unscoped base is satisfied
///
/// Self-scope is a restriction the caller applies, so holding `r:a` implies
/// `r:a:self`, never the other way round.
pub fn has_permission(granted: &PermissionSet, required: &Permission) -> bool {
    if granted.has_universal() {
        return true;
    }
    if granted.contains(required) {
        return true;
    }
    if granted.contains(&required.resource_wildcard()) {
        return true;
    }
    if required.is_self_scoped() {
        return has_permission(granted, &required.unscoped());
    }
    false
}

/// String-level entry point: malformed input on either side evaluates to `false`.
pub fn has_permission_str<S: AsRef<str>>(granted: &[S], required: &str) -> bool {
    let Ok(required) = Permission::parse(required) else {
        return false;
    };
    has_permission(&PermissionSet::parse_lenient(granted), &required)
}

/// Ownership-aware check.
///
/// The owner is checked against `required:self`; anybody else against the
/// unscoped permission. A non-owner can therefore never get in through a
/// `:self` grant, and an owner never needs the unscoped grant.
pub fn can_access_resource(principal: &Principal, owner_id: UserId, required: &Permission) -> bool {
    if principal.id == owner_id {
        has_permission(&principal.permissions, &required.owned())
    } else {
        has_permission(&principal.permissions, &required.unscoped())
    }
}
