//! Permission scopes granted to API keys

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::validation::{validate_permission, ApiKeyValidationError};

/// A single `<resource>:<action>` scope, e.g. `products:read`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(String);

impl Permission {
    /// Create a permission after validating its format
    pub fn new(value: impl Into<String>) -> Result<Self, ApiKeyValidationError> {
        let value = value.into();
        validate_permission(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Permission {
    type Error = ApiKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.0
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deduplicated set of permissions
///
/// Backed by an ordered set so storage and responses are stable regardless of
/// the order in which scopes were granted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and deduplicate a list of raw scope strings
    pub fn parse<I, S>(values: I) -> Result<Self, ApiKeyValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values
            .into_iter()
            .map(|v| Permission::new(v.into().trim().to_string()))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.0.iter().any(|p| p.as_str() == permission)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    /// Scope strings in sorted order
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_round_trips_through_string() {
        let perm = Permission::new("quotations:write").unwrap();
        assert_eq!(perm.as_str(), "quotations:write");
        assert!(Permission::new("quotations").is_err());
    }

    #[test]
    fn test_parse_deduplicates() {
        let set = PermissionSet::parse(["products:read", "products:read", "orders:read"]).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.contains("products:read"));
        assert!(set.contains("orders:read"));
    }

    #[test]
    fn test_parse_is_order_independent() {
        let a = PermissionSet::parse(["orders:read", "products:read"]).unwrap();
        let b = PermissionSet::parse(["products:read", "orders:read", "products:read"]).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.to_strings(), vec!["orders:read", "products:read"]);
    }

    #[test]
    fn test_parse_rejects_invalid_scope() {
        let err = PermissionSet::parse(["products:read", "admin"]).unwrap_err();
        assert_eq!(err, ApiKeyValidationError::InvalidPermission("admin".to_string()));
    }

    #[test]
    fn test_contains_is_exact() {
        let set = PermissionSet::parse(["products:read"]).unwrap();

        assert!(!set.contains("products:write"));
        assert!(!set.contains("products"));
    }

    #[test]
    fn test_deserialize_collapses_duplicates() {
        let set: PermissionSet =
            serde_json::from_str(r#"["products:read","products:read","quotations:write"]"#)
                .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            r#"["products:read","quotations:write"]"#
        );
    }
}
